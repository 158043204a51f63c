pub mod types;
pub mod config;
pub mod projection;
pub mod data;
pub mod selector;
pub mod filter;
pub mod render;
pub mod page;
pub mod pipeline;
pub mod server;
