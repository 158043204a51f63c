use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tract_explorer::render::RenderOutcome;
use tract_explorer::types::SelectionQuery;
use tract_explorer::{config, data, pipeline, server};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the interactive dashboard
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Write the map for one selection to a standalone HTML file
    Export {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        county: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        neighborhood: Option<String>,
        #[arg(long)]
        basemap: Option<String>,
        #[arg(short, long, value_name = "FILE", default_value = "map.html")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            info!("Serving dashboard with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(&config)?;

            let tracts = data::init(&app_config.input)?;

            server::start_server(app_config, tracts).await?;
        }
        Commands::Export { config, state, county, city, neighborhood, basemap, out } => {
            let app_config = config::AppConfig::load_from_file(&config)?;
            let tracts = data::init(&app_config.input)?;

            let query = SelectionQuery { state, county, city, neighborhood, basemap };
            let view = pipeline::run(tracts, &app_config.map, &query);

            if let Some(selection) = &view.resolution.selection {
                info!(
                    "Selection: {}, {}, {} ({})",
                    selection.city,
                    selection.county,
                    selection.state,
                    selection.neighborhood.as_deref().unwrap_or("all neighborhoods")
                );
            }

            match view.outcome {
                RenderOutcome::NoData(notice) => println!("{}", notice),
                RenderOutcome::Map(map) => {
                    let html = map.to_html(&app_config.map.title)?;
                    fs::write(&out, html).with_context(|| format!("Failed to write {:?}", out))?;
                    info!("Wrote {:?}", out);
                }
            }
        }
    }

    Ok(())
}
