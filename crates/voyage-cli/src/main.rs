mod config;
mod generate_cmd;
mod plans_cmd;
mod render;
mod serve_cmd;

#[cfg(test)]
mod test_util;

use clap::{Parser, Subcommand};

use voyage_core::Dispatcher;
use voyage_store::TripDetails;

use config::{CliOverrides, VoyageConfig};
use generate_cmd::GenerateOptions;

#[derive(Parser)]
#[command(name = "voyage", about = "AI travel itinerary generator and plan store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a voyage config file
    Init {
        /// Gemini API key to store in the config file
        #[arg(long)]
        api_key: Option<String>,
        /// Directory for the local plan file
        #[arg(long)]
        data_dir: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Serve the travel API over HTTP
    Serve {
        /// Address to bind (overrides VOYAGE_BIND)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides VOYAGE_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Generate a travel plan
    Generate {
        /// City or region to visit
        #[arg(long)]
        destination: String,
        /// First day of the trip (YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// Last day of the trip (YYYY-MM-DD)
        #[arg(long)]
        end: String,
        /// Country of the destination (default: Japan)
        #[arg(long)]
        country: Option<String>,
        /// Place that must be on the itinerary (repeatable)
        #[arg(long = "must-visit")]
        must_visit: Vec<String>,
        /// Show fields as they arrive
        #[arg(long)]
        stream: bool,
        /// Save the generated plan
        #[arg(long)]
        save: bool,
    },
    /// Ask a quick travel question
    Search {
        /// The question
        query: String,
    },
    /// Saved plan management
    Plans {
        #[command(subcommand)]
        command: PlansCommands,
    },
}

#[derive(Subcommand)]
pub enum PlansCommands {
    /// List saved plans, newest first
    List,
    /// Delete a saved plan
    Delete {
        /// Plan ID to delete
        plan_id: i64,
    },
}

/// Execute the `voyage init` command: write config file.
fn cmd_init(api_key: Option<String>, data_dir: Option<String>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let mut cfg = config::ConfigFile::default();
    cfg.model.api_key = api_key;
    cfg.store.data_dir = data_dir;
    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    match &cfg.model.api_key {
        Some(_) => println!("  model.api_key = <set>"),
        None => println!("  model.api_key not set; export GEMINI_API_KEY before generating plans."),
    }
    if let Some(dir) = &cfg.store.data_dir {
        println!("  store.data_dir = {dir}");
    }
    Ok(())
}

fn build_dispatcher(cfg: &VoyageConfig) -> Dispatcher {
    if !cfg.model.has_credential() {
        tracing::warn!("no model API key configured; generatePlan and searchInfo will fail");
    }
    tracing::info!(store = %cfg.store.describe(), model = %cfg.model.model, "configured backends");
    Dispatcher::from_config(&cfg.model, &cfg.store, cfg.options)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            api_key,
            data_dir,
            force,
        } => {
            cmd_init(api_key, data_dir, force)?;
        }
        Commands::Serve { bind, port } => {
            let resolved = VoyageConfig::resolve(&CliOverrides { bind, port })?;
            let dispatcher = build_dispatcher(&resolved);
            serve_cmd::run_serve(dispatcher, &resolved.bind, resolved.port).await?;
        }
        Commands::Generate {
            destination,
            start,
            end,
            country,
            must_visit,
            stream,
            save,
        } => {
            let resolved = VoyageConfig::resolve(&CliOverrides::default())?;
            let dispatcher = build_dispatcher(&resolved);
            let trip = TripDetails {
                country,
                destination,
                start_date: start,
                end_date: end,
                must_visit_places: must_visit,
            };
            let opts = GenerateOptions { trip, stream, save };
            generate_cmd::run_generate(&dispatcher, opts).await?;
        }
        Commands::Search { query } => {
            let resolved = VoyageConfig::resolve(&CliOverrides::default())?;
            let dispatcher = build_dispatcher(&resolved);
            generate_cmd::run_search(&dispatcher, &query).await?;
        }
        Commands::Plans { command } => {
            let resolved = VoyageConfig::resolve(&CliOverrides::default())?;
            let dispatcher = build_dispatcher(&resolved);
            plans_cmd::run_plans_command(command, &dispatcher).await?;
        }
    }

    Ok(())
}
