mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "foodmap-cli")]
#[command(about = "Scrape restaurants and stores listed on a food marketplace")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape every establishment listed for a postal code
    Scrape {
        /// Postal code to search for
        #[arg(long)]
        postal: String,
        /// Show the browser window
        #[arg(long)]
        visible: bool,
        /// Maximum number of establishments to accept
        #[arg(long)]
        limit: Option<usize>,
        /// Maximum number of items per establishment
        #[arg(long = "menu-limit")]
        menu_limit: Option<usize>,
    },
    /// Only run the postal-code search and report timings
    Search {
        #[arg(long)]
        postal: String,
        #[arg(long)]
        visible: bool,
    },
    /// Re-run post-processing on the saved files of a postal code
    Clean {
        #[arg(long)]
        postal: String,
    },
    /// Show what is saved for a postal code
    Status {
        #[arg(long)]
        postal: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = foodmap_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let scraper = foodmap_scraper::Scraper::from_config(config)?;

    let succeeded = match cli.command {
        Commands::Scrape {
            postal,
            visible,
            limit,
            menu_limit,
        } => {
            let run = foodmap_core::RunConfig {
                postal_code: postal,
                visible_mode: visible,
                max_establishments: limit,
                max_items_per_establishment: menu_limit,
            };
            commands::run_scrape(&scraper, &run).await?
        }
        Commands::Search { postal, visible } => {
            commands::run_search(&scraper, &postal, visible).await
        }
        Commands::Clean { postal } => commands::run_clean(&scraper, &postal)?,
        Commands::Status { postal } => commands::run_status(&scraper, &postal)?,
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests;
