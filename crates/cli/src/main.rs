//! Shopdesk CLI - database migrations and fixtures.
//!
//! # Usage
//!
//! ```bash
//! # Run admin database migrations
//! shopdesk migrate
//!
//! # Load a fixture file into the configured store
//! shopdesk seed --file fixtures/demo.yaml
//!
//! # Validate a fixture file against an in-memory store
//! shopdesk seed --file fixtures/demo.yaml --dry-run
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Create brands, categories, products, customers and orders
//!   from a YAML file

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "shopdesk")]
#[command(author, version, about = "Shopdesk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run admin database migrations
    Migrate,
    /// Load fixtures through the admin services
    Seed {
        /// Path to the YAML fixture file
        #[arg(short, long)]
        file: PathBuf,

        /// Validate against an in-memory store without writing anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::admin().await?,
        Commands::Seed { file, dry_run } => {
            let summary = commands::seed::from_file(&file, dry_run).await?;
            tracing::info!(
                brands = summary.brands,
                categories = summary.categories,
                products = summary.products,
                customers = summary.customers,
                orders = summary.orders,
                dry_run,
                "Seeding complete"
            );
        }
    }
    Ok(())
}
