//! Orange Collar CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! oc-cli migrate
//!
//! # Report a sighting of pet 42 as if submitted from its profile page
//! oc-cli report 42
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `report` - Trigger owner notification for a pet

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use orange_collar_core::PetId;

mod commands;

#[derive(Parser)]
#[command(name = "oc-cli")]
#[command(author, version, about = "Orange Collar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Report a sighting and notify the pet's owner
    Report {
        /// Pet ID
        pet_id: PetId,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Report { pet_id } => commands::report::run(pet_id).await?,
    }
    Ok(())
}
