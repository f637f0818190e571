//! Katha Vault CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the documents table
//! katha migrate
//!
//! # Load novels and chapters from YAML
//! katha seed demos/seed.yaml
//!
//! # Grant the admin role to an existing account
//! katha admin promote --email editor@example.com
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "katha")]
#[command(author, version, about = "Katha Vault CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed novels and chapters from a YAML file
    Seed {
        /// Path to the YAML file
        file: PathBuf,

        /// Remove every existing novel first
        #[arg(long)]
        replace: bool,
    },
    /// Manage accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Give an existing account the admin role
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
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
        Commands::Seed { file, replace } => {
            commands::seed::run(&file, replace).await?;
        }
        Commands::Admin { action } => match action {
            AdminAction::Promote { email } => commands::admin::promote(&email).await?,
        },
    }
    Ok(())
}
