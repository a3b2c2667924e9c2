//! Cushion CLI - Catalog store migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the key-value table
//! cushion migrate
//!
//! # Sync fabrics from the auto-selected sunproof bucket
//! cushion sync
//!
//! # Sync fabrics from a specific bucket
//! cushion sync --bucket "SUNPROOF SELECTIE"
//!
//! # Delete every fabric outside the sunproof category
//! cushion cleanup
//!
//! # Register the first admin (promoted on first login)
//! cushion admin init -e owner@example.nl
//!
//! # Grant, revoke and list admins
//! cushion admin grant -u user-123 -e anna@example.nl
//! cushion admin revoke -u user-123
//! cushion admin list
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `sync` - Build fabric records from storage images
//! - `cleanup` - Remove non-sunproof fabrics
//! - `admin` - Manage admin roles

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "cushion")]
#[command(author, version, about = "Cushion catalog CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Sync fabrics from Supabase Storage
    Sync {
        /// Bucket to sync (default: first bucket with "sunproof" in its name)
        #[arg(short, long)]
        bucket: Option<String>,
    },
    /// Delete every fabric outside the sunproof category
    Cleanup,
    /// Manage admin roles
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Debug, Subcommand)]
enum AdminAction {
    /// Register the email of the first admin
    Init {
        /// Email the first admin will sign in with
        #[arg(short, long)]
        email: String,
    },
    /// Make a user an admin
    Grant {
        /// User ID from the identity provider
        #[arg(short, long)]
        user_id: String,

        /// User's email address
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Demote an admin to customer
    Revoke {
        /// User ID from the identity provider
        #[arg(short, long)]
        user_id: String,
    },
    /// List admins
    List,
}

#[tokio::main]
async fn main() {
    // Load .env before anything reads the environment
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Sync { bucket } => commands::fabrics::sync(bucket.as_deref()).await?,
        Commands::Cleanup => commands::fabrics::cleanup().await?,
        Commands::Admin { action } => match action {
            AdminAction::Init { email } => commands::admin::init(&email).await?,
            AdminAction::Grant { user_id, email } => {
                commands::admin::grant(&user_id, email.as_deref()).await?;
            }
            AdminAction::Revoke { user_id } => commands::admin::revoke(&user_id).await?,
            AdminAction::List => commands::admin::list().await?,
        },
    }
    Ok(())
}
