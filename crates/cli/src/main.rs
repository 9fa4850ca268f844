//! Shopcart CLI - Database migrations, seeding and user management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! shopcart migrate
//!
//! # Load sample users, items and a cart
//! shopcart seed
//!
//! # Create a user
//! shopcart user create -u alice -p secret123
//! shopcart user create -u root -p secret123 --admin
//! ```
//!
//! # Environment Variables
//!
//! - `SHOPCART_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shopcart")]
#[command(author, version, about = "Shopcart CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database with sample data (skipped if users exist)
    Seed,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Username (3-30 letters, digits or underscores)
        #[arg(short, long)]
        username: String,

        /// Password (6-50 characters)
        #[arg(short, long)]
        password: String,

        /// Grant the admin capability
        #[arg(long)]
        admin: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed => commands::seed::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                username,
                password,
                admin,
            } => {
                commands::user::create(&username, &password, admin).await?;
            }
        },
    }
    Ok(())
}
