//! Quill CLI - Command-line interface
//!
//! Usage:
//!   quill serve
//!   quill seed [--password <pw>]
//!   quill token <user-id>

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use quill_api::auth::AuthService;
use quill_api::{build_state, init_tracing, serve};
use quill_core::{seed, AppConfig};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Quill JSON API server and tools")]
#[command(version)]
struct Cli {
    /// TOML configuration file; environment variables override it
    #[arg(long, global = true, env = "QUILL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve,
    /// Reset the database and load sample users and posts
    Seed {
        /// Password given to every seeded user
        #[arg(long, default_value = "password")]
        password: String,
    },
    /// Print a token for an existing user
    Token {
        /// User identifier
        user_id: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config)?;
    init_tracing(&config.logging);

    let persistent = config.database.url.is_some();
    let state = build_state(config).await?;

    match cli.command {
        Commands::Serve => serve(state).await?,
        Commands::Seed { password } => {
            if !persistent {
                bail!("Seeding needs DATABASE_URL; the in-memory store would be discarded on exit");
            }

            let digest = state
                .password
                .hash(&password)
                .context("Failed to hash seed password")?;
            let report = seed::run(state.users.as_ref(), state.posts.as_ref(), &digest).await?;

            println!(
                "Removed {} users and {} posts; created {} users and {} posts",
                report.users_removed, report.posts_removed, report.users_created, report.posts_created
            );
        }
        Commands::Token { user_id } => {
            let user = state
                .users
                .find_user_by_id(user_id)
                .await?
                .with_context(|| format!("No user with id {user_id}"))?;

            let token = AuthService::from_state(&state).issue_token(&user)?;
            println!("{token}");
        }
    }

    Ok(())
}
