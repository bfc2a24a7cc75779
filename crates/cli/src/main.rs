//! Sidekick CLI — the main entry point.
//!
//! Commands:
//! - `onboard` — Write a default config file
//! - `chat`    — Interactive chat or single-message mode
//! - `config`  — Show the effective configuration
//! - `doctor`  — Check the model backend

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "sidekick",
    about = "Sidekick — AI pair-programming assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Onboard,

    /// Chat with the assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Run the hidden planning pass and print the plan
        #[arg(long)]
        plan: bool,
    },

    /// Show the effective configuration
    Config,

    /// Check backend connectivity and list models
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run()?,
        Commands::Chat { message, plan } => commands::chat::run(message, plan).await?,
        Commands::Config => commands::config_cmd::run()?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
