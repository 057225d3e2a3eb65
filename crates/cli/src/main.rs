//! Ledgerwise CLI: the main entry point.
//!
//! Commands:
//! - `init`: Write a default config and seed the knowledge file
//! - `serve`: Start the HTTP gateway
//! - `ask`: Answer a single question from the terminal
//! - `index`: Build (or force-rebuild) the knowledge index
//! - `doctor`: Diagnose configuration and knowledge files

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "ledgerwise",
    about = "Ledgerwise — plain-language answers to personal-finance questions",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file (defaults to ~/.ledgerwise/config.toml)
    #[arg(short, long, global = true, env = "LEDGERWISE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and seed the knowledge file
    Init,

    /// Start the HTTP gateway
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask a single question
    Ask {
        /// The question to answer
        #[arg(short, long)]
        message: String,
    },

    /// Build the knowledge index
    Index {
        /// Recompute every vector even if a cached index exists
        #[arg(short, long)]
        force: bool,
    },

    /// Diagnose configuration and knowledge files
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Init => commands::init::run(config_path).await?,
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Ask { message } => commands::ask::run(config_path, message).await?,
        Commands::Index { force } => commands::index::run(config_path, force).await?,
        Commands::Doctor => commands::doctor::run(config_path).await?,
    }

    Ok(())
}
