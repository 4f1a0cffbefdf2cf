//! hostagent CLI - the main entry point.
//!
//! Commands:
//! - `chat`: Interactive or single-message chat through the host agent
//! - `agents`: List the configured remote agents and their skills
//! - `discover`: Fetch a remote agent card

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "hostagent",
    about = "hostagent — a ReAct host agent for remote A2A agents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.hostagent/config.toml)
    #[arg(short, long, global = true, env = "HOSTAGENT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the host agent
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// List enabled remote agents and their skills
    Agents,

    /// Fetch an agent card and print it as JSON
    Discover {
        /// Agent card URL (scheme optional)
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so streamed replies on stdout stay clean
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Chat { message } => commands::chat::run(config, message).await?,
        Commands::Agents => commands::agents::run(config).await?,
        Commands::Discover { url } => commands::discover::run(&url).await?,
    }

    Ok(())
}
