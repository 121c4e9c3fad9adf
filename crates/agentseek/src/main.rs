//! agentseek - role-based LLM agents for your terminal

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{engage_command, init_command, signal_command, status_command};

/// agentseek - agents that plan, code, search and trade
#[derive(Parser)]
#[command(name = "agentseek")]
#[command(about = "◆ Role-based LLM agents that run tools on your machine")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config and work directory
    Init,
    /// Talk to the agents
    Engage {
        /// Send one message and exit
        #[arg(short, long)]
        message: Option<String>,
        /// Always use this agent (casual, coder, file, web, finance, trading, planner)
        #[arg(short, long)]
        agent: Option<String>,
    },
    /// Print the moving-average trade signal for a symbol
    Signal {
        /// Exchange symbol, e.g. BTCUSDT
        symbol: String,
    },
    /// Show configuration status
    Status,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = if verbose {
        EnvFilter::new(default_level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Init => init_command().await,
        Commands::Engage { message, agent } => engage_command(message, agent).await,
        Commands::Signal { symbol } => signal_command(symbol).await,
        Commands::Status => status_command().await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
