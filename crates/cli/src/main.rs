//! AgentFlow CLI: the main entry point.
//!
//! Commands:
//! - `run`      Run a request through an agent
//! - `agents`   List available agents
//! - `tools`    List built-in tools
//! - `schema`   Print an agent's tools in provider wire format
//! - `onboard`  Write a default config file

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "agentflow",
    about = "AgentFlow: durable tool-calling agent executions",
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
}

#[derive(Subcommand)]
enum Commands {
    /// Run a request through an agent
    Run(commands::run::RunArgs),

    /// List available agents
    Agents,

    /// List built-in tools and their inputs
    Tools,

    /// Print an agent's tool schema as sent to its provider
    Schema {
        /// Agent key
        #[arg(short, long, default_value = "benefits")]
        agent: String,
    },

    /// Write a default config file
    Onboard,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; logs go to stderr so stdout stays the answer.
    let filter = if cli.verbose { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Run(args) => commands::run::run(args).await?,
        Commands::Agents => commands::agents::run()?,
        Commands::Tools => commands::tools::run()?,
        Commands::Schema { agent } => commands::schema::run(&agent)?,
        Commands::Onboard => commands::onboard::run()?,
    }

    Ok(())
}
