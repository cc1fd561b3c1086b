use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use commands::{ConfigCommand, TodoCommand, WatchCommand};
use config::Config;
use todo_sync::client::{TodoClient, TodoTools};

#[derive(Parser)]
#[command(name = "todo")]
#[command(version)]
#[command(about = "Manage todos on a todo sync server", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Server URL (overrides config file and TODO_SERVER_URL)
    #[arg(long, short, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Todo(TodoCommand),

    /// Watch live changes
    Watch(WatchCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?.with_server_url(cli.server);

    match cli.command {
        Some(Commands::Todo(cmd)) => {
            let client = TodoClient::new(config.server_url.value.clone())?;
            cmd.run(&TodoTools::new(client)).await?;
        }
        Some(Commands::Watch(cmd)) => {
            cmd.run(&config.server_url.value).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
