use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use coachtrack::config::Config;
use coachtrack::db::init_db;
use commands::{ConfigCommand, LogCommand, PlanCommand, SyncCommand};

#[derive(Parser)]
#[command(name = "coachtrack")]
#[command(version)]
#[command(about = "Workout plan and log tracker with offline sync", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage workout plans
    Plan(PlanCommand),

    /// Record and inspect workout logs
    Log(LogCommand),

    /// Sync with the server
    Sync(SyncCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Plan(cmd)) => {
            let (reader, writer) = init_db(&config.database_path).await?;
            cmd.run(&reader, &writer, &config).await?;
        }
        Some(Commands::Log(cmd)) => {
            let (reader, writer) = init_db(&config.database_path).await?;
            cmd.run(&reader, &writer, &config).await?;
        }
        Some(Commands::Sync(cmd)) => {
            let (reader, writer) = init_db(&config.database_path).await?;
            cmd.run(&reader, &writer, &config).await?;
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
