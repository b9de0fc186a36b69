use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

use cli::completions::CompletionsCommand;
use cli::config::ConfigCommand;
use cli::submit::SubmitCommand;

#[derive(Parser)]
#[command(name = "rsubmit")]
#[command(about = "Submit a program to a remote analytics workspace and collect its log and listing", long_about = None)]
pub struct Cli {
    /// Path to the configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Show informational log output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Submit(SubmitCommand),
    Config(ConfigCommand),
    Completions(CompletionsCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Submit(cmd) => cmd.execute(config_path),
        Commands::Config(cmd) => cmd.execute(config_path),
        Commands::Completions(cmd) => cmd.execute(),
    }
}
