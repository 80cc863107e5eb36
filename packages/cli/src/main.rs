mod commands;
mod config;
mod persistence;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, init, render, replay, CheckArgs, InitArgs, RenderArgs, ReplayArgs};

/// Blockpress CLI - render, check and script block pages
#[derive(Parser, Debug)]
#[command(name = "blockpress")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a new Blockpress project
    Init(InitArgs),

    /// Render a page to HTML
    Render(RenderArgs),

    /// Apply a script of editor commands to a page and save it
    Replay(ReplayArgs),

    /// Validate a page
    Check(CheckArgs),
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match std::env::current_dir() {
        Ok(cwd) => {
            let cwd = cwd.display().to_string();
            match cli.command {
                Command::Init(args) => init(args, &cwd),
                Command::Render(args) => render(args, &cwd),
                Command::Replay(args) => replay(args, &cwd).await,
                Command::Check(args) => check(args, &cwd),
            }
        }
        Err(err) => Err(anyhow::anyhow!("Cannot get current directory: {}", err)),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
