//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `conn_watch` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use conn_watch::config::{Cli, Command};
use conn_watch::initialization::init_logger_with;
use conn_watch::{run_server, run_watch};

#[tokio::main]
async fn main() -> Result<()> {
    // .env next to the working directory, then next to the executable
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let cli = Cli::parse();

    init_logger_with(cli.log_level.into(), cli.log_format)
        .context("Failed to initialize logger")?;

    let result = match cli.command {
        Command::Serve(args) => run_server(args.into()).await,
        Command::Watch(args) => run_watch(args.into()).await,
    };

    if let Err(e) = result {
        eprintln!("conn_watch error: {:#}", e);
        process::exit(1);
    }
    Ok(())
}
