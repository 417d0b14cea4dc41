mod artifact;
mod bridge;
mod cleanup;
mod cli;
mod collect;
mod config;
mod date_stamp;
mod error;
mod runner;
mod stage;
mod transfer;

use std::process::ExitCode;

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use cli::{
    command::{self, RunSummary},
    Cli, Commands,
};
use config::PipelineConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let started = Local::now();
    match run(cli).await {
        Ok(summary) => {
            let elapsed = Local::now() - started;
            print!("{}", summary);
            println!(
                "Started {}, finished in {} min {} s",
                started.format("%Y-%m-%d %H:%M:%S"),
                elapsed.num_minutes(),
                elapsed.num_seconds() % 60
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            if let Some(error::PipelineError::InvalidDate(_)) = e.downcast_ref::<error::PipelineError>() {
                eprintln!("Usage: sentinel-no2 historical <yyyymmdd>   e.g. 20250801");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<RunSummary> {
    let mut config = PipelineConfig::load(cli.config.as_deref())?;
    if let Some(work_dir) = cli.work_dir {
        config.work_dir = work_dir;
    }

    match cli.command.unwrap_or(Commands::Daily {}) {
        Commands::Daily {} => command::daily(&config).await,
        Commands::Historical { date } => command::historical(&config, &date).await,
    }
}
