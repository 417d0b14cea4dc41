//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use indicatif::ProgressBar;

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Runs the Sentinel-5P NO2 pipeline and ships its outputs
pub struct Cli {
    /// Config file (RON). Defaults to <config dir>/sentinel-no2/config.ron
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Overrides the working directory from the config file
    #[arg(long, global = true)]
    pub work_dir: Option<PathBuf>,

    /// Defaults to `daily`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Process today's data, distribute, archive and clean up
    Daily {},
    /// Reprocess a past date given as yyyymmdd
    Historical {
        /// Observation date, e.g. 20250801
        date: String,
    },
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

// -- Tests -------------------------------------------------------------------
