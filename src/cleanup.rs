//! Empties the scratch directories once their contents have been shipped.

use std::{fmt, fs, io};

use tracing::{info, warn};

use crate::{
    artifact::{Subdir, WorkDir},
    config::CleanupConfig,
    transfer::TransferReport,
};

#[derive(Debug, PartialEq, Eq)]
pub enum CleanupOutcome {
    Disabled,
    /// Local files kept because these transfers were not verified.
    Retained(Vec<String>),
    Cleaned(usize),
}

impl fmt::Display for CleanupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupOutcome::Disabled => write!(f, "cleanup disabled"),
            CleanupOutcome::Retained(targets) => write!(
                f,
                "local artifacts retained, unverified transfers: {}",
                targets.join(", ")
            ),
            CleanupOutcome::Cleaned(n) => write!(f, "removed {} local files", n),
        }
    }
}

/// Deletes every file in `json`, `txt`, `png` and `nc`. Subdirectories are
/// left alone.
pub fn clean(work: &WorkDir) -> io::Result<usize> {
    let mut removed = 0;
    for subdir in Subdir::ALL {
        for path in work.files(subdir)? {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }

    Ok(removed)
}

pub fn clean_after_transfer(
    config: &CleanupConfig,
    work: &WorkDir,
    transfers: &TransferReport,
) -> io::Result<CleanupOutcome> {
    if !config.enabled {
        return Ok(CleanupOutcome::Disabled);
    }

    if config.require_verified_transfer && !transfers.all_verified() {
        let targets: Vec<String> = transfers.unverified().map(|o| o.target.clone()).collect();
        warn!(
            "skipping cleanup, local artifacts retained in {} (unverified: {})",
            work.root().display(),
            targets.join(", ")
        );
        return Ok(CleanupOutcome::Retained(targets));
    }

    let removed = clean(work)?;
    info!("removed {} files from the working directories", removed);

    Ok(CleanupOutcome::Cleaned(removed))
}

// -- Tests -------------------------------------------------------------------
