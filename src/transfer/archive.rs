//! Archives the raw datasets to a cloud remote with `rclone copy`.
//!
//! `copy` only uploads new or changed files and never deletes on the
//! remote, so repeated runs are incremental.

use tokio::process::Command;
use tracing::{info, warn};

use super::{run_tool, TransferOutcome};
use crate::{artifact::WorkDir, cli::create_spinner, config::ArchivalConfig};

pub async fn archive(config: &ArchivalConfig, work: &WorkDir) -> TransferOutcome {
    let source = work.subdir(config.source_dir);
    let target = config.target();
    let files = work.files(config.source_dir).map(|f| f.len()).unwrap_or(0);

    let bar = create_spinner(format!("Archiving {} to {}...", config.source_dir.name(), target));

    let mut copy = Command::new(&config.rclone);
    copy.arg("copy").arg(&source).arg(&target);
    if let Err(message) = run_tool(&mut copy).await {
        bar.abandon_with_message("Archive failed");
        warn!("rclone copy to {} failed: {}", target, message);
        return TransferOutcome {
            target,
            files,
            verified: false,
            message,
        };
    }

    if config.verify {
        let mut check = Command::new(&config.rclone);
        check.arg("check").arg("--one-way").arg(&source).arg(&target);
        if let Err(message) = run_tool(&mut check).await {
            bar.abandon_with_message("Archive not verified");
            warn!("rclone check against {} failed: {}", target, message);
            return TransferOutcome {
                target,
                files,
                verified: false,
                message: format!("copied but not verified: {}", message),
            };
        }
    }

    bar.finish_with_message("Archive updated");
    info!("archived {} files to {}", files, target);

    TransferOutcome {
        target,
        files,
        verified: true,
        message: (if config.verify { "copied and checked" } else { "copied" }).to_string(),
    }
}

// -- Tests -------------------------------------------------------------------
