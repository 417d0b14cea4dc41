//! Shipping the run's outputs: web server copies and the cloud archive.
//!
//! Transfers are best-effort. A failed target is logged and recorded in the
//! [`TransferReport`], never raised as an error.

pub mod archive;
pub mod distribute;

use std::fmt;

use tokio::process::Command;
use tracing::debug;

pub use archive::archive;
pub use distribute::distribute;

#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub target: String,
    pub files: usize,
    pub verified: bool,
    pub message: String,
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.verified { "✅" } else { "⚠️ " };
        write!(f, "{} {} ({} files): {}", mark, self.target, self.files, self.message)
    }
}

#[derive(Debug, Default)]
pub struct TransferReport {
    pub outcomes: Vec<TransferOutcome>,
}

impl TransferReport {
    pub fn push(&mut self, outcome: TransferOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn all_verified(&self) -> bool {
        self.outcomes.iter().all(|o| o.verified)
    }

    pub fn unverified(&self) -> impl Iterator<Item = &TransferOutcome> {
        self.outcomes.iter().filter(|o| !o.verified)
    }
}

/// Runs an external transfer tool. Returns its stdout on success and its
/// trimmed stderr on failure.
async fn run_tool(cmd: &mut Command) -> Result<String, String> {
    debug!("executing {cmd:?}");
    let program = cmd.as_std().get_program().to_string_lossy().to_string();

    let output = cmd
        .output()
        .await
        .map_err(|e| format!("could not start {}: {}", program, e))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.is_empty() {
            Err(format!("exited with {}", output.status))
        } else {
            Err(format!("exited with {}: {}", output.status, stderr))
        }
    }
}

// -- Tests -------------------------------------------------------------------
