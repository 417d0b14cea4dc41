//! Fatal pipeline errors.
//!
//! Transfer failures are not listed here: distribution and archival log
//! them and carry on.

use std::{path::PathBuf, process::ExitStatus};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("date must be in yyyymmdd format, got `{0}`")]
    InvalidDate(String),

    #[error("[{stage}] required input not found: {}", path.display())]
    MissingInput { stage: String, path: PathBuf },

    #[error("[{stage}] script exited with {status}")]
    StageFailed { stage: String, status: ExitStatus },

    #[error("[{stage}] could not start script")]
    Spawn {
        stage: String,
        #[source]
        source: std::io::Error,
    },

    #[error("[{stage}] expected output not produced: {}", path.display())]
    MissingOutput { stage: String, path: PathBuf },

    #[error("could not read download archive {}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Name of the stage that failed, if the error belongs to one.
    pub fn stage(&self) -> Option<&str> {
        match self {
            PipelineError::MissingInput { stage, .. }
            | PipelineError::StageFailed { stage, .. }
            | PipelineError::Spawn { stage, .. }
            | PipelineError::MissingOutput { stage, .. } => Some(stage),
            _ => None,
        }
    }
}

// -- Tests -------------------------------------------------------------------
