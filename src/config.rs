//! Runtime configuration, read from a RON file at start-up.
//!
//! Example `config.ron`:
//!
//! ```text
//! (
//!     work_dir: "/srv/sentinel-no2",
//!     distribution: (
//!         host: "10.0.0.12",
//!         user: "www",
//!         remote_base: "/var/www/html/SENTINEL-NO2",
//!         password_env: Some("SENTINEL_NO2_SSHPASS"),
//!     ),
//!     archival: (remote: "gdrive", folder: "SENTINEL-NO2"),
//! )
//! ```
//!
//! Every field has a default, so a file only needs the values that differ.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::warn;

use crate::{
    artifact::Subdir,
    error::{PipelineError, Result},
};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Base directory holding `nc/`, `png/`, `json/` and `txt/`; also the
    /// cwd of every collaborator script.
    pub work_dir: PathBuf,
    /// Program used to run the collaborator scripts.
    pub interpreter: String,
    pub scripts: ScriptConfig,
    pub distribution: DistributionConfig,
    pub archival: ArchivalConfig,
    pub cleanup: CleanupConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            work_dir: PathBuf::from("."),
            interpreter: "python3".to_string(),
            scripts: ScriptConfig::default(),
            distribution: DistributionConfig::default(),
            archival: ArchivalConfig::default(),
            cleanup: CleanupConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
/// Collaborator script paths, relative to `work_dir` unless absolute.
pub struct ScriptConfig {
    pub no2: PathBuf,
    pub no2_for_date: PathBuf,
    pub wind: PathBuf,
    pub wind_for_date: PathBuf,
    pub visualize: PathBuf,
    pub quick_analysis: PathBuf,
    pub windrose: PathBuf,
    pub region_average: PathBuf,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        ScriptConfig {
            no2: "01-sentinel-no2-final.py".into(),
            no2_for_date: "xx-sentinel-no2-date.py".into(),
            wind: "02-get-wind.py".into(),
            wind_for_date: "yy-get-wind-date.py".into(),
            visualize: "03-visualize-no2.py".into(),
            quick_analysis: "04-quick-analysis.py".into(),
            windrose: "05-generate-windrose-data.py".into(),
            region_average: "06-region-average.py".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    pub host: String,
    pub user: String,
    pub remote_base: String,
    /// Name of the environment variable holding the scp password. `None`
    /// means key-based auth and plain `scp`.
    pub password_env: Option<String>,
    pub scp: String,
    pub ssh: String,
    pub sshpass: String,
    pub directories: Vec<Subdir>,
    /// List each remote directory over ssh after the copy and require every
    /// local file to appear in it.
    pub verify: bool,
}

impl DistributionConfig {
    pub fn login(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    pub fn destination(&self) -> String {
        format!("{}:{}", self.login(), self.remote_base)
    }
}

impl Default for DistributionConfig {
    fn default() -> Self {
        DistributionConfig {
            host: "localhost".to_string(),
            user: "sentinel".to_string(),
            remote_base: "/var/www/html/SENTINEL-NO2".to_string(),
            password_env: Some("SENTINEL_NO2_SSHPASS".to_string()),
            scp: "scp".to_string(),
            ssh: "ssh".to_string(),
            sshpass: "sshpass".to_string(),
            directories: vec![Subdir::Txt, Subdir::Json, Subdir::Png],
            verify: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArchivalConfig {
    pub rclone: String,
    /// rclone remote alias, e.g. `gdrive`.
    pub remote: String,
    pub folder: String,
    pub source_dir: Subdir,
    /// Run `rclone check --one-way` after the copy.
    pub verify: bool,
}

impl ArchivalConfig {
    pub fn target(&self) -> String {
        format!("{}:{}", self.remote, self.folder)
    }
}

impl Default for ArchivalConfig {
    fn default() -> Self {
        ArchivalConfig {
            rclone: "rclone".to_string(),
            remote: "gdrive".to_string(),
            folder: "SENTINEL-NO2".to_string(),
            source_dir: Subdir::Nc,
            verify: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub enabled: bool,
    /// Keep local files unless every transfer was verified.
    pub require_verified_transfer: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        CleanupConfig {
            enabled: true,
            require_verified_transfer: true,
        }
    }
}

impl PipelineConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sentinel-no2").join("config.ron"))
    }

    pub fn from_ron(contents: &str) -> Result<Self> {
        ron::from_str::<PipelineConfig>(contents).map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Loads `path` if given (it must exist), otherwise the default config
    /// file, falling back to built-in defaults when that is absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::read(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::read(&path),
                _ => {
                    warn!("no config file found, using built-in defaults");
                    Ok(PipelineConfig::default())
                }
            },
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;

        Self::from_ron(&contents)
    }
}

// -- Tests -------------------------------------------------------------------
