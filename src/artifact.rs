//! Working directory layout and date-stamped artifact names.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::date_stamp::DateStamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
/// One of the scratch subdirectories shared with the collaborator scripts.
pub enum Subdir {
    Nc,
    Png,
    Json,
    Txt,
}

impl Subdir {
    pub const ALL: [Subdir; 4] = [Subdir::Json, Subdir::Txt, Subdir::Png, Subdir::Nc];

    /// Directories that receive analysis outputs.
    pub const OUTPUTS: [Subdir; 3] = [Subdir::Png, Subdir::Json, Subdir::Txt];

    pub fn name(&self) -> &'static str {
        match self {
            Subdir::Nc => "nc",
            Subdir::Png => "png",
            Subdir::Json => "json",
            Subdir::Txt => "txt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// A file whose name is fixed by convention and carries the observation date.
pub enum Artifact {
    No2Dataset,
    WindDataset,
    No2Map,
    WindroseJson,
    RegionAverageJson,
}

impl Artifact {
    pub fn subdir(&self) -> Subdir {
        match self {
            Artifact::No2Dataset | Artifact::WindDataset => Subdir::Nc,
            Artifact::No2Map => Subdir::Png,
            Artifact::WindroseJson | Artifact::RegionAverageJson => Subdir::Json,
        }
    }

    pub fn file_name(&self, date: &DateStamp) -> String {
        match self {
            Artifact::No2Dataset => format!("NO2_Indonesia_Daily_{}_linear_interp.nc", date),
            Artifact::WindDataset => format!("wind_{}.nc", date),
            Artifact::No2Map => format!("NO2_Indonesia_Daily_{}_linear_interp.png", date),
            Artifact::WindroseJson => format!("windrose_data_{}.json", date),
            Artifact::RegionAverageJson => format!("region_avg_{}.json", date),
        }
    }
}

#[derive(Debug, Clone)]
/// The base directory holding `nc/`, `png/`, `json/` and `txt/`.
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        WorkDir { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn subdir(&self, subdir: Subdir) -> PathBuf {
        self.root.join(subdir.name())
    }

    pub fn path(&self, artifact: Artifact, date: &DateStamp) -> PathBuf {
        self.subdir(artifact.subdir()).join(artifact.file_name(date))
    }

    /// Creates any of the four subdirectories that are missing.
    pub fn ensure_layout(&self) -> io::Result<()> {
        for subdir in Subdir::ALL {
            fs::create_dir_all(self.subdir(subdir))?;
        }

        Ok(())
    }

    /// Regular files and symlinks directly inside `subdir`.
    pub fn files(&self, subdir: Subdir) -> io::Result<Vec<PathBuf>> {
        let dir = self.subdir(subdir);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                files.push(entry.path());
            }
        }
        files.sort();

        Ok(files)
    }
}

// -- Tests -------------------------------------------------------------------
