//! Runs "today"-bound collaborator scripts against a historical date.
//!
//! The inputs a stage expects under today's name are aliased to the
//! historical artifacts, and whatever the stage writes under today's
//! date-stamp is renamed afterwards. Leftover today-dated files are deleted
//! so they cannot leak into the next run.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::{
    artifact::{Artifact, Subdir, WorkDir},
    date_stamp::DateStamp,
};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RetargetSummary {
    pub renamed: usize,
    pub purged: usize,
}

pub struct DateBridge<'a> {
    work: &'a WorkDir,
    today: DateStamp,
    target: DateStamp,
}

impl<'a> DateBridge<'a> {
    pub fn new(work: &'a WorkDir, today: DateStamp, target: DateStamp) -> Self {
        DateBridge { work, today, target }
    }

    pub fn today(&self) -> &DateStamp {
        &self.today
    }

    pub fn target(&self) -> &DateStamp {
        &self.target
    }

    /// Nothing to bridge when the target date is today.
    pub fn is_identity(&self) -> bool {
        self.today == self.target
    }

    /// Points today's name of each artifact at the target date's file.
    /// Returns the links created, for [`DateBridge::unalias`].
    pub fn alias(&self, artifacts: &[Artifact]) -> io::Result<Vec<PathBuf>> {
        let mut links = Vec::new();

        for artifact in artifacts {
            let link = self.work.path(*artifact, &self.today);
            remove_if_present(&link)?;

            // same directory, so the bare file name is a valid link target
            let original = PathBuf::from(artifact.file_name(&self.target));
            symlink(&original, &link)?;
            debug!("aliased {} -> {}", link.display(), original.display());

            links.push(link);
        }

        Ok(links)
    }

    pub fn unalias(&self, links: &[PathBuf]) -> io::Result<()> {
        for link in links {
            remove_if_present(link)?;
        }

        Ok(())
    }

    /// Renames today-stamped outputs to the target date, then deletes any
    /// today-stamped file that could not be renamed.
    pub fn retarget_outputs(&self) -> io::Result<RetargetSummary> {
        let today = self.today.compact();
        let target = self.target.compact();
        let mut summary = RetargetSummary::default();

        for subdir in Subdir::OUTPUTS {
            for path in self.work.files(subdir)? {
                let Some(name) = file_name(&path) else { continue };
                if let Some(new_name) = retarget_name(&name, &today, &target) {
                    let new_path = path.with_file_name(&new_name);
                    fs::rename(&path, &new_path)?;
                    debug!("renamed {} -> {}", name, new_name);
                    summary.renamed += 1;
                }
            }

            for path in self.work.files(subdir)? {
                let Some(name) = file_name(&path) else { continue };
                if name.contains(&today) {
                    warn!("removing stray {}/{}", subdir.name(), name);
                    fs::remove_file(&path)?;
                    summary.purged += 1;
                }
            }
        }

        info!(
            "relabelled {} outputs from {} to {}, purged {}",
            summary.renamed, today, target, summary.purged
        );
        Ok(summary)
    }
}

/// Substitutes `target` for `today` when the date-stamp is delimited inside
/// the name (`a_T_b.png`) or sits right before the extension (`a_T.json`).
pub fn retarget_name(name: &str, today: &str, target: &str) -> Option<String> {
    let mid = format!("_{}_", today);
    if name.contains(&mid) {
        return Some(name.replace(&mid, &format!("_{}_", target)));
    }

    let (stem, ext) = name.rsplit_once('.')?;
    let prefix = stem.strip_suffix(today)?;

    Some(format!("{}{}.{}", prefix, target, ext))
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().to_string())
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    // symlink_metadata so that dangling links are removed too
    match fs::symlink_metadata(path) {
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn symlink(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
fn symlink(original: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(original, link)
}

// -- Tests -------------------------------------------------------------------
