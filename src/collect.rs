//! Puts what a collaborator script left behind where the next stage looks
//! for it.

use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};
use zip::read::ZipArchive;

use crate::{
    artifact::{Artifact, Subdir, WorkDir},
    date_stamp::DateStamp,
    error::{PipelineError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collect {
    /// The script saves `artifact` in `from` instead of its own subdirectory.
    Relocate { artifact: Artifact, from: Subdir },
    /// The script leaves a CDS `netcdf_zip` download in the working
    /// directory. Its netCDF member becomes `artifact`.
    Unzip(Artifact),
}

impl Collect {
    /// `date` is the date the script ran under, which may be the bridged
    /// "today" rather than the target date.
    pub fn apply(&self, work: &WorkDir, date: &DateStamp) -> Result<()> {
        match *self {
            Collect::Relocate { artifact, from } => relocate(work, artifact, from, date),
            Collect::Unzip(artifact) => unzip(work, artifact, date),
        }
    }
}

fn relocate(work: &WorkDir, artifact: Artifact, from: Subdir, date: &DateStamp) -> Result<()> {
    let source = work.subdir(from).join(artifact.file_name(date));
    if !source.exists() {
        return Ok(());
    }

    let dest = work.path(artifact, date);
    fs::rename(&source, &dest)?;
    debug!("moved {} to {}", source.display(), dest.display());

    Ok(())
}

/// A missing archive or one without a `.nc` member is only logged; the
/// stage's postcondition reports the absent artifact.
fn unzip(work: &WorkDir, artifact: Artifact, date: &DateStamp) -> Result<()> {
    let Some(zip_path) = newest_zip(work.root())? else {
        warn!("no download archive in {}", work.root().display());
        return Ok(());
    };

    let archive_error = |source| PipelineError::Archive {
        path: zip_path.clone(),
        source,
    };
    let mut archive = ZipArchive::new(File::open(&zip_path)?).map_err(archive_error)?;
    let dest = work.path(artifact, date);

    let mut extracted = false;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(archive_error)?;
        if entry.is_file() && entry.name().ends_with(".nc") {
            let mut out = File::create(&dest)?;
            io::copy(&mut entry, &mut out)?;
            info!("extracted {} from {} to {}", entry.name(), zip_path.display(), dest.display());
            extracted = true;
            break;
        }
    }

    if extracted {
        fs::remove_file(&zip_path)?;
    } else {
        warn!("{} holds no netCDF file", zip_path.display());
    }

    Ok(())
}

/// The most recently modified `*.zip` directly inside `dir`.
fn newest_zip(dir: &Path) -> io::Result<Option<PathBuf>> {
    let mut newest = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type()?.is_file() || path.extension().map_or(true, |ext| ext != "zip") {
            continue;
        }

        let modified = entry.metadata()?.modified()?;
        match &newest {
            Some((latest, _)) if *latest >= modified => {}
            _ => newest = Some((modified, path)),
        }
    }

    Ok(newest.map(|(_, path)| path))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use std::io::Write;

    use tempfile::TempDir;
    use zip::{write::SimpleFileOptions, ZipWriter};

    use super::*;

    fn date() -> DateStamp {
        DateStamp::parse("20250801").unwrap()
    }

    fn setup() -> (TempDir, WorkDir) {
        let tmp = TempDir::new().unwrap();
        let work = WorkDir::new(tmp.path());
        work.ensure_layout().unwrap();

        (tmp, work)
    }

    fn write_zip(path: &Path, members: &[(&str, &str)]) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        for (name, body) in members {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn should_move_map_out_of_nc() {
        let (_tmp, work) = setup();
        let stray = work.subdir(Subdir::Nc).join(Artifact::No2Map.file_name(&date()));
        fs::write(&stray, "png").unwrap();

        Collect::Relocate { artifact: Artifact::No2Map, from: Subdir::Nc }
            .apply(&work, &date())
            .unwrap();

        assert!(!stray.exists());
        assert!(work.path(Artifact::No2Map, &date()).exists());
    }

    #[test]
    fn should_leave_map_already_in_place() {
        let (_tmp, work) = setup();
        fs::write(work.path(Artifact::No2Map, &date()), "png").unwrap();

        Collect::Relocate { artifact: Artifact::No2Map, from: Subdir::Nc }
            .apply(&work, &date())
            .unwrap();

        assert!(work.path(Artifact::No2Map, &date()).exists());
    }

    #[test]
    fn should_extract_netcdf_member_and_drop_archive() {
        let (tmp, work) = setup();
        let zip_path = tmp.path().join("3f9a1c7e.zip");
        write_zip(&zip_path, &[("README.txt", "cams"), ("data_plev.nc", "netcdf")]);

        Collect::Unzip(Artifact::WindDataset).apply(&work, &date()).unwrap();

        let wind = work.path(Artifact::WindDataset, &date());
        assert_eq!(fs::read_to_string(wind).unwrap(), "netcdf");
        assert!(!zip_path.exists());
        assert!(!tmp.path().join("data_plev.nc").exists());
    }

    #[test]
    fn should_keep_archive_without_netcdf() {
        let (tmp, work) = setup();
        let zip_path = tmp.path().join("download.zip");
        write_zip(&zip_path, &[("README.txt", "cams")]);

        Collect::Unzip(Artifact::WindDataset).apply(&work, &date()).unwrap();

        assert!(zip_path.exists());
        assert!(!work.path(Artifact::WindDataset, &date()).exists());
    }

    #[test]
    fn should_reject_corrupt_archive() {
        let (tmp, work) = setup();
        fs::write(tmp.path().join("download.zip"), "not a zip").unwrap();

        let err = Collect::Unzip(Artifact::WindDataset)
            .apply(&work, &date())
            .unwrap_err();

        assert!(matches!(err, PipelineError::Archive { .. }));
    }

    #[test]
    fn should_tolerate_missing_archive() {
        let (_tmp, work) = setup();

        Collect::Unzip(Artifact::WindDataset).apply(&work, &date()).unwrap();

        assert!(!work.path(Artifact::WindDataset, &date()).exists());
    }
}
