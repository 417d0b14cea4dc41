pub mod daily;
pub mod historical;

use std::fmt;

pub use daily::daily;
pub use historical::historical;

use crate::{
    artifact::WorkDir,
    cleanup::CleanupOutcome,
    config::PipelineConfig,
    date_stamp::DateStamp,
    stage::StageReport,
    transfer::{archive, distribute, TransferReport},
};

#[derive(Debug)]
/// Everything a successful run did, printed at the end.
pub struct RunSummary {
    pub date: DateStamp,
    pub stages: Vec<StageReport>,
    pub transfers: TransferReport,
    pub cleanup: Option<CleanupOutcome>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pipeline finished for {}", self.date.dashed())?;
        for stage in &self.stages {
            writeln!(f, "  {}", stage)?;
        }
        for outcome in &self.transfers.outcomes {
            writeln!(f, "  {}", outcome)?;
        }
        if let Some(cleanup) = &self.cleanup {
            writeln!(f, "  {}", cleanup)?;
        }

        Ok(())
    }
}

/// Distribution then archival. Neither can fail the run.
async fn ship(config: &PipelineConfig, work: &WorkDir) -> TransferReport {
    let mut report = distribute(&config.distribution, work).await;
    report.push(archive(&config.archival, work).await);

    report
}

#[cfg(all(test, unix))]
pub(crate) mod fixtures {
    use std::{
        fs::{self, File},
        io::Write,
        os::unix::fs::PermissionsExt,
        path::Path,
    };

    use zip::{write::SimpleFileOptions, ZipWriter};

    use crate::config::PipelineConfig;

    /// A CDS `netcdf_zip` download holding one netCDF member.
    pub fn write_wind_archive(path: &Path) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        writer.start_file("data_plev.nc", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"u10 v10").unwrap();
        writer.finish().unwrap();
    }

    /// Stub collaborators that leave the files where the real scripts do,
    /// with "today" pinned to `today`.
    pub fn write_stage_stubs(root: &Path, today: &str) {
        write_wind_archive(&root.join("cds-download.bin"));
        let wind_for_date = format!("cp {} ./5e7b21d4.zip\n", root.join("cds-download.bin").display());

        let stubs = [
            ("no2.sh", "touch nc/NO2_Indonesia_Daily_${1:-$TODAY}_linear_interp.nc\n"),
            ("wind.sh", "touch nc/wind_$TODAY.nc\n"),
            ("wind-date.sh", wind_for_date.as_str()),
            ("visualize.sh", "touch nc/NO2_Indonesia_Daily_${TODAY}_linear_interp.png\n"),
            ("analysis.sh", "touch json/hasil_analisis_$TODAY.json txt/laporan_detail_id_$TODAY.txt\n"),
            ("windrose.sh", "D=$(basename $1 .nc | cut -d_ -f2)\ntouch json/windrose_data_$D.json\n"),
            ("region.sh", "touch json/region_avg_$1.json\n"),
        ];

        for (name, body) in stubs {
            fs::write(root.join(name), format!("TODAY={}\n{}", today, body)).unwrap();
        }
    }

    /// Executable stand-ins for scp, ssh and rclone. They copy into
    /// `remote/` and `archive/` under `root`.
    pub fn write_transfer_stubs(root: &Path) -> (String, String, String) {
        let scp = root.join("fake-scp");
        fs::write(
            &scp,
            format!("#!/bin/sh\nmkdir -p {0}/remote && cp -R \"$3\" {0}/remote/\n", root.display()),
        )
        .unwrap();

        let ssh = root.join("fake-ssh");
        fs::write(
            &ssh,
            format!("#!/bin/sh\nls -1 {}/remote/$(basename \"$4\")\n", root.display()),
        )
        .unwrap();

        let rclone = root.join("fake-rclone");
        fs::write(
            &rclone,
            format!(
                "#!/bin/sh\n[ \"$1\" = copy ] || exit 0\nmkdir -p {0}/archive && cp -R \"$2\"/. {0}/archive/\n",
                root.display()
            ),
        )
        .unwrap();

        for stub in [&scp, &ssh, &rclone] {
            fs::set_permissions(stub, fs::Permissions::from_mode(0o755)).unwrap();
        }

        (
            scp.to_string_lossy().to_string(),
            ssh.to_string_lossy().to_string(),
            rclone.to_string_lossy().to_string(),
        )
    }

    pub fn stub_config(root: &Path) -> PipelineConfig {
        let (scp, ssh, rclone) = write_transfer_stubs(root);
        let mut config = PipelineConfig {
            work_dir: root.join("work"),
            interpreter: "sh".to_string(),
            ..Default::default()
        };

        let scripts = &mut config.scripts;
        scripts.no2 = root.join("no2.sh");
        scripts.no2_for_date = root.join("no2.sh");
        scripts.wind = root.join("wind.sh");
        scripts.wind_for_date = root.join("wind-date.sh");
        scripts.visualize = root.join("visualize.sh");
        scripts.quick_analysis = root.join("analysis.sh");
        scripts.windrose = root.join("windrose.sh");
        scripts.region_average = root.join("region.sh");

        config.distribution.password_env = None;
        config.distribution.scp = scp;
        config.distribution.ssh = ssh;
        config.archival.rclone = rclone;

        config
    }
}
