use anyhow::Result;
use tracing::info;

use crate::{
    artifact::WorkDir, config::PipelineConfig, date_stamp::DateStamp, runner::Pipeline,
};

use super::{ship, RunSummary};

/// Reprocesses a past date. The date is validated before anything runs;
/// outputs are shipped but not cleaned up.
pub async fn historical(config: &PipelineConfig, date: &str) -> Result<RunSummary> {
    let date = DateStamp::parse(date)?;
    run(config, date, DateStamp::today()).await
}

async fn run(config: &PipelineConfig, date: DateStamp, today: DateStamp) -> Result<RunSummary> {
    let work = WorkDir::new(&config.work_dir);
    work.ensure_layout()?;

    info!("historical run for {} (today is {})", date, today);
    let stages = Pipeline::historical(config)
        .run(&work, date, today)
        .await
        .into_result()?;

    let transfers = ship(config, &work).await;

    Ok(RunSummary {
        date,
        stages,
        transfers,
        cleanup: None,
    })
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::PipelineError;

    #[tokio::test]
    async fn should_reject_malformed_date_before_running() {
        let config = PipelineConfig {
            work_dir: "/nonexistent/sentinel-no2".into(),
            ..Default::default()
        };

        for bad in ["2025-08-01", "2025080", "20251301"] {
            let err = historical(&config, bad).await.unwrap_err();
            assert!(matches!(
                err.downcast_ref::<PipelineError>(),
                Some(PipelineError::InvalidDate(_))
            ));
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn should_leave_no_today_files_behind() {
        use tempfile::TempDir;

        use crate::{
            artifact::{Artifact, Subdir},
            cli::command::fixtures::{stub_config, write_stage_stubs},
        };

        const T: &str = "20251016";
        const D: &str = "20250801";

        let tmp = TempDir::new().unwrap();
        write_stage_stubs(tmp.path(), T);
        let config = stub_config(tmp.path());
        let date = DateStamp::parse(D).unwrap();

        let summary = run(&config, date, DateStamp::parse(T).unwrap()).await.unwrap();

        assert!(summary.cleanup.is_none());
        let work = WorkDir::new(&config.work_dir);
        for artifact in [
            Artifact::No2Dataset,
            Artifact::WindDataset,
            Artifact::No2Map,
            Artifact::WindroseJson,
            Artifact::RegionAverageJson,
        ] {
            assert!(work.path(artifact, &date).exists(), "{:?}", artifact);
        }
        assert!(work.subdir(Subdir::Txt).join(format!("laporan_detail_id_{D}.txt")).exists());

        for subdir in Subdir::ALL {
            for path in work.files(subdir).unwrap() {
                assert!(!path.to_string_lossy().contains(T), "{}", path.display());
            }
        }
    }
}
