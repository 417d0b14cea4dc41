use anyhow::Result;
use tracing::info;

use crate::{
    artifact::WorkDir, cleanup::clean_after_transfer, config::PipelineConfig,
    date_stamp::DateStamp, runner::Pipeline,
};

use super::{ship, RunSummary};

/// The full daily run: all six stages for today, then distribution,
/// archival and cleanup.
pub async fn daily(config: &PipelineConfig) -> Result<RunSummary> {
    run(config, DateStamp::today()).await
}

async fn run(config: &PipelineConfig, today: DateStamp) -> Result<RunSummary> {
    let work = WorkDir::new(&config.work_dir);
    work.ensure_layout()?;

    info!("daily run for {} in {}", today, work.root().display());
    let stages = Pipeline::daily(config)
        .run(&work, today, today)
        .await
        .into_result()?;

    let transfers = ship(config, &work).await;
    let cleanup = clean_after_transfer(&config.cleanup, &work, &transfers)?;

    Ok(RunSummary {
        date: today,
        stages,
        transfers,
        cleanup: Some(cleanup),
    })
}

// -- Tests -------------------------------------------------------------------
