//! Ordered, fail-fast execution of the processing stages.

use tracing::{error, info};

use crate::{
    artifact::{Artifact, Subdir, WorkDir},
    bridge::DateBridge,
    collect::Collect,
    config::PipelineConfig,
    date_stamp::DateStamp,
    error::{PipelineError, Result},
    stage::{Stage, StageArg, StageReport},
};

pub struct Pipeline {
    interpreter: String,
    stages: Vec<Stage>,
}

#[derive(Debug)]
/// Reports of every stage that was started, in order. `failure` holds the
/// error that stopped the run, if any.
pub struct RunReport {
    pub stages: Vec<StageReport>,
    pub failure: Option<PipelineError>,
}

impl RunReport {
    pub fn into_result(self) -> Result<Vec<StageReport>> {
        match self.failure {
            Some(e) => Err(e),
            None => Ok(self.stages),
        }
    }
}

impl Pipeline {
    pub fn new(interpreter: &str, stages: Vec<Stage>) -> Self {
        Pipeline {
            interpreter: interpreter.to_string(),
            stages,
        }
    }

    /// The six stages of the daily run. Download scripts take no argument
    /// and work on today's date.
    pub fn daily(config: &PipelineConfig) -> Self {
        let scripts = &config.scripts;
        let stages = vec![
            Stage::new("sentinel no2", &scripts.no2).produces(&[Artifact::No2Dataset]),
            Stage::new("wind", &scripts.wind).produces(&[Artifact::WindDataset]),
            visualize_stage(config),
            quick_analysis_stage(config),
            windrose_stage(config),
            region_average_stage(config),
        ];

        Pipeline::new(&config.interpreter, stages)
    }

    /// Stages for a historical date. The downloads use their date-aware
    /// variants; visualization and analysis go through the date bridge.
    pub fn historical(config: &PipelineConfig) -> Self {
        let scripts = &config.scripts;
        let stages = vec![
            Stage::new("sentinel no2", &scripts.no2_for_date)
                .arg(StageArg::Compact)
                .produces(&[Artifact::No2Dataset]),
            Stage::new("wind", &scripts.wind_for_date)
                .arg(StageArg::Dashed)
                .collect(Collect::Unzip(Artifact::WindDataset))
                .produces(&[Artifact::WindDataset]),
            visualize_stage(config),
            quick_analysis_stage(config),
            windrose_stage(config),
            region_average_stage(config),
        ];

        Pipeline::new(&config.interpreter, stages)
    }

    /// Runs every stage for `date`, stopping at the first failure. `today`
    /// is what the today-bound scripts believe the date to be.
    pub async fn run(&self, work: &WorkDir, date: DateStamp, today: DateStamp) -> RunReport {
        let bridge = DateBridge::new(work, today, date);
        let mut reports = Vec::new();

        for stage in &self.stages {
            info!("[{}] starting for {}", stage.name, date);

            match self.run_stage(stage, work, &bridge).await {
                Ok(()) => reports.push(StageReport::succeeded(&stage.name)),
                Err(e) => {
                    error!(stage = e.stage().unwrap_or(&stage.name), "{}", e);
                    reports.push(StageReport::failed(&stage.name, &e));
                    return RunReport {
                        stages: reports,
                        failure: Some(e),
                    };
                }
            }
        }

        RunReport {
            stages: reports,
            failure: None,
        }
    }

    async fn run_stage(&self, stage: &Stage, work: &WorkDir, bridge: &DateBridge<'_>) -> Result<()> {
        let date = bridge.target();
        stage.check_inputs(work, date)?;

        if stage.today_bound && !bridge.is_identity() {
            let links = bridge.alias(&stage.requires)?;
            let result = self.execute(stage, work, bridge.today()).await;
            bridge.unalias(&links)?;
            result?;
            bridge.retarget_outputs()?;
        } else {
            self.execute(stage, work, date).await?;
        }

        stage.check_outputs(work, date)
    }

    async fn execute(&self, stage: &Stage, work: &WorkDir, date: &DateStamp) -> Result<()> {
        stage.execute(&self.interpreter, work, date).await?;
        stage.collect_outputs(work, date)
    }
}

/// The script saves the map next to its netCDF source, in `nc/`.
fn visualize_stage(config: &PipelineConfig) -> Stage {
    Stage::new("visualize", &config.scripts.visualize)
        .requires(&[Artifact::No2Dataset, Artifact::WindDataset])
        .collect(Collect::Relocate {
            artifact: Artifact::No2Map,
            from: Subdir::Nc,
        })
        .produces(&[Artifact::No2Map])
        .today_bound()
}

fn quick_analysis_stage(config: &PipelineConfig) -> Stage {
    Stage::new("quick analysis", &config.scripts.quick_analysis)
        .requires(&[Artifact::No2Map])
        .today_bound()
}

fn windrose_stage(config: &PipelineConfig) -> Stage {
    Stage::new("windrose", &config.scripts.windrose)
        .arg(StageArg::Artifact(Artifact::WindDataset))
        .requires(&[Artifact::WindDataset])
        .produces(&[Artifact::WindroseJson])
}

fn region_average_stage(config: &PipelineConfig) -> Stage {
    Stage::new("region average", &config.scripts.region_average)
        .arg(StageArg::Compact)
        .requires(&[Artifact::No2Dataset])
        .produces(&[Artifact::RegionAverageJson])
}

// -- Tests -------------------------------------------------------------------
