//! A single collaborator script together with the artifacts it needs and
//! makes.

use std::{
    fmt, io,
    path::{Path, PathBuf},
    process::Stdio,
};

use indicatif::ProgressBar;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
};
use tracing::{debug, info};

use crate::{
    artifact::{Artifact, WorkDir},
    cli::create_spinner,
    collect::Collect,
    date_stamp::DateStamp,
    error::{PipelineError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The positional argument a collaborator script expects.
pub enum StageArg {
    None,
    /// `20250801`
    Compact,
    /// `2025-08-01`
    Dashed,
    /// Path of an artifact relative to the working directory.
    Artifact(Artifact),
}

#[derive(Debug, Clone)]
pub struct Stage {
    pub name: String,
    pub script: PathBuf,
    pub arg: StageArg,
    pub requires: Vec<Artifact>,
    pub produces: Vec<Artifact>,
    /// Post-processing of what the script left behind, applied before the
    /// outputs are checked.
    pub collect: Option<Collect>,
    /// The script ignores any date argument and works on "today".
    pub today_bound: bool,
}

impl Stage {
    pub fn new(name: &str, script: impl Into<PathBuf>) -> Self {
        Stage {
            name: name.to_string(),
            script: script.into(),
            arg: StageArg::None,
            requires: Vec::new(),
            produces: Vec::new(),
            collect: None,
            today_bound: false,
        }
    }

    pub fn arg(mut self, arg: StageArg) -> Self {
        self.arg = arg;
        self
    }

    pub fn requires(mut self, artifacts: &[Artifact]) -> Self {
        self.requires = artifacts.to_vec();
        self
    }

    pub fn produces(mut self, artifacts: &[Artifact]) -> Self {
        self.produces = artifacts.to_vec();
        self
    }

    pub fn collect(mut self, collect: Collect) -> Self {
        self.collect = Some(collect);
        self
    }

    pub fn today_bound(mut self) -> Self {
        self.today_bound = true;
        self
    }

    /// Fails with `MissingInput` on the first required artifact that is absent.
    pub fn check_inputs(&self, work: &WorkDir, date: &DateStamp) -> Result<()> {
        check_all(&self.requires, work, date, |path| PipelineError::MissingInput {
            stage: self.name.clone(),
            path,
        })
    }

    pub fn check_outputs(&self, work: &WorkDir, date: &DateStamp) -> Result<()> {
        check_all(&self.produces, work, date, |path| PipelineError::MissingOutput {
            stage: self.name.clone(),
            path,
        })
    }

    fn argument(&self, date: &DateStamp) -> Option<String> {
        match self.arg {
            StageArg::None => None,
            StageArg::Compact => Some(date.compact()),
            StageArg::Dashed => Some(date.dashed()),
            StageArg::Artifact(artifact) => Some(
                Path::new(artifact.subdir().name())
                    .join(artifact.file_name(date))
                    .to_string_lossy()
                    .to_string(),
            ),
        }
    }

    pub fn command(&self, interpreter: &str, work: &WorkDir, date: &DateStamp) -> Command {
        let mut cmd = Command::new(interpreter);
        cmd.arg(&self.script).current_dir(work.root());
        if let Some(arg) = self.argument(date) {
            cmd.arg(arg);
        }

        cmd
    }

    /// Runs the script to completion behind a spinner, echoing its output
    /// above it. There is no timeout.
    pub async fn execute(&self, interpreter: &str, work: &WorkDir, date: &DateStamp) -> Result<()> {
        let mut cmd = self.command(interpreter, work, date);
        cmd.env("PYTHONUNBUFFERED", "1")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!("executing {cmd:?}");

        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;
        let bar = create_spinner(format!("Running {}...", self.name));

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (status, _, _) = tokio::join!(
            child.wait(),
            echo(stdout, &bar, Stream::Stdout),
            echo(stderr, &bar, Stream::Stderr),
        );
        let status = status.map_err(|e| self.spawn_error(e))?;

        if !status.success() {
            bar.abandon_with_message(format!("{} failed", self.name));
            return Err(PipelineError::StageFailed {
                stage: self.name.clone(),
                status,
            });
        }

        bar.finish_with_message(format!("{} done", self.name));
        info!("[{}] completed with status {}", self.name, status);
        Ok(())
    }

    /// Applies the stage's [`Collect`] step, if any, for the date the script
    /// ran under.
    pub fn collect_outputs(&self, work: &WorkDir, date: &DateStamp) -> Result<()> {
        match &self.collect {
            Some(collect) => collect.apply(work, date),
            None => Ok(()),
        }
    }

    fn spawn_error(&self, source: io::Error) -> PipelineError {
        PipelineError::Spawn {
            stage: self.name.clone(),
            source,
        }
    }
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Copies a child's output line by line to ours, suspending the spinner
/// while each line is written.
async fn echo(stream: Option<impl AsyncRead + Unpin>, bar: &ProgressBar, target: Stream) {
    let Some(stream) = stream else {
        return;
    };

    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']);
                bar.suspend(|| match target {
                    Stream::Stdout => println!("{line}"),
                    Stream::Stderr => eprintln!("{line}"),
                });
            }
        }
    }
}

fn check_all(
    artifacts: &[Artifact],
    work: &WorkDir,
    date: &DateStamp,
    error: impl Fn(PathBuf) -> PipelineError,
) -> Result<()> {
    for artifact in artifacts {
        let path = work.path(*artifact, date);
        if !path.exists() {
            return Err(error(path));
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone)]
/// Outcome of one executed stage.
pub struct StageReport {
    pub name: String,
    pub status: StageStatus,
    pub message: String,
}

impl StageReport {
    pub fn succeeded(name: &str) -> Self {
        StageReport {
            name: name.to_string(),
            status: StageStatus::Succeeded,
            message: "ok".to_string(),
        }
    }

    pub fn failed(name: &str, error: &PipelineError) -> Self {
        StageReport {
            name: name.to_string(),
            status: StageStatus::Failed,
            message: error.to_string(),
        }
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = match self.status {
            StageStatus::Succeeded => "✅",
            StageStatus::Failed => "❌",
        };
        write!(f, "{} {}: {}", mark, self.name, self.message)
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::artifact::Subdir;

    fn date() -> DateStamp {
        DateStamp::parse("20250801").unwrap()
    }

    #[test]
    fn should_render_arguments() {
        let d = date();
        let stage = Stage::new("windrose", "05.py");
        assert_eq!(stage.argument(&d), None);

        let stage = stage.arg(StageArg::Artifact(Artifact::WindDataset));
        assert_eq!(stage.argument(&d), Some("nc/wind_20250801.nc".to_string()));

        let stage = Stage::new("wind", "yy.py").arg(StageArg::Dashed);
        assert_eq!(stage.argument(&d), Some("2025-08-01".to_string()));

        let stage = Stage::new("region", "06.py").arg(StageArg::Compact);
        assert_eq!(stage.argument(&d), Some("20250801".to_string()));
    }

    #[test]
    fn should_report_first_missing_input() {
        let tmp = TempDir::new().unwrap();
        let work = WorkDir::new(tmp.path());
        work.ensure_layout().unwrap();
        fs::write(work.path(Artifact::No2Dataset, &date()), "").unwrap();

        let stage = Stage::new("visualize", "03.py")
            .requires(&[Artifact::No2Dataset, Artifact::WindDataset]);

        match stage.check_inputs(&work, &date()) {
            Err(PipelineError::MissingInput { stage, path }) => {
                assert_eq!(stage, "visualize");
                assert!(path.ends_with("nc/wind_20250801.nc"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn should_fail_on_non_zero_exit() {
        let tmp = TempDir::new().unwrap();
        let work = WorkDir::new(tmp.path());
        fs::write(tmp.path().join("fail.sh"), "exit 3\n").unwrap();

        let stage = Stage::new("visualize", "fail.sh");
        let err = stage.execute("sh", &work, &date()).await.unwrap_err();

        assert!(matches!(err, PipelineError::StageFailed { .. }));
        assert_eq!(err.stage(), Some("visualize"));
    }

    #[tokio::test]
    async fn should_fail_when_interpreter_is_missing() {
        let tmp = TempDir::new().unwrap();
        let work = WorkDir::new(tmp.path());

        let stage = Stage::new("no2", "01.py");
        let err = stage
            .execute("definitely-not-an-interpreter", &work, &date())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn should_drain_output_of_chatty_script() {
        let tmp = TempDir::new().unwrap();
        let work = WorkDir::new(tmp.path());
        work.ensure_layout().unwrap();
        fs::write(
            tmp.path().join("chatty.sh"),
            "i=0\nwhile [ $i -lt 5000 ]; do echo \"progress $i\"; echo \"warn $i\" >&2; i=$((i+1)); done\ntouch \"json/region_avg_$1.json\"\n",
        )
        .unwrap();

        let stage = Stage::new("region average", "chatty.sh")
            .arg(StageArg::Compact)
            .produces(&[Artifact::RegionAverageJson]);

        stage.execute("sh", &work, &date()).await.unwrap();
        stage.check_outputs(&work, &date()).unwrap();
    }

    #[test]
    fn should_collect_only_when_configured() {
        let tmp = TempDir::new().unwrap();
        let work = WorkDir::new(tmp.path());
        work.ensure_layout().unwrap();
        let stray = work.subdir(Subdir::Nc).join(Artifact::No2Map.file_name(&date()));
        fs::write(&stray, "").unwrap();

        let plain = Stage::new("visualize", "03.py").produces(&[Artifact::No2Map]);
        plain.collect_outputs(&work, &date()).unwrap();
        assert!(plain.check_outputs(&work, &date()).is_err());

        let stage = plain.collect(Collect::Relocate {
            artifact: Artifact::No2Map,
            from: Subdir::Nc,
        });
        stage.collect_outputs(&work, &date()).unwrap();
        stage.check_outputs(&work, &date()).unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn should_pass_argument_and_run_in_work_dir() {
        let tmp = TempDir::new().unwrap();
        let work = WorkDir::new(tmp.path());
        work.ensure_layout().unwrap();
        fs::write(tmp.path().join("touch.sh"), "touch \"json/region_avg_$1.json\"\n").unwrap();

        let stage = Stage::new("region average", "touch.sh")
            .arg(StageArg::Compact)
            .produces(&[Artifact::RegionAverageJson]);

        stage.execute("sh", &work, &date()).await.unwrap();
        stage.check_outputs(&work, &date()).unwrap();
    }
}
