//! Copies the output directories to the web server with `scp -r -p`.

use std::{
    collections::HashSet,
    env,
    path::{Path, PathBuf},
};

use tokio::process::Command;
use tracing::{info, warn};

use super::{run_tool, TransferOutcome, TransferReport};
use crate::{artifact::WorkDir, cli::create_spinner, config::DistributionConfig};

/// Copies each configured directory independently; one failure does not
/// stop the others.
pub async fn distribute(config: &DistributionConfig, work: &WorkDir) -> TransferReport {
    let destination = config.destination();
    let mut report = TransferReport::default();

    let secret = match &config.password_env {
        Some(var) => match env::var(var) {
            Ok(secret) => Some(secret),
            Err(_) => {
                warn!("scp password variable {} is not set", var);
                for subdir in &config.directories {
                    report.push(TransferOutcome {
                        target: subdir.name().to_string(),
                        files: 0,
                        verified: false,
                        message: format!("{} not set", var),
                    });
                }
                return report;
            }
        },
        None => None,
    };

    for subdir in &config.directories {
        let source = work.subdir(*subdir);
        let name = subdir.name();

        let local = match work.files(*subdir) {
            Ok(files) if source.is_dir() => files,
            _ => {
                warn!("{} does not exist, skipping", source.display());
                report.push(TransferOutcome {
                    target: name.to_string(),
                    files: 0,
                    verified: false,
                    message: "local directory missing".to_string(),
                });
                continue;
            }
        };
        let files = local.len();

        let bar = create_spinner(format!("Copying {} to {}...", name, config.host));
        let mut cmd = scp_command(config, secret.as_deref(), &source, &destination);
        if let Err(message) = run_tool(&mut cmd).await {
            bar.abandon_with_message(format!("{} copy failed", name));
            warn!("copying {} failed: {}", name, message);
            report.push(TransferOutcome {
                target: name.to_string(),
                files,
                verified: false,
                message,
            });
            continue;
        }

        let outcome = if config.verify {
            match missing_on_remote(config, secret.as_deref(), name, &local).await {
                Ok(missing) if missing.is_empty() => {
                    bar.finish_with_message(format!("{} copied and listed", name));
                    info!("copied {} files from {} to {}", files, name, destination);
                    TransferOutcome {
                        target: name.to_string(),
                        files,
                        verified: true,
                        message: format!("copied to {} and listed", destination),
                    }
                }
                Ok(missing) => {
                    bar.abandon_with_message(format!("{} incomplete on remote", name));
                    warn!("{} files of {} missing on remote: {}", missing.len(), name, missing.join(", "));
                    TransferOutcome {
                        target: name.to_string(),
                        files,
                        verified: false,
                        message: format!("{} files missing on remote", missing.len()),
                    }
                }
                Err(message) => {
                    bar.abandon_with_message(format!("{} not verified", name));
                    warn!("listing remote {} failed: {}", name, message);
                    TransferOutcome {
                        target: name.to_string(),
                        files,
                        verified: false,
                        message: format!("copied but not verified: {}", message),
                    }
                }
            }
        } else {
            bar.finish_with_message(format!("{} copied", name));
            info!("copied {} files from {} to {}", files, name, destination);
            TransferOutcome {
                target: name.to_string(),
                files,
                verified: true,
                message: format!("copied to {}", destination),
            }
        };
        report.push(outcome);
    }

    report
}

/// Lists `<remote_base>/<name>` over ssh and returns the local file names
/// absent from it.
async fn missing_on_remote(
    config: &DistributionConfig,
    secret: Option<&str>,
    name: &str,
    local: &[PathBuf],
) -> Result<Vec<String>, String> {
    let mut cmd = remote_command(config, secret, &config.ssh);
    cmd.arg(config.login())
        .arg("ls")
        .arg("-1")
        .arg(format!("{}/{}", config.remote_base, name));
    let listing = run_tool(&mut cmd).await?;
    let remote: HashSet<&str> = listing.lines().map(str::trim).collect();

    Ok(local
        .iter()
        .filter_map(|path| path.file_name())
        .map(|file| file.to_string_lossy().to_string())
        .filter(|file| !remote.contains(file.as_str()))
        .collect())
}

/// The password travels in `SSHPASS`, never on the command line.
fn remote_command(config: &DistributionConfig, secret: Option<&str>, program: &str) -> Command {
    match secret {
        Some(secret) => {
            let mut cmd = Command::new(&config.sshpass);
            cmd.arg("-e").arg(program).env("SSHPASS", secret);
            cmd
        }
        None => Command::new(program),
    }
}

fn scp_command(
    config: &DistributionConfig,
    secret: Option<&str>,
    source: &Path,
    destination: &str,
) -> Command {
    let mut cmd = remote_command(config, secret, &config.scp);
    cmd.arg("-r").arg("-p").arg(source).arg(destination);

    cmd
}

// -- Tests -------------------------------------------------------------------
