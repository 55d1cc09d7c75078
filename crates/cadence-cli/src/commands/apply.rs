//! Apply command - mutate, submit and verify workload manifests

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cadence_core::BuilderMode;
use cadence_kube::{BuilderConfig, Health, KubeError, LiveCluster, ResourceBuilder, Workload};
use console::style;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{CliError, Result};

/// How long to keep re-verifying unhealthy workloads
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    pub enabled: bool,
    pub timeout_secs: u64,
    pub interval_secs: u64,
}

/// Decode every manifest file, in the order given
pub fn load_manifests(files: &[PathBuf]) -> Result<Vec<Workload>> {
    let mut workloads = Vec::new();

    for path in files {
        let content = std::fs::read_to_string(path).map_err(|e| CliError::Io {
            message: format!("{}: {}", path.display(), e),
        })?;
        let decoded = Workload::parse_all(&content)
            .map_err(|e| CliError::manifest(format!("{}: {}", path.display(), e)))?;
        workloads.extend(decoded);
    }

    if workloads.is_empty() {
        return Err(CliError::input("no Deployment or DaemonSet found in the given files"));
    }

    Ok(workloads)
}

/// Run the apply command
pub async fn run(
    files: &[PathBuf],
    mode: BuilderMode,
    wait: WaitOptions,
    cancel: &CancellationToken,
) -> Result<()> {
    // Decode before connecting so bad input fails fast
    let workloads = load_manifests(files)?;

    let cluster = LiveCluster::try_default().await?;
    let builder = ResourceBuilder::new(Arc::new(cluster), BuilderConfig::with_mode(mode));

    apply_workloads(&builder, workloads, wait, cancel).await
}

/// Apply workloads in order, stopping at the first failure
///
/// Only a health failure after a successful submission is waited on.
/// Anything else means the manifest may never have reached the cluster.
pub async fn apply_workloads(
    builder: &ResourceBuilder,
    workloads: Vec<Workload>,
    wait: WaitOptions,
    cancel: &CancellationToken,
) -> Result<()> {
    println!(
        "{} Applying {} workload(s) in {} mode",
        style("→").blue().bold(),
        workloads.len(),
        style(builder.mode()).yellow()
    );

    for workload in workloads {
        let identity = workload.identity();
        let kind = workload.kind();

        match builder.apply(workload.clone(), cancel).await {
            Ok(()) => {}
            Err(err @ KubeError::Unhealthy(_)) if wait.enabled => {
                println!(
                    "{} {} {} submitted, waiting: {}",
                    style("…").dim(),
                    kind,
                    style(&identity).cyan(),
                    err
                );
                wait_until_healthy(builder, &workload, wait, cancel).await?;
            }
            Err(err) => return Err(err.into()),
        }

        println!(
            "{} {} {} applied",
            style("✓").green().bold(),
            kind,
            style(&identity).cyan()
        );
    }

    Ok(())
}

/// Re-verify until healthy, a non-retryable failure, timeout or cancellation
async fn wait_until_healthy(
    builder: &ResourceBuilder,
    workload: &Workload,
    wait: WaitOptions,
    cancel: &CancellationToken,
) -> Result<()> {
    let deadline = Instant::now() + Duration::from_secs(wait.timeout_secs);
    let interval = Duration::from_secs(wait.interval_secs.max(1));

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let during = format!("waiting for {}", workload.identity());
                return Err(KubeError::Cancelled(during).into());
            }
            _ = tokio::time::sleep_until(deadline.min(Instant::now() + interval)) => {}
        }

        match builder.verify(workload, cancel).await {
            Ok(Health::Healthy) => return Ok(()),
            Ok(Health::Unknown) => {
                println!(
                    "{} {} reports no recognized conditions, not waiting further",
                    style("⚠").yellow(),
                    style(workload.identity()).cyan()
                );
                return Ok(());
            }
            Err(err) if err.is_retryable() && Instant::now() < deadline => {
                debug!(workload = %workload.identity(), error = %err, "still waiting");
            }
            Err(err) if err.is_retryable() => {
                return Err(CliError::Unhealthy {
                    message: err.to_string(),
                    help: Some(format!(
                        "not healthy after {}s; raise --timeout to wait longer",
                        wait.timeout_secs
                    )),
                });
            }
            Err(err) => return Err(err.into()),
        }
    }
}
