//! Preconditions command - evaluate upgrade gating against the cluster

use cadence_kube::{LiveCluster, PreconditionList, ReleaseContext};
use console::style;
use tokio_util::sync::CancellationToken;

use crate::error::{CliError, Result};

/// Run the preconditions command
pub async fn run(
    current: &str,
    target: &str,
    force: bool,
    output_json: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    if current.trim().is_empty() || target.trim().is_empty() {
        return Err(CliError::input("both --current and --target are required"));
    }

    let release = ReleaseContext {
        current_version: current.to_string(),
        target_version: target.to_string(),
    };

    let cluster = LiveCluster::try_default().await?;
    let checks = PreconditionList::standard();
    let (block, err) = checks.evaluate(&cluster, &release, force, cancel).await;

    if cancel.is_cancelled() {
        return Err(CliError::Cancelled {
            message: "precondition checks interrupted".to_string(),
        });
    }

    if output_json {
        let report = serde_json::json!({
            "current": current,
            "target": target,
            "force": force,
            "block": block,
            "reason": err.as_ref().map(|e| e.reason.clone()),
            "message": err.as_ref().map(|e| e.message.clone()),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&report).map_err(|e| CliError::input(e.to_string()))?
        );
    } else {
        match &err {
            None => println!(
                "{} All {} precondition checks passed for {} → {}",
                style("✓").green().bold(),
                checks.len(),
                style(current).yellow(),
                style(target).yellow()
            ),
            Some(err) if !block => {
                println!("{} {}", style("⚠").yellow(), err.message);
            }
            Some(_) => {}
        }
    }

    match err {
        Some(err) if block => Err(CliError::Blocked {
            message: err.message,
        }),
        _ => Ok(()),
    }
}
