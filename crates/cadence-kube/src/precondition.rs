//! Precondition checks run before a rollout starts
//!
//! Checks are independent: [`PreconditionList::run_all`] runs every check in
//! registration order and keeps every outcome, then
//! [`cadence_core::summarize`] reduces them to a single go/no-go verdict.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use cadence_core::{BoxError, UpdateError, is_patch_update, summarize};

use crate::cluster::{ClusterClient, cancellable};
use crate::error::KubeError;

/// Name reported by the FeatureGate check
pub const FEATURE_GATE_CHECK: &str = "FeatureGate";

/// Name reported by the Upgradeable check
pub const UPGRADEABLE_CHECK: &str = "ClusterVersionUpgradeable";

pub const NOT_ALLOWED_FEATURE_GATE_SET: &str = "NotAllowedFeatureGateSet";

/// Versions involved in the rollout being gated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseContext {
    pub current_version: String,
    pub target_version: String,
}

/// An independent check that may block a rollout
#[async_trait]
pub trait Precondition: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(())` when the check passes
    async fn run(
        &self,
        cluster: &dyn ClusterClient,
        release: &ReleaseContext,
    ) -> std::result::Result<(), BoxError>;
}

/// Blocks when the cluster FeatureGate enables a non-default feature set
pub struct FeatureGateCheck;

#[async_trait]
impl Precondition for FeatureGateCheck {
    fn name(&self) -> &str {
        FEATURE_GATE_CHECK
    }

    async fn run(
        &self,
        cluster: &dyn ClusterClient,
        _release: &ReleaseContext,
    ) -> std::result::Result<(), BoxError> {
        match cluster.feature_set().await? {
            Some(feature_set) if !feature_set.is_empty() => Err(UpdateError::new(
                NOT_ALLOWED_FEATURE_GATE_SET,
                FEATURE_GATE_CHECK,
                format!(
                    "Feature Gate {} is set for the cluster. This Feature Gate turns on features that are not part of the normal supported platform.",
                    feature_set
                ),
            )
            .into()),
            _ => Ok(()),
        }
    }
}

/// Blocks minor and major updates while the cluster reports `Upgradeable=False`
///
/// Patch-level updates always pass.
pub struct UpgradeableCheck;

#[async_trait]
impl Precondition for UpgradeableCheck {
    fn name(&self) -> &str {
        UPGRADEABLE_CHECK
    }

    async fn run(
        &self,
        cluster: &dyn ClusterClient,
        release: &ReleaseContext,
    ) -> std::result::Result<(), BoxError> {
        let Some(condition) = cluster.upgradeable_condition().await? else {
            return Ok(());
        };
        if condition.status != "False" {
            return Ok(());
        }

        if is_patch_update(&release.current_version, &release.target_version)? {
            debug!(
                current = %release.current_version,
                target = %release.target_version,
                "patch update allowed while not upgradeable"
            );
            return Ok(());
        }

        Err(UpdateError::new(
            condition
                .reason
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| "UpgradeableFalse".to_string()),
            UPGRADEABLE_CHECK,
            condition.message.unwrap_or_default(),
        )
        .into())
    }
}

/// Ordered set of precondition checks
#[derive(Default)]
pub struct PreconditionList {
    checks: Vec<Box<dyn Precondition>>,
}

impl PreconditionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// The checks a rollout is gated on by default
    pub fn standard() -> Self {
        let mut list = Self::new();
        list.push(Box::new(FeatureGateCheck));
        list.push(Box::new(UpgradeableCheck));
        list
    }

    pub fn push(&mut self, check: Box<dyn Precondition>) {
        self.checks.push(check);
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Run every check, keeping one outcome per check in registration order
    ///
    /// A failing check never stops the remaining ones. Cancellation is
    /// recorded as the outcome of the interrupted check and of every check
    /// after it.
    pub async fn run_all(
        &self,
        cluster: &dyn ClusterClient,
        release: &ReleaseContext,
        cancel: &CancellationToken,
    ) -> Vec<Option<BoxError>> {
        let mut outcomes = Vec::with_capacity(self.checks.len());

        for check in &self.checks {
            let during = format!("running precondition {}", check.name());
            let outcome = cancellable(cancel, &during, async {
                Ok::<_, KubeError>(check.run(cluster, release).await)
            })
            .await
            .unwrap_or_else(|cancelled| Err(cancelled.into()));

            if let Err(err) = &outcome {
                debug!(check = check.name(), error = %err, "precondition failed");
            }
            outcomes.push(outcome.err());
        }

        outcomes
    }

    /// Run every check and reduce the outcomes to `(block, combined_error)`
    pub async fn evaluate(
        &self,
        cluster: &dyn ClusterClient,
        release: &ReleaseContext,
        force: bool,
        cancel: &CancellationToken,
    ) -> (bool, Option<UpdateError>) {
        let outcomes = self.run_all(cluster, release, cancel).await;
        let (block, err) = summarize(outcomes, force);

        if let Some(err) = &err {
            if block {
                warn!(error = %err, "rollout blocked by preconditions");
            } else {
                warn!(error = %err, "precondition failures did not block the rollout");
            }
        }

        (block, err)
    }
}
