//! Health evaluation of live workloads
//!
//! Each call classifies one point-in-time snapshot of a live object. Callers
//! re-fetch and re-evaluate to observe progress; no backoff happens here.
//!
//! A Deployment is judged by its status conditions:
//! - `ReplicaFailure=True` fails with `WorkloadNotProgressing`
//! - `Available=False` together with `Progressing=False` fails with `WorkloadNotAvailable`
//! - anything else is healthy, including a Deployment with no recognized conditions
//!
//! DaemonSets expose no usable conditions, so only deletion is checked.

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, DeploymentCondition};
use tracing::warn;

use cadence_core::UpdateError;

use crate::error::{KubeError, Result};
use crate::workload::{DEFAULT_NAMESPACE, Workload, WorkloadKind};

pub const WORKLOAD_NOT_AVAILABLE: &str = "WorkloadNotAvailable";
pub const WORKLOAD_NOT_PROGRESSING: &str = "WorkloadNotProgressing";

const CONDITION_PROGRESSING: &str = "Progressing";
const CONDITION_AVAILABLE: &str = "Available";
const CONDITION_REPLICA_FAILURE: &str = "ReplicaFailure";

/// Outcome of a passing health evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    /// Recognized conditions report no failure
    Healthy,
    /// No recognized conditions; not failing, but state is unknown
    Unknown,
}

/// Last-seen condition of each recognized type
#[derive(Debug, Default)]
struct DeploymentConditions<'a> {
    progressing: Option<&'a DeploymentCondition>,
    available: Option<&'a DeploymentCondition>,
    replica_failure: Option<&'a DeploymentCondition>,
}

impl<'a> DeploymentConditions<'a> {
    /// Single pass; a repeated type is overwritten by the later entry
    fn scan(conditions: &'a [DeploymentCondition]) -> Self {
        conditions.iter().fold(Self::default(), |mut acc, c| {
            match c.type_.as_str() {
                CONDITION_PROGRESSING => acc.progressing = Some(c),
                CONDITION_AVAILABLE => acc.available = Some(c),
                CONDITION_REPLICA_FAILURE => acc.replica_failure = Some(c),
                _ => {}
            }
            acc
        })
    }

    fn is_empty(&self) -> bool {
        self.progressing.is_none() && self.available.is_none() && self.replica_failure.is_none()
    }
}

fn reason(c: &DeploymentCondition) -> &str {
    c.reason.as_deref().unwrap_or_default()
}

fn message(c: &DeploymentCondition) -> &str {
    c.message.as_deref().unwrap_or_default()
}

fn identity(meta: &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta) -> String {
    format!(
        "{}/{}",
        meta.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE),
        meta.name.as_deref().unwrap_or_default()
    )
}

/// Evaluate a live Deployment
pub fn deployment_health(live: &Deployment) -> Result<Health> {
    let iden = identity(&live.metadata);

    if live.metadata.deletion_timestamp.is_some() {
        return Err(KubeError::BeingDeleted {
            kind: WorkloadKind::Deployment,
            name: iden,
        });
    }

    let status = live.status.as_ref();
    let conditions =
        DeploymentConditions::scan(
            status
                .and_then(|s| s.conditions.as_deref())
                .unwrap_or_default(),
        );

    let replicas = status.and_then(|s| s.replicas).unwrap_or(0);
    let updated = status.and_then(|s| s.updated_replicas).unwrap_or(0);
    let available = status.and_then(|s| s.available_replicas).unwrap_or(0);
    let unavailable = status.and_then(|s| s.unavailable_replicas).unwrap_or(0);

    if let Some(failure) = conditions
        .replica_failure
        .filter(|c| c.status == "True")
    {
        return Err(UpdateError::new(
            WORKLOAD_NOT_PROGRESSING,
            iden.clone(),
            format!(
                "deployment {} has a replica failure {}: {}; unavailable replicas={}",
                iden,
                reason(failure),
                message(failure),
                unavailable
            ),
        )
        .with_nested(format!(
            "deployment {} has some pods failing; unavailable replicas={}",
            iden, unavailable
        ))
        .into());
    }

    if let (Some(avail), Some(prog)) = (conditions.available, conditions.progressing) {
        if avail.status == "False" && prog.status == "False" {
            return Err(UpdateError::new(
                WORKLOAD_NOT_AVAILABLE,
                iden.clone(),
                format!(
                    "deployment {} is not available {} ({}) or progressing {} ({}); updated replicas={} of {}, available replicas={} of {}",
                    iden,
                    reason(avail),
                    message(avail),
                    reason(prog),
                    message(prog),
                    updated,
                    replicas,
                    available,
                    replicas
                ),
            )
            .with_nested(format!(
                "deployment {} is not available and not progressing; updated replicas={} of {}, available replicas={} of {}",
                iden, updated, replicas, available, replicas
            ))
            .into());
        }
    }

    if conditions.is_empty() {
        warn!(
            deployment = %iden,
            "deployment is not setting any expected conditions, and is therefore in an unknown state"
        );
        return Ok(Health::Unknown);
    }

    Ok(Health::Healthy)
}

/// Evaluate a live DaemonSet
pub fn daemonset_health(live: &DaemonSet) -> Result<Health> {
    if live.metadata.deletion_timestamp.is_some() {
        return Err(KubeError::BeingDeleted {
            kind: WorkloadKind::DaemonSet,
            name: identity(&live.metadata),
        });
    }

    Ok(Health::Healthy)
}

/// Evaluate any supported live workload
pub fn workload_health(live: &Workload) -> Result<Health> {
    match live {
        Workload::Deployment(d) => deployment_health(d),
        Workload::DaemonSet(d) => daemonset_health(d),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use k8s_openapi::api::apps::v1::DeploymentStatus;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};

    fn condition(type_: &str, status: &str) -> DeploymentCondition {
        DeploymentCondition {
            type_: type_.to_string(),
            status: status.to_string(),
            reason: Some(format!("{}Reason", type_)),
            message: Some(format!("{} is {}", type_, status)),
            ..Default::default()
        }
    }

    fn deployment(conditions: Vec<DeploymentCondition>) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some("web".to_string()),
                namespace: Some("shop".to_string()),
                ..Default::default()
            },
            status: Some(DeploymentStatus {
                replicas: Some(3),
                updated_replicas: Some(2),
                available_replicas: Some(1),
                unavailable_replicas: Some(2),
                conditions: Some(conditions),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn daemonset(deleting: bool) -> DaemonSet {
        DaemonSet {
            metadata: ObjectMeta {
                name: Some("agent".to_string()),
                namespace: Some("infra".to_string()),
                deletion_timestamp: deleting.then(|| Time(Utc::now())),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn failure_reason(result: Result<Health>) -> String {
        match result {
            Err(KubeError::Unhealthy(err)) => err.reason,
            other => panic!("expected a health failure, got {:?}", other),
        }
    }

    #[test]
    fn test_replica_failure_wins_over_everything() {
        for (available, progressing) in [("True", "True"), ("False", "False"), ("False", "True")] {
            let d = deployment(vec![
                condition("Available", available),
                condition("Progressing", progressing),
                condition("ReplicaFailure", "True"),
            ]);
            assert_eq!(failure_reason(deployment_health(&d)), WORKLOAD_NOT_PROGRESSING);
        }
    }

    #[test]
    fn test_replica_failure_message() {
        let d = deployment(vec![condition("ReplicaFailure", "True")]);
        let Err(KubeError::Unhealthy(err)) = deployment_health(&d) else {
            panic!("expected replica failure");
        };

        assert_eq!(err.name, "shop/web");
        assert!(err.message.contains("ReplicaFailureReason"));
        assert!(err.message.contains("unavailable replicas=2"));
        assert!(err.nested.is_some());
    }

    #[test]
    fn test_not_available_and_not_progressing() {
        let d = deployment(vec![
            condition("Available", "False"),
            condition("Progressing", "False"),
        ]);
        let Err(KubeError::Unhealthy(err)) = deployment_health(&d) else {
            panic!("expected unavailable deployment");
        };

        assert_eq!(err.reason, WORKLOAD_NOT_AVAILABLE);
        assert_eq!(err.name, "shop/web");
        assert!(err.message.contains("updated replicas=2 of 3"));
        assert!(err.message.contains("available replicas=1 of 3"));
    }

    #[test]
    fn test_not_available_but_progressing_is_healthy() {
        let d = deployment(vec![
            condition("Available", "False"),
            condition("Progressing", "True"),
        ]);
        assert_eq!(deployment_health(&d).unwrap(), Health::Healthy);
    }

    #[test]
    fn test_replica_failure_false_is_healthy() {
        let d = deployment(vec![condition("ReplicaFailure", "False")]);
        assert_eq!(deployment_health(&d).unwrap(), Health::Healthy);
    }

    #[test]
    fn test_only_available_false_is_healthy() {
        let d = deployment(vec![condition("Available", "False")]);
        assert_eq!(deployment_health(&d).unwrap(), Health::Healthy);
    }

    #[test]
    fn test_later_condition_wins() {
        let d = deployment(vec![
            condition("Progressing", "False"),
            condition("Available", "False"),
            condition("Progressing", "True"),
        ]);
        assert_eq!(deployment_health(&d).unwrap(), Health::Healthy);

        let d = deployment(vec![
            condition("ReplicaFailure", "True"),
            condition("ReplicaFailure", "False"),
        ]);
        assert_eq!(deployment_health(&d).unwrap(), Health::Healthy);
    }

    #[test]
    fn test_no_recognized_conditions_is_unknown() {
        let d = deployment(vec![condition("SomethingElse", "False")]);
        assert_eq!(deployment_health(&d).unwrap(), Health::Unknown);

        let bare = Deployment::default();
        assert_eq!(deployment_health(&bare).unwrap(), Health::Unknown);
    }

    #[test]
    fn test_deleting_deployment_fails() {
        let mut d = deployment(vec![condition("Available", "True")]);
        d.metadata.deletion_timestamp = Some(Time(Utc::now()));

        let err = deployment_health(&d).unwrap_err();
        assert!(matches!(err, KubeError::BeingDeleted { kind: WorkloadKind::Deployment, .. }));
        assert_eq!(err.to_string(), "deployment shop/web is being deleted");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_daemonset_health() {
        assert_eq!(daemonset_health(&daemonset(false)).unwrap(), Health::Healthy);

        let err = daemonset_health(&daemonset(true)).unwrap_err();
        assert_eq!(err.to_string(), "daemonset infra/agent is being deleted");
    }

    #[test]
    fn test_workload_health_dispatch() {
        let live = Workload::from(daemonset(true));
        assert!(workload_health(&live).is_err());

        let live = Workload::from(deployment(vec![condition("Available", "True")]));
        assert_eq!(workload_health(&live).unwrap(), Health::Healthy);
    }
}
