//! Error types for cadence-kube

use cadence_core::{BoxError, UpdateError};
use thiserror::Error;

use crate::workload::WorkloadKind;

/// Result type for cadence-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while applying and verifying workloads
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Workload not found in the cluster
    #[error("{kind} '{name}' not found in namespace '{namespace}'")]
    NotFound {
        kind: WorkloadKind,
        namespace: String,
        name: String,
    },

    /// Workload deletion has started; the apply attempt cannot succeed
    #[error("{} {name} is being deleted", .kind.as_str().to_lowercase())]
    BeingDeleted { kind: WorkloadKind, name: String },

    /// Workload is not healthy yet
    #[error(transparent)]
    Unhealthy(#[from] UpdateError),

    /// Operation was cancelled by the caller
    #[error("operation cancelled while {0}")]
    Cancelled(String),

    /// No builder registered for this kind
    #[error("no builder registered for kind '{0}'")]
    UnsupportedKind(String),

    /// Invalid manifest
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// Invalid cluster configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Error raised by a collaborator outside this crate
    #[error(transparent)]
    Other(BoxError),
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for KubeError {
    fn from(e: serde_yaml::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl KubeError {
    /// Check if this is a not-found outcome (typed or Kubernetes 404)
    pub fn is_not_found(&self) -> bool {
        match self {
            KubeError::NotFound { .. } => true,
            KubeError::Api(kube::Error::Api(resp)) => resp.code == 404,
            _ => false,
        }
    }

    /// Check if the operation was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, KubeError::Cancelled(_))
    }

    /// Whether re-invoking after a backoff may succeed
    ///
    /// Health failures and API errors other than not-found are retryable.
    /// Deletion, cancellation and malformed input are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            KubeError::Unhealthy(_) | KubeError::Other(_) => true,
            KubeError::Api(_) => !self.is_not_found(),
            _ => false,
        }
    }

    /// The structured error, if this failure carries one
    pub fn update_error(&self) -> Option<&UpdateError> {
        match self {
            KubeError::Unhealthy(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: u16) -> KubeError {
        KubeError::Api(kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "boom".to_string(),
            reason: "Test".to_string(),
            code,
        }))
    }

    #[test]
    fn test_is_not_found() {
        assert!(api_error(404).is_not_found());
        assert!(!api_error(500).is_not_found());
        assert!(
            KubeError::NotFound {
                kind: WorkloadKind::Deployment,
                namespace: "ns".to_string(),
                name: "app".to_string(),
            }
            .is_not_found()
        );
    }

    #[test]
    fn test_retryable_taxonomy() {
        let unhealthy =
            KubeError::Unhealthy(UpdateError::new("WorkloadNotAvailable", "ns/app", "x"));
        assert!(unhealthy.is_retryable());
        assert!(api_error(500).is_retryable());
        assert!(!api_error(404).is_retryable());
        assert!(
            !KubeError::BeingDeleted {
                kind: WorkloadKind::Deployment,
                name: "ns/app".to_string(),
            }
            .is_retryable()
        );
        assert!(!KubeError::Cancelled("submitting".to_string()).is_retryable());
    }

    #[test]
    fn test_being_deleted_display() {
        let err = KubeError::BeingDeleted {
            kind: WorkloadKind::DaemonSet,
            name: "ns/agent".to_string(),
        };
        assert_eq!(err.to_string(), "daemonset ns/agent is being deleted");
    }

    #[test]
    fn test_unhealthy_is_transparent() {
        let err: KubeError =
            UpdateError::new("WorkloadNotProgressing", "ns/app", "replica failure").into();
        assert_eq!(err.to_string(), "replica failure");
        assert_eq!(err.update_error().unwrap().reason, "WorkloadNotProgressing");
        assert!(!err.is_cancelled());
    }
}
