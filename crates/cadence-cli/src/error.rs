//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use cadence_kube::KubeError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Manifest could not be decoded or has no builder
    #[error("Manifest error: {message}")]
    #[diagnostic(code(cadence::cli::manifest))]
    Manifest {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Cluster API failure
    #[error("Cluster error: {message}")]
    #[diagnostic(code(cadence::cli::cluster))]
    Cluster {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Workload health verification failed
    #[error("{message}")]
    #[diagnostic(code(cadence::cli::unhealthy))]
    Unhealthy {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Precondition checks blocked the update
    #[error("{message}")]
    #[diagnostic(
        code(cadence::cli::blocked),
        help("re-run with --force to proceed despite the failures")
    )]
    Blocked { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(cadence::cli::io))]
    Io { message: String },

    /// Interrupted before completion
    #[error("Cancelled: {message}")]
    #[diagnostic(code(cadence::cli::cancelled))]
    Cancelled { message: String },

    /// Invalid user input
    #[error("Invalid input: {message}")]
    #[diagnostic(code(cadence::cli::input))]
    Input { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Manifest { .. } => exit_codes::MANIFEST_ERROR,
            CliError::Cluster { .. } => exit_codes::CLUSTER_ERROR,
            CliError::Unhealthy { .. } => exit_codes::UNHEALTHY,
            CliError::Blocked { .. } => exit_codes::BLOCKED,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Cancelled { .. } => exit_codes::CANCELLED,
            CliError::Input { .. } => exit_codes::ERROR,
        }
    }

    /// Create a manifest error
    pub fn manifest(message: impl Into<String>) -> Self {
        Self::Manifest {
            message: message.into(),
            help: None,
        }
    }

    /// Create an input error (user provided invalid input)
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        let message = err.to_string();
        match err {
            KubeError::Unhealthy(update) => CliError::Unhealthy {
                message,
                help: Some(format!("reason: {}", update.reason)),
            },
            KubeError::BeingDeleted { .. } => CliError::Unhealthy {
                message,
                help: Some("wait for the deletion to finish, then apply again".to_string()),
            },
            KubeError::Cancelled(_) => CliError::Cancelled { message },
            KubeError::InvalidManifest(_) | KubeError::Serialization(_) => {
                CliError::manifest(message)
            }
            KubeError::UnsupportedKind(_) => CliError::Manifest {
                message,
                help: Some("supported kinds are Deployment and DaemonSet".to_string()),
            },
            KubeError::Api(kube::Error::InferConfig(_)) => CliError::Cluster {
                message,
                help: Some("check KUBECONFIG or the in-cluster service account".to_string()),
            },
            _ => CliError::Cluster { message, help: None },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::UpdateError;
    use cadence_kube::WorkloadKind;

    #[test]
    fn test_unhealthy_maps_to_exit_code() {
        let err: CliError = KubeError::Unhealthy(UpdateError::new(
            "WorkloadNotAvailable",
            "ns/web",
            "deployment ns/web is not available",
        ))
        .into();

        assert_eq!(err.exit_code(), exit_codes::UNHEALTHY);
        assert_eq!(err.to_string(), "deployment ns/web is not available");
    }

    #[test]
    fn test_kube_error_mapping() {
        let cases = [
            (KubeError::Cancelled("submitting".into()), exit_codes::CANCELLED),
            (KubeError::InvalidManifest("no kind".into()), exit_codes::MANIFEST_ERROR),
            (KubeError::UnsupportedKind("StatefulSet".into()), exit_codes::MANIFEST_ERROR),
            (
                KubeError::BeingDeleted {
                    kind: WorkloadKind::DaemonSet,
                    name: "ns/agent".into(),
                },
                exit_codes::UNHEALTHY,
            ),
            (KubeError::Other("boom".into()), exit_codes::CLUSTER_ERROR),
        ];

        for (err, code) in cases {
            let cli: CliError = err.into();
            assert_eq!(cli.exit_code(), code, "{cli}");
        }
    }

    #[test]
    fn test_io_error() {
        let err: CliError = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert_eq!(err.exit_code(), exit_codes::IO_ERROR);
    }
}
