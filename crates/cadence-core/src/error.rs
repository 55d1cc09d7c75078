//! Core error types

use thiserror::Error;

/// Boxed error used wherever a failure of unknown origin is carried along
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    #[error("Invalid builder mode '{0}': expected 'applying' or 'initializing'")]
    InvalidMode(String),

    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] semver::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Structured failure produced while applying, verifying or gating a payload
///
/// `Display` renders only the operator-facing `message`. The lower-level
/// cause, when present, is reachable through [`std::error::Error::source`].
#[derive(Error, Debug)]
#[error("{message}")]
pub struct UpdateError {
    /// Short machine-readable category, e.g. `WorkloadNotAvailable`
    pub reason: String,

    /// Human-readable detail, safe to surface to operators
    pub message: String,

    /// Subject that failed, e.g. `namespace/name` or a check name
    pub name: String,

    /// Wrapped lower-level cause, for diagnostics only
    #[source]
    pub nested: Option<BoxError>,
}

impl UpdateError {
    /// Create an error without a nested cause
    pub fn new(
        reason: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            reason: reason.into(),
            message: message.into(),
            name: name.into(),
            nested: None,
        }
    }

    /// Attach a lower-level cause
    pub fn with_nested(mut self, nested: impl Into<BoxError>) -> Self {
        self.nested = Some(nested.into());
        self
    }

    /// Whether both `name` and `reason` are populated
    pub fn is_identified(&self) -> bool {
        !self.name.is_empty() && !self.reason.is_empty()
    }

    /// Render as a failed precondition line
    pub fn precondition_message(&self) -> String {
        format!(
            "Precondition {:?} failed because of {:?}: {}",
            self.name, self.reason, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_display_is_message() {
        let err = UpdateError::new("WorkloadNotAvailable", "ns/app", "app is not available");
        assert_eq!(err.to_string(), "app is not available");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_nested_is_source() {
        let err = UpdateError::new("WorkloadNotProgressing", "ns/app", "replica failure")
            .with_nested("unavailable replicas=2");

        let source = err.source().expect("nested cause should be the source");
        assert_eq!(source.to_string(), "unavailable replicas=2");
    }

    #[test]
    fn test_precondition_message() {
        let err = UpdateError::new("Y", "X", "Z");
        assert_eq!(
            err.precondition_message(),
            r#"Precondition "X" failed because of "Y": Z"#
        );
    }

    #[test]
    fn test_is_identified() {
        assert!(UpdateError::new("Reason", "Name", "msg").is_identified());
        assert!(!UpdateError::new("", "Name", "msg").is_identified());
        assert!(!UpdateError::new("Reason", "", "msg").is_identified());
    }

    #[test]
    fn test_invalid_version_from_semver() {
        let err: CoreError = semver::Version::parse("not-a-version").unwrap_err().into();
        assert!(err.to_string().starts_with("Invalid version:"));
    }
}
