//! Builder mode

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Whether a builder verifies workloads after submitting them
///
/// Fixed when a builder is constructed and never changed mid-rollout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuilderMode {
    /// Normal operation: submitted workloads are health-checked
    #[default]
    Applying,

    /// Bootstrap: only submission happens, health is never evaluated
    Initializing,
}

impl BuilderMode {
    /// Whether health verification runs in this mode
    pub fn verifies_health(&self) -> bool {
        matches!(self, Self::Applying)
    }
}

impl fmt::Display for BuilderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applying => write!(f, "applying"),
            Self::Initializing => write!(f, "initializing"),
        }
    }
}

impl FromStr for BuilderMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "applying" => Ok(Self::Applying),
            "initializing" => Ok(Self::Initializing),
            _ => Err(CoreError::InvalidMode(s.to_string())),
        }
    }
}
