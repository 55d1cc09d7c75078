//! Cadence Core - shared types for applying and gating cluster payloads
//!
//! This crate is free of any cluster I/O and provides:
//! - `UpdateError`: the structured failure reported by health and precondition evaluation
//! - `BuilderMode`: whether applied workloads are verified after submission
//! - `precondition::summarize`: reduction of precondition failures to a block decision
//! - `version`: release version comparisons used by upgrade gating

pub mod error;
pub mod mode;
pub mod precondition;
pub mod version;

pub use error::{BoxError, CoreError, Result, UpdateError};
pub use mode::BuilderMode;
pub use precondition::summarize;
pub use version::is_patch_update;
