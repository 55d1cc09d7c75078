//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Manifest error - unreadable or unsupported workload manifest
pub const MANIFEST_ERROR: i32 = 2;

/// Cluster error - API unreachable or request rejected
pub const CLUSTER_ERROR: i32 = 3;

/// Unhealthy - a workload was submitted but did not become healthy
pub const UNHEALTHY: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Blocked - precondition checks refused the update
pub const BLOCKED: i32 = 6;

/// Cancelled - interrupted by the user (128 + SIGINT)
pub const CANCELLED: i32 = 130;
