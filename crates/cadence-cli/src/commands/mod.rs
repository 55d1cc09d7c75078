//! CLI commands

pub mod apply;
pub mod preconditions;
