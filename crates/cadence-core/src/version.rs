//! Release version comparisons

use semver::Version;

use crate::error::Result;

/// Whether moving from `current` to `target` stays within one minor release
///
/// A leading `v` is accepted on either side.
pub fn is_patch_update(current: &str, target: &str) -> Result<bool> {
    let current = parse(current)?;
    let target = parse(target)?;
    Ok(current.major == target.major && current.minor == target.minor)
}

fn parse(version: &str) -> Result<Version> {
    let trimmed = version.trim();
    Ok(Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed))?)
}
