//! Version extraction and comparison for `--version` output

use crate::error::{ProvisionError, Result};
use semver::Version;

/// Extract the version from `<name> <version> ...` output.
///
/// The second whitespace-delimited token is taken as the version; a leading
/// `v` is stripped before parsing.
pub fn parse_version(raw_output: &str) -> Result<Version> {
    let token = raw_output
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| ProvisionError::Parse {
            raw: raw_output.trim().to_string(),
            message: "expected output of the form '<name> <version>'".to_string(),
        })?;

    let cleaned = token.strip_prefix('v').unwrap_or(token);
    Version::parse(cleaned).map_err(|e| ProvisionError::Parse {
        raw: raw_output.trim().to_string(),
        message: format!("invalid version '{}': {}", token, e),
    })
}

/// Whether an installed version meets the minimum requirement.
pub fn is_satisfied(installed: &Version, required: &Version) -> bool {
    installed >= required
}
