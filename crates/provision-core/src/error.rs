//! Error types for provisioning operations

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while checking for or installing a tool.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The tool is not on the executable search path.
    #[error("{tool} not found in PATH")]
    NotFound { tool: String },

    /// A subprocess could not be spawned, exited non-zero, or printed nothing.
    #[error("Command failed: {command}\n{message}")]
    Execution { command: String, message: String },

    /// Version output did not contain a valid semantic version.
    #[error("Failed to parse version from '{raw}': {message}")]
    Parse { raw: String, message: String },

    /// The secondary installer is not on the executable search path.
    #[error("{installer} is required to install {tool} but was not found in PATH")]
    MissingPrerequisite { installer: String, tool: String },

    /// The installer ran and exited non-zero.
    #[error("Failed to install {tool} {version}: `{command}` exited with code {code:?}\n{stderr}")]
    Install {
        tool: String,
        version: String,
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// A subprocess exceeded its time bound and was killed.
    #[error("Command timed out after {secs} seconds: {command}")]
    Timeout { command: String, secs: u64 },

    /// Configuration file missing or invalid.
    #[error("Invalid configuration{}: {message}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    Config {
        path: Option<PathBuf>,
        message: String,
    },
}

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;
