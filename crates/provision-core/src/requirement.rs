//! What to provision and how to install it

use semver::Version;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Default tool provisioned when no configuration is given
pub const DEFAULT_TOOL: &str = "wucc";

/// Default minimum version of [`DEFAULT_TOOL`]
pub const DEFAULT_MIN_VERSION: Version = Version::new(0, 2, 0);

/// Timeout for `<tool> --version` (30 seconds)
pub const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the install step (10 minutes; `cargo install` builds from source)
pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(600);

/// A named tool and the lowest version that is acceptable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequirement {
    /// Name of the tool binary (e.g., "wucc")
    pub name: String,
    /// Lowest acceptable version; also the exact version installed
    pub minimum_version: Version,
}

impl ToolRequirement {
    pub fn new(name: impl Into<String>, minimum_version: Version) -> Self {
        Self {
            name: name.into(),
            minimum_version,
        }
    }
}

impl fmt::Display for ToolRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} >= {}", self.name, self.minimum_version)
    }
}

/// Secondary installer invocation
///
/// Arguments may contain `{name}` and `{version}` placeholders which are
/// replaced with the requirement's tool name and minimum version.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallerSpec {
    /// Installer binary looked up on PATH (e.g., "cargo")
    pub program: String,
    /// Argument templates
    pub args: Vec<String>,
}

impl InstallerSpec {
    /// `cargo install {name} --version {version}`
    pub fn cargo() -> Self {
        Self {
            program: "cargo".to_string(),
            args: ["install", "{name}", "--version", "{version}"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Arguments with placeholders filled in for `requirement`
    pub fn render_args(&self, requirement: &ToolRequirement) -> Vec<String> {
        let version = requirement.minimum_version.to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{name}", &requirement.name)
                    .replace("{version}", &version)
            })
            .collect()
    }

    /// Full command line, for display and error messages
    pub fn command_line(&self, requirement: &ToolRequirement) -> String {
        std::iter::once(self.program.clone())
            .chain(self.render_args(requirement))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for InstallerSpec {
    fn default() -> Self {
        Self::cargo()
    }
}

/// Bounds on each subprocess call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub version_check: Duration,
    pub install: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            version_check: VERSION_CHECK_TIMEOUT,
            install: INSTALL_TIMEOUT,
        }
    }
}

/// What to do when the installed tool's version cannot be determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnparseablePolicy {
    /// Treat the tool as not installed and reinstall it
    #[default]
    Reinstall,
    /// Surface the version-check error to the caller
    Fail,
}
