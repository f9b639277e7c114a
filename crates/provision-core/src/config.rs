//! Provisioning configuration: built-in defaults, YAML file, environment overrides

use crate::error::{ProvisionError, Result};
use crate::requirement::{
    InstallerSpec, Timeouts, ToolRequirement, UnparseablePolicy, DEFAULT_MIN_VERSION,
    DEFAULT_TOOL,
};
use semver::Version;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "provision.yaml";

/// Environment variable naming a config file
pub const CONFIG_PATH_ENV: &str = "WUCC_PROVISION_CONFIG";
/// Environment variable overriding the tool name
pub const TOOL_ENV: &str = "WUCC_PROVISION_TOOL";
/// Environment variable overriding the minimum version
pub const VERSION_ENV: &str = "WUCC_PROVISION_VERSION";
/// Environment variable overriding the installer program
pub const INSTALLER_ENV: &str = "WUCC_PROVISION_INSTALLER";

/// Everything the provisioner needs for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionConfig {
    pub requirement: ToolRequirement,
    pub installer: InstallerSpec,
    pub timeouts: Timeouts,
    pub on_unparseable: UnparseablePolicy,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            requirement: ToolRequirement::new(DEFAULT_TOOL, DEFAULT_MIN_VERSION),
            installer: InstallerSpec::default(),
            timeouts: Timeouts::default(),
            on_unparseable: UnparseablePolicy::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    tool: Option<String>,
    minimum_version: Option<Version>,
    installer: Option<InstallerSpec>,
    timeouts: Option<TimeoutsFile>,
    on_unparseable: Option<UnparseablePolicy>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimeoutsFile {
    version_check_secs: Option<u64>,
    install_secs: Option<u64>,
}

impl ProvisionConfig {
    /// Load configuration the way the CLI does.
    ///
    /// An explicit `path` (or `WUCC_PROVISION_CONFIG`) must exist. Without
    /// one, `provision.yaml` in the working directory is used if present,
    /// otherwise the built-in defaults. Environment overrides apply last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// [`ProvisionConfig::load`] with a custom environment lookup
    pub fn load_with_env<F>(path: Option<&Path>, env_fn: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| env_fn(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(&default)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(env_fn)?;
        Ok(config)
    }

    /// Read a YAML config file layered over the defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ProvisionError::Config {
            path: Some(path.to_path_buf()),
            message: format!("failed to read file: {}", e),
        })?;
        Self::from_yaml(&content).map_err(|e| match e {
            ProvisionError::Config { message, .. } => ProvisionError::Config {
                path: Some(path.to_path_buf()),
                message,
            },
            other => other,
        })
    }

    /// Parse YAML config text layered over the defaults
    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as an empty map
        let file: ConfigFile = if content.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| ProvisionError::Config {
                path: None,
                message: e.to_string(),
            })?
        };

        let mut config = Self::default();
        if let Some(tool) = file.tool {
            config.requirement.name = tool;
        }
        if let Some(version) = file.minimum_version {
            config.requirement.minimum_version = version;
        }
        if let Some(installer) = file.installer {
            config.installer = installer;
        }
        if let Some(timeouts) = file.timeouts {
            if let Some(secs) = timeouts.version_check_secs {
                config.timeouts.version_check = Duration::from_secs(secs);
            }
            if let Some(secs) = timeouts.install_secs {
                config.timeouts.install = Duration::from_secs(secs);
            }
        }
        if let Some(policy) = file.on_unparseable {
            config.on_unparseable = policy;
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply `WUCC_PROVISION_*` overrides
    pub fn apply_env<F>(&mut self, env_fn: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(tool) = env_fn(TOOL_ENV) {
            self.requirement.name = tool;
        }
        if let Some(version) = env_fn(VERSION_ENV) {
            self.requirement.minimum_version =
                parse_min_version(&version).map_err(|message| ProvisionError::Config {
                    path: None,
                    message: format!("{}: {}", VERSION_ENV, message),
                })?;
        }
        if let Some(program) = env_fn(INSTALLER_ENV) {
            self.installer.program = program;
        }
        self.validate()
    }

    /// Reject empty names and zero timeouts
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| {
            Err(ProvisionError::Config {
                path: None,
                message: message.to_string(),
            })
        };

        if self.requirement.name.trim().is_empty() {
            return invalid("tool name must not be empty");
        }
        if self.installer.program.trim().is_empty() {
            return invalid("installer program must not be empty");
        }
        if self.timeouts.version_check.is_zero() || self.timeouts.install.is_zero() {
            return invalid("timeouts must be greater than zero");
        }
        Ok(())
    }
}

/// Parse a minimum version given on the command line or in the environment
pub fn parse_min_version(s: &str) -> std::result::Result<Version, String> {
    let trimmed = s.trim();
    let cleaned = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(cleaned).map_err(|e| format!("invalid version '{}': {}", s, e))
}
