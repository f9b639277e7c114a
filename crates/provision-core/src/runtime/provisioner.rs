//! Check a tool's installed version and install it when missing or outdated
//!
//! The flow is linear: locate the tool on PATH, ask it for `--version`,
//! compare against the requirement, and run the secondary installer if the
//! check did not pass.

use super::system::{display_command, HostSystem, System};
use crate::config::ProvisionConfig;
use crate::error::{ProvisionError, Result};
use crate::requirement::{ToolRequirement, UnparseablePolicy};
use crate::version;
use semver::Version;
use std::path::{Path, PathBuf};

/// Result of inspecting the host without installing anything
#[derive(Debug)]
pub enum ToolStatus {
    /// Not on PATH
    Missing,
    /// On PATH but older than required
    Outdated { path: PathBuf, installed: Version },
    /// On PATH at a sufficient version
    Satisfied { path: PathBuf, installed: Version },
    /// On PATH but the version check failed or its output was unparseable
    Unknown { path: PathBuf, error: ProvisionError },
}

impl ToolStatus {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, ToolStatus::Satisfied { .. })
    }

    /// Installed version, if one could be determined
    pub fn installed_version(&self) -> Option<&Version> {
        match self {
            ToolStatus::Outdated { installed, .. } | ToolStatus::Satisfied { installed, .. } => {
                Some(installed)
            }
            ToolStatus::Missing | ToolStatus::Unknown { .. } => None,
        }
    }
}

/// Outcome of [`Provisioner::ensure_installed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provisioned {
    /// Nothing to do
    AlreadySatisfied { path: PathBuf, version: Version },
    /// The installer ran; `previous` is the version it replaced, if known
    Installed { previous: Option<Version> },
}

/// Checks for and installs a single tool
pub struct Provisioner<S: System = HostSystem> {
    config: ProvisionConfig,
    system: S,
}

impl Provisioner<HostSystem> {
    /// Create a provisioner that works against the real `PATH`
    pub fn new(config: ProvisionConfig) -> Self {
        Self::with_system(config, HostSystem::new())
    }
}

impl<S: System> Provisioner<S> {
    pub fn with_system(config: ProvisionConfig, system: S) -> Self {
        Self { config, system }
    }

    pub fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    pub fn requirement(&self) -> &ToolRequirement {
        &self.config.requirement
    }

    pub fn system(&self) -> &S {
        &self.system
    }

    /// Get the install command string for the configured requirement
    pub fn install_command(&self) -> String {
        self.config.installer.command_line(&self.config.requirement)
    }

    /// Find `tool_name` on the search path
    pub fn locate(&self, tool_name: &str) -> Result<PathBuf> {
        self.system
            .locate(tool_name)
            .ok_or_else(|| ProvisionError::NotFound {
                tool: tool_name.to_string(),
            })
    }

    /// Run `<tool> --version` and return its trimmed stdout
    pub async fn query_version(&self, tool_path: &Path) -> Result<String> {
        let args = ["--version".to_string()];
        let output = self
            .system
            .run(tool_path, &args, self.config.timeouts.version_check)
            .await?;

        let command = display_command(tool_path, &args);
        if !output.success {
            return Err(ProvisionError::Execution {
                command,
                message: format!(
                    "exited with code {:?}\n{}",
                    output.code,
                    output.stderr.trim()
                ),
            });
        }

        let stdout = output.stdout.trim();
        if stdout.is_empty() {
            return Err(ProvisionError::Execution {
                command,
                message: "produced no output".to_string(),
            });
        }

        Ok(stdout.to_string())
    }

    /// See [`version::parse_version`]
    pub fn parse_version(raw_output: &str) -> Result<Version> {
        version::parse_version(raw_output)
    }

    /// See [`version::is_satisfied`]
    pub fn is_satisfied(installed: &Version, required: &Version) -> bool {
        version::is_satisfied(installed, required)
    }

    /// Inspect the host without installing anything
    pub async fn check(&self) -> ToolStatus {
        let requirement = &self.config.requirement;

        let path = match self.locate(&requirement.name) {
            Ok(path) => path,
            Err(e) => {
                tracing::info!("{}", e);
                return ToolStatus::Missing;
            }
        };

        let installed = match self.query_version(&path).await {
            Ok(raw) => Self::parse_version(&raw),
            Err(e) => Err(e),
        };

        let installed = match installed {
            Ok(installed) => installed,
            Err(error) => {
                tracing::warn!("Failed to get {} version: {}", requirement.name, error);
                return ToolStatus::Unknown { path, error };
            }
        };

        tracing::info!("Found {} version: {}", requirement.name, installed);

        if Self::is_satisfied(&installed, &requirement.minimum_version) {
            tracing::info!(
                "{} version {} meets requirement {}",
                requirement.name,
                installed,
                requirement.minimum_version
            );
            ToolStatus::Satisfied { path, installed }
        } else {
            tracing::warn!(
                "Installed {} version {} is older than required {}",
                requirement.name,
                installed,
                requirement.minimum_version
            );
            ToolStatus::Outdated { path, installed }
        }
    }

    /// Install `tool_name` at exactly `version` with the configured installer
    pub async fn install(&self, tool_name: &str, version: &Version) -> Result<()> {
        let installer = &self.config.installer;
        let target = ToolRequirement::new(tool_name, version.clone());

        let installer_path = match self.system.locate(&installer.program) {
            Some(path) => path,
            None => {
                let err = ProvisionError::MissingPrerequisite {
                    installer: installer.program.clone(),
                    tool: tool_name.to_string(),
                };
                tracing::error!("{}", err);
                return Err(err);
            }
        };

        let command = installer.command_line(&target);
        tracing::info!("Installing {} {} via {}...", tool_name, version, installer.program);

        let output = self
            .system
            .run(
                &installer_path,
                &installer.render_args(&target),
                self.config.timeouts.install,
            )
            .await
            .inspect_err(|e| tracing::error!("{}", e))?;

        if !output.success {
            let diagnostic = if output.stderr.trim().is_empty() {
                output.stdout.trim()
            } else {
                output.stderr.trim()
            };
            let err = ProvisionError::Install {
                tool: tool_name.to_string(),
                version: version.to_string(),
                command,
                code: output.code,
                stderr: diagnostic.to_string(),
            };
            tracing::error!("{}", err);
            return Err(err);
        }

        tracing::info!("Successfully installed {} {}", tool_name, version);

        if self.system.locate(tool_name).is_none() {
            tracing::warn!(
                "{} was installed but is still not on PATH; check the installer's bin directory",
                tool_name
            );
        }

        Ok(())
    }

    /// Make sure the requirement holds, installing the tool if it does not.
    ///
    /// Every error returned here has already been logged at error level.
    pub async fn ensure_installed(&self) -> Result<Provisioned> {
        let status = self.check().await;
        self.resolve(status).await
    }

    /// Act on a status obtained from [`Provisioner::check`]
    pub async fn resolve(&self, status: ToolStatus) -> Result<Provisioned> {
        let requirement = &self.config.requirement;

        let previous = match status {
            ToolStatus::Satisfied { path, installed } => {
                return Ok(Provisioned::AlreadySatisfied {
                    path,
                    version: installed,
                })
            }
            ToolStatus::Missing => None,
            ToolStatus::Outdated { installed, .. } => Some(installed),
            ToolStatus::Unknown { error, .. } => match self.config.on_unparseable {
                UnparseablePolicy::Reinstall => {
                    tracing::warn!("Reinstalling {} after failed version check", requirement.name);
                    None
                }
                UnparseablePolicy::Fail => {
                    tracing::error!("{}", error);
                    return Err(error);
                }
            },
        };

        self.install(&requirement.name, &requirement.minimum_version)
            .await?;
        Ok(Provisioned::Installed { previous })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::fake::FakeSystem;
    use crate::runtime::system::CommandOutput;

    fn provisioner(system: FakeSystem) -> Provisioner<FakeSystem> {
        Provisioner::with_system(ProvisionConfig::default(), system)
    }

    fn install_args() -> Vec<String> {
        ["install", "wucc", "--version", "0.2.0"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_locate_not_found() {
        let p = provisioner(FakeSystem::new());
        assert!(matches!(
            p.locate("wucc"),
            Err(ProvisionError::NotFound { tool }) if tool == "wucc"
        ));
    }

    #[test]
    fn test_locate_found() {
        let p = provisioner(FakeSystem::new().with_program("wucc"));
        assert_eq!(p.locate("wucc").unwrap(), PathBuf::from("/fake/bin/wucc"));
    }

    #[test]
    fn test_install_command() {
        let p = provisioner(FakeSystem::new());
        assert_eq!(p.install_command(), "cargo install wucc --version 0.2.0");
    }

    #[tokio::test]
    async fn test_query_version_returns_trimmed_stdout() {
        let p = provisioner(
            FakeSystem::new()
                .with_program("wucc")
                .respond_ok("wucc", "wucc 0.2.0\n"),
        );
        let raw = p.query_version(Path::new("/fake/bin/wucc")).await.unwrap();
        assert_eq!(raw, "wucc 0.2.0");

        let calls = p.system().invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args, vec!["--version"]);
    }

    #[tokio::test]
    async fn test_query_version_non_zero_exit() {
        let p = provisioner(
            FakeSystem::new()
                .with_program("wucc")
                .respond_exit("wucc", 2, "unknown flag"),
        );
        let err = p.query_version(Path::new("/fake/bin/wucc")).await.unwrap_err();
        match err {
            ProvisionError::Execution { command, message } => {
                assert_eq!(command, "/fake/bin/wucc --version");
                assert!(message.contains("unknown flag"));
            }
            other => panic!("expected execution error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_query_version_empty_output() {
        let p = provisioner(FakeSystem::new().with_program("wucc").respond_ok("wucc", "  \n"));
        let err = p.query_version(Path::new("/fake/bin/wucc")).await.unwrap_err();
        assert!(matches!(err, ProvisionError::Execution { message, .. } if message.contains("no output")));
    }

    #[tokio::test]
    async fn test_install_without_installer_runs_nothing() {
        let p = provisioner(FakeSystem::new());
        let err = p.install("wucc", &Version::new(0, 2, 0)).await.unwrap_err();

        assert!(matches!(
            err,
            ProvisionError::MissingPrerequisite { ref installer, ref tool }
                if installer == "cargo" && tool == "wucc"
        ));
        assert!(p.system().invocations().is_empty());
    }

    #[tokio::test]
    async fn test_install_failure_propagates_stderr() {
        let p = provisioner(
            FakeSystem::new()
                .with_program("cargo")
                .respond_exit("cargo", 101, "error: could not compile `wucc`\n"),
        );
        let err = p.install("wucc", &Version::new(0, 2, 0)).await.unwrap_err();
        match err {
            ProvisionError::Install {
                command,
                code,
                stderr,
                ..
            } => {
                assert_eq!(command, "cargo install wucc --version 0.2.0");
                assert_eq!(code, Some(101));
                assert_eq!(stderr, "error: could not compile `wucc`");
            }
            other => panic!("expected install error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_install_timeout_propagates() {
        let p = provisioner(FakeSystem::new().with_program("cargo").respond(
            "cargo",
            Err(ProvisionError::Timeout {
                command: "cargo install wucc --version 0.2.0".into(),
                secs: 600,
            }),
        ));
        let err = p.install("wucc", &Version::new(0, 2, 0)).await.unwrap_err();
        assert!(matches!(err, ProvisionError::Timeout { secs: 600, .. }));
    }

    #[tokio::test]
    async fn test_check_missing() {
        let p = provisioner(FakeSystem::new());
        assert!(matches!(p.check().await, ToolStatus::Missing));
    }

    #[tokio::test]
    async fn test_check_satisfied_with_newer_version() {
        let p = provisioner(
            FakeSystem::new()
                .with_program("wucc")
                .respond_ok("wucc", "wucc 0.3.1 (abc123 2025-01-01)"),
        );
        let status = p.check().await;
        assert!(status.is_satisfied());
        assert_eq!(status.installed_version(), Some(&Version::new(0, 3, 1)));
    }

    #[tokio::test]
    async fn test_check_unparseable_is_unknown() {
        let p = provisioner(FakeSystem::new().with_program("wucc").respond_ok("wucc", "garbage"));
        match p.check().await {
            ToolStatus::Unknown { error, .. } => {
                assert!(matches!(error, ProvisionError::Parse { .. }))
            }
            other => panic!("expected unknown status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ensure_already_satisfied_does_not_install() {
        let p = provisioner(
            FakeSystem::new()
                .with_program("wucc")
                .with_program("cargo")
                .respond_ok("wucc", "wucc 0.2.0"),
        );
        let outcome = p.ensure_installed().await.unwrap();
        assert_eq!(
            outcome,
            Provisioned::AlreadySatisfied {
                path: PathBuf::from("/fake/bin/wucc"),
                version: Version::new(0, 2, 0),
            }
        );
        assert_eq!(p.system().runs_of("cargo"), 0);
    }

    #[tokio::test]
    async fn test_ensure_missing_tool_installs_once() {
        let p = provisioner(
            FakeSystem::new()
                .with_program("cargo")
                .respond_ok("cargo", "Installed package `wucc v0.2.0`"),
        );
        let outcome = p.ensure_installed().await.unwrap();
        assert_eq!(outcome, Provisioned::Installed { previous: None });

        let calls = p.system().invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, PathBuf::from("/fake/bin/cargo"));
        assert_eq!(calls[0].args, install_args());
    }

    #[tokio::test]
    async fn test_ensure_outdated_tool_reinstalls() {
        let p = provisioner(
            FakeSystem::new()
                .with_program("wucc")
                .with_program("cargo")
                .respond_ok("wucc", "wucc 0.1.0")
                .respond_ok("cargo", ""),
        );
        let outcome = p.ensure_installed().await.unwrap();
        assert_eq!(
            outcome,
            Provisioned::Installed {
                previous: Some(Version::new(0, 1, 0))
            }
        );
        assert_eq!(p.system().runs_of("cargo"), 1);
    }

    #[tokio::test]
    async fn test_ensure_missing_tool_and_installer() {
        let p = provisioner(FakeSystem::new());
        let err = p.ensure_installed().await.unwrap_err();
        assert!(matches!(err, ProvisionError::MissingPrerequisite { .. }));
        assert!(p.system().invocations().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_install_failure_is_surfaced() {
        let p = provisioner(
            FakeSystem::new()
                .with_program("cargo")
                .respond_exit("cargo", 101, "network unreachable"),
        );
        let err = p.ensure_installed().await.unwrap_err();
        assert!(err.to_string().contains("network unreachable"));
    }

    #[tokio::test]
    async fn test_ensure_unparseable_reinstalls_by_default() {
        let p = provisioner(
            FakeSystem::new()
                .with_program("wucc")
                .with_program("cargo")
                .respond_ok("wucc", "wucc dev-build")
                .respond_ok("cargo", ""),
        );
        let outcome = p.ensure_installed().await.unwrap();
        assert_eq!(outcome, Provisioned::Installed { previous: None });
        assert_eq!(p.system().runs_of("cargo"), 1);
    }

    #[tokio::test]
    async fn test_ensure_failed_version_check_reinstalls_by_default() {
        let p = provisioner(
            FakeSystem::new()
                .with_program("wucc")
                .with_program("cargo")
                .respond_exit("wucc", 1, "segfault")
                .respond_ok("cargo", ""),
        );
        let outcome = p.ensure_installed().await.unwrap();
        assert_eq!(outcome, Provisioned::Installed { previous: None });
    }

    #[tokio::test]
    async fn test_ensure_unparseable_fails_under_strict_policy() {
        let config = ProvisionConfig {
            on_unparseable: UnparseablePolicy::Fail,
            ..ProvisionConfig::default()
        };
        let p = Provisioner::with_system(
            config,
            FakeSystem::new()
                .with_program("wucc")
                .with_program("cargo")
                .respond_ok("wucc", "garbage"),
        );
        let err = p.ensure_installed().await.unwrap_err();
        assert!(matches!(err, ProvisionError::Parse { .. }));
        assert_eq!(p.system().runs_of("cargo"), 0);
    }

    #[tokio::test]
    async fn test_custom_installer_is_used() {
        let mut config = ProvisionConfig::default();
        config.installer.program = "cargo-binstall".to_string();
        config.installer.args = vec!["-y".into(), "{name}@{version}".into()];

        let p = Provisioner::with_system(
            config,
            FakeSystem::new().with_program("cargo-binstall").respond(
                "cargo-binstall",
                Ok(CommandOutput {
                    success: true,
                    code: Some(0),
                    ..CommandOutput::default()
                }),
            ),
        );
        p.ensure_installed().await.unwrap();

        let calls = p.system().invocations();
        assert_eq!(calls[0].args, vec!["-y", "wucc@0.2.0"]);
    }
}
