//! Provision Core - detect and install a versioned command-line tool
//!
//! This library answers one question for a build or setup step: is the
//! required tool on `PATH` at a sufficient version? If not, it installs the
//! exact required version through a secondary installer (by default
//! `cargo install <tool> --version <version>`).
//!
//! # Architecture
//!
//! - **Requirement & config** - [`ToolRequirement`], [`ProvisionConfig`] (defaults, YAML, env)
//! - **System seam** - [`System`] abstracts PATH lookup and subprocesses; [`HostSystem`] is the real one
//! - **Provisioner** - [`Provisioner`] runs locate → version check → compare → install
//! - **Prompts** - optional cliclack flow (feature-gated)
//!
//! # Feature Flags
//!
//! - `tui` (default): Enables the cliclack-based prompts module
//!
//! # Example Usage (without TUI)
//!
//! ```ignore
//! use provision_core::{ProvisionConfig, Provisioner};
//!
//! let provisioner = Provisioner::new(ProvisionConfig::default());
//! let outcome = provisioner.ensure_installed().await?;
//! ```

pub mod config;
pub mod error;
pub mod requirement;
pub mod runtime;
pub mod version;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export main types for convenience
pub use config::ProvisionConfig;
pub use error::{ProvisionError, Result};
pub use requirement::{InstallerSpec, Timeouts, ToolRequirement, UnparseablePolicy};
pub use runtime::{CommandOutput, HostSystem, Provisioned, Provisioner, System, ToolStatus};
pub use version::{is_satisfied, parse_version};

#[cfg(feature = "tui")]
pub use tui::run;
