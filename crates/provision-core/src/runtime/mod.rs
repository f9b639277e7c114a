//! Runtime access and tool provisioning
//!
//! This module provides:
//! - The `System` seam over PATH lookup and subprocess execution
//! - The `Provisioner` that checks a tool's version and installs it

pub mod provisioner;
pub mod system;

#[cfg(test)]
pub(crate) mod fake;

pub use provisioner::{Provisioned, Provisioner, ToolStatus};
pub use system::{CommandOutput, HostSystem, System};
