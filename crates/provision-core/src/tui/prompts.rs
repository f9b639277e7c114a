//! Charm-style CLI prompts using cliclack

use crate::requirement::UnparseablePolicy;
use crate::runtime::{Provisioned, Provisioner, System, ToolStatus};
use anyhow::Result;

/// Options for the interactive provisioning flow
#[derive(Debug, Clone, Default)]
pub struct PromptArgs {
    /// Auto-confirm the install prompt (non-interactive mode)
    pub yes: bool,
}

/// Check the tool and, with the user's consent, install it
pub async fn run<S: System>(provisioner: &Provisioner<S>, args: &PromptArgs) -> Result<Provisioned> {
    let requirement = provisioner.requirement();
    let name = requirement.name.as_str();
    cliclack::intro(format!("{} provisioning", name))?;

    let spinner = cliclack::spinner();
    spinner.start(format!("Checking {}...", name));
    let status = provisioner.check().await;

    match &status {
        ToolStatus::Satisfied { installed, path } => {
            spinner.stop(format!("{} installed ({}, {})", name, installed, path.display()));
            cliclack::outro(format!("{} meets requirement {}", name, requirement))?;
            return Ok(Provisioned::AlreadySatisfied {
                path: path.clone(),
                version: installed.clone(),
            });
        }
        ToolStatus::Missing => {
            spinner.stop(format!("Checked {}", name));
            cliclack::log::warning(format!("{} is not installed", name))?;
        }
        ToolStatus::Outdated { installed, .. } => {
            spinner.stop(format!("Checked {}", name));
            cliclack::log::warning(format!(
                "Installed {} version {} is older than required {}",
                name, installed, requirement.minimum_version
            ))?;
        }
        ToolStatus::Unknown { error, .. } => {
            spinner.stop(format!("Checked {}", name));
            cliclack::log::warning(format!("Failed to get {} version: {}", name, error))?;
        }
    }

    if matches!(status, ToolStatus::Unknown { .. })
        && provisioner.config().on_unparseable == UnparseablePolicy::Fail
    {
        cliclack::outro(format!("Fix or remove the existing {} and run again.", name))?;
        return Ok(provisioner.resolve(status).await?);
    }

    if args.yes {
        cliclack::log::info(format!("Installing {} (--yes mode)", name))?;
    } else {
        cliclack::log::info(format!("This will execute: {}", provisioner.install_command()))?;

        let confirm: bool = cliclack::confirm("Proceed with installation?")
            .initial_value(true)
            .interact()?;

        if !confirm {
            cliclack::outro(format!(
                "Install {} manually with: {}",
                name,
                provisioner.install_command()
            ))?;
            anyhow::bail!("Installation cancelled.");
        }
    }

    let spinner = cliclack::spinner();
    spinner.start(format!(
        "Installing {} {}...",
        name, requirement.minimum_version
    ));

    match provisioner.resolve(status).await {
        Ok(outcome) => {
            spinner.stop(format!(
                "{} {} installed successfully",
                name, requirement.minimum_version
            ));
            cliclack::outro("Done")?;
            Ok(outcome)
        }
        Err(e) => {
            spinner.stop("Installation failed");
            Err(e.into())
        }
    }
}
