//! wucc-provision - make sure the wucc code generator is installed

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use provision_core::config::parse_min_version;
use provision_core::tui::PromptArgs;
use provision_core::{Provisioned, ProvisionConfig, Provisioner, System, ToolStatus};
use semver::Version;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "wucc-provision")]
#[command(about = "Ensure wucc is installed at the required version")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to a provision.yaml config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Tool to provision (overrides config)
    #[arg(long, global = true)]
    pub tool: Option<String>,

    /// Minimum acceptable version, also the version installed (overrides config)
    #[arg(long = "min-version", global = true, value_parser = parse_min_version)]
    pub min_version: Option<Version>,

    /// Installer program (overrides config)
    #[arg(long, global = true)]
    pub installer: Option<String>,

    /// Enable debug logging, including installer output
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install the tool if it is missing or too old (default)
    Ensure(EnsureArgs),
    /// Report whether the tool meets the requirement; exit 1 if not
    Check,
}

#[derive(Parser, Debug, Default)]
pub struct EnsureArgs {
    /// Install without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// `--debug` wins, then `RUST_LOG`. Otherwise interactive runs stay quiet
/// (the prompts already report progress) and plain runs log at info.
fn init_tracing(debug: bool, interactive: bool) {
    let filter = if debug {
        EnvFilter::new("provision_core=debug,provision=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(if interactive { "off" } else { "provision_core=info" })
        })
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(args: &Args) -> Result<ProvisionConfig> {
    let config = ProvisionConfig::load(args.config.as_deref())?;
    apply_overrides(config, args)
}

/// Apply command-line flags on top of the loaded config and re-validate
fn apply_overrides(mut config: ProvisionConfig, args: &Args) -> Result<ProvisionConfig> {
    if let Some(tool) = &args.tool {
        config.requirement.name = tool.clone();
    }
    if let Some(version) = &args.min_version {
        config.requirement.minimum_version = version.clone();
    }
    if let Some(installer) = &args.installer {
        config.installer.program = installer.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Returns whether the requirement holds afterwards.
///
/// Provisioning failures in plain mode are already logged by the library, so
/// they become a failing status rather than an error printed a second time.
async fn ensure<S: System>(
    provisioner: &Provisioner<S>,
    ensure_args: EnsureArgs,
    interactive: bool,
) -> Result<bool> {
    if interactive {
        let prompt_args = PromptArgs {
            yes: ensure_args.yes,
        };
        let result = provision_core::run(provisioner, &prompt_args).await;

        // Ensure cursor is visible on normal exit
        let _ = console::Term::stderr().show_cursor();

        return result.map(|_| true);
    }

    let requirement = provisioner.requirement();
    let outcome = match provisioner.ensure_installed().await {
        Ok(outcome) => outcome,
        Err(_) => return Ok(false),
    };
    match outcome {
        Provisioned::AlreadySatisfied { version, .. } => {
            println!(
                "{} {} {} meets requirement {}",
                "✓".green(),
                requirement.name,
                version,
                requirement.minimum_version
            );
        }
        Provisioned::Installed { previous } => {
            let from = previous
                .map(|v| format!(" (was {})", v))
                .unwrap_or_default();
            println!(
                "{} Installed {} {}{}",
                "✓".green(),
                requirement.name,
                requirement.minimum_version,
                from
            );
        }
    }
    Ok(true)
}

/// Print the tool's status; returns whether the requirement holds
async fn check<S: System>(provisioner: &Provisioner<S>) -> bool {
    let requirement = provisioner.requirement();
    let status = provisioner.check().await;

    match &status {
        ToolStatus::Satisfied { path, installed } => {
            println!(
                "{} {} {} ({}) meets requirement {}",
                "✓".green(),
                requirement.name,
                installed,
                path.display(),
                requirement.minimum_version
            );
        }
        ToolStatus::Missing => {
            println!("{} {} not found in PATH", "✗".red(), requirement.name);
        }
        ToolStatus::Outdated { path, installed } => {
            println!(
                "{} {} {} ({}) is older than required {}",
                "✗".red(),
                requirement.name,
                installed,
                path.display(),
                requirement.minimum_version
            );
        }
        ToolStatus::Unknown { path, error } => {
            println!(
                "{} {} ({}): {}",
                "?".yellow(),
                requirement.name,
                path.display(),
                error
            );
        }
    }

    if !status.is_satisfied() {
        println!(
            "  {} {}",
            "Install with:".dimmed(),
            provisioner.install_command().yellow()
        );
    }
    status.is_satisfied()
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Ensure terminal cursor is restored on panic
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = console::Term::stderr().show_cursor();
        default_panic(info);
    }));

    // Handle Ctrl+C gracefully
    ctrlc::set_handler(move || {
        let _ = console::Term::stderr().show_cursor();
        std::process::exit(130);
    })
    .ok();

    let mut args = Args::parse();

    // No subcommand provided, default to ensure (interactive when attended)
    let command = args
        .command
        .take()
        .unwrap_or_else(|| Command::Ensure(EnsureArgs::default()));
    let interactive = matches!(command, Command::Ensure(_)) && console::user_attended();
    init_tracing(args.debug, interactive);

    let config = load_config(&args)?;
    tracing::debug!(?config, "Loaded configuration");
    let provisioner = Provisioner::new(config);

    let ok = match command {
        Command::Ensure(ensure_args) => ensure(&provisioner, ensure_args, interactive).await?,
        Command::Check => check(&provisioner).await,
    };
    Ok(exit_code(ok))
}
