mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use pyboot_core::config::{root_override, ConfigSource, LauncherConfig, ObservabilityConfig};
use pyboot_core::log::PREFIX;
use pyboot_core::observability::init_tracing;
use pyboot_env::error::EXIT_FAILURE;
use pyboot_env::{handoff, resolve_install_root, LaunchError, Launcher};

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        let code = exit_code_for(&err);
        match err.downcast_ref::<LaunchError>() {
            Some(launch) => eprintln!("{} error: {}", PREFIX, launch),
            None => eprintln!("{} error: {:#}", PREFIX, err),
        }
        std::process::exit(code);
    }
}

fn run(cli: Cli) -> Result<()> {
    let root = resolve_install_root(root_override().as_deref())?;
    let source = ConfigSource::process().with_dotenv_dir(&root);
    init_tracing(&ObservabilityConfig::from_source(&source));
    let config = LauncherConfig::from_source(&source);
    tracing::debug!(root = %root.display(), ?config, "install root resolved");

    let launcher = Launcher::new(&root, config);
    match cli.command {
        None => {
            let outcome = launcher.launch()?;
            handoff::exit_with(outcome)
        }
        Some(Commands::Status { json }) => commands::env::cmd_status(&launcher, json),
        Some(Commands::Clean { dry_run, force }) => {
            commands::env::cmd_clean(&launcher, dry_run, force)
        }
    }
}

/// Launch failures carry their own exit code; anything else is a plain 1.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<LaunchError>()
        .map(LaunchError::exit_code)
        .unwrap_or(EXIT_FAILURE)
}
