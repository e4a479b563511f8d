//! Environment management commands: `pyboot status` and `pyboot clean`.
//!
//! The environment lives next to the launcher (`<root>/.venv` by default) and
//! is recreated on the next launch after `clean`.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use pyboot_env::lock::EnvLock;
use pyboot_env::{EnvReport, Launcher};

/// `pyboot status`
pub fn cmd_status(launcher: &Launcher, json: bool) -> Result<()> {
    let report = launcher.inspect()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_report(&report));
    }
    Ok(())
}

fn format_report(report: &EnvReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Install root:  {}", report.install_root.display());
    match &report.interpreter {
        Some(i) => {
            let _ = writeln!(out, "Interpreter:   {} ({})", i.path.display(), i.version);
        }
        None => {
            let _ = writeln!(out, "Interpreter:   none found");
        }
    }

    let env_line = match (&report.env_python, report.env_present) {
        (Some(_), _) if report.up_to_date => "ready".to_string(),
        (Some(_), _) if report.state.is_none() => "incomplete (setup did not finish)".to_string(),
        (Some(_), _) => "requirements changed since last install".to_string(),
        (None, true) => "broken (no interpreter inside)".to_string(),
        (None, false) => "not created".to_string(),
    };
    let _ = writeln!(out, "Environment:   {} [{}]", report.env_dir.display(), env_line);
    if let Some(state) = &report.state {
        let _ = writeln!(
            out,
            "Last install:  {} (Python {})",
            state.completed_at.to_rfc3339(),
            state.python_version
        );
    }

    if report.manifest_present {
        let _ = writeln!(
            out,
            "Requirements:  {} ({} entries)",
            report.manifest.display(),
            report.requirements.len()
        );
        for req in &report.requirements {
            let label = match (&req.name, &req.pin) {
                (Some(name), Some(pin)) => format!("{} == {}", name, pin),
                (Some(name), None) => name.clone(),
                _ => req.raw.clone(),
            };
            let _ = writeln!(out, "  • {}", label);
        }
    } else {
        let _ = writeln!(out, "Requirements:  {} (missing)", report.manifest.display());
    }

    let target_state = if report.target_present { "" } else { " (missing)" };
    let _ = writeln!(out, "Target:        {}{}", report.target.display(), target_state);
    out
}

/// `pyboot clean`
pub fn cmd_clean(launcher: &Launcher, dry_run: bool, force: bool) -> Result<()> {
    let layout = launcher.layout();
    let env_dir = &layout.env_dir;

    if !env_dir.exists() {
        eprintln!("No environment found at {}", env_dir.display());
        return Ok(());
    }
    if !env_dir.is_dir() {
        bail!("{} is not a directory; refusing to remove it", env_dir.display());
    }

    let size = dir_size(env_dir);
    eprintln!("Environment {} ({})", env_dir.display(), format_size(size));

    if dry_run {
        eprintln!("(Dry run: nothing removed. Remove --dry-run to delete.)");
        return Ok(());
    }

    if !force {
        eprint!("\nRemove the environment? It is recreated on the next launch. [y/N] ");
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            eprintln!("Cancelled.");
            return Ok(());
        }
    }

    let _lock = if launcher.config().lock {
        match EnvLock::try_acquire(&layout.lock_file)? {
            Some(lock) => Some(lock),
            None => bail!("the environment is in use by another launcher; try again later"),
        }
    } else {
        None
    };

    fs::remove_dir_all(env_dir)
        .with_context(|| format!("failed to remove {}", env_dir.display()))?;
    eprintln!("✓ Removed {}, freed {}", env_dir.display(), format_size(size));
    Ok(())
}

/// Compute total size of a directory recursively. Symlinks count as their
/// own size, so a venv's link to the base interpreter is not followed.
fn dir_size(path: &Path) -> u64 {
    let mut total: u64 = 0;
    if let Ok(entries) = fs::read_dir(path) {
        for entry in entries.flatten() {
            let Ok(meta) = entry.path().symlink_metadata() else {
                continue;
            };
            if meta.is_dir() {
                total += dir_size(&entry.path());
            } else {
                total += meta.len();
            }
        }
    }
    total
}

/// Format byte size to human-readable string.
fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
