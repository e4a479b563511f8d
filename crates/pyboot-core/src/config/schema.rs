//! Config structs grouped by concern, loaded from a `ConfigSource`.

use std::path::PathBuf;
use std::time::Duration;

use super::env_keys::{layout, observability as obv_keys, runtime};
use super::loader::ConfigSource;

/// How control is passed to the target application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandoffMode {
    /// Spawn the target as a child, wait, and forward its exit status.
    #[default]
    Spawn,
    /// Replace the launcher process image (unix only; spawn elsewhere).
    Exec,
}

impl HandoffMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "spawn" => Some(Self::Spawn),
            "exec" => Some(Self::Exec),
            _ => None,
        }
    }
}

/// Launcher configuration. Paths are relative to the install root unless
/// given as absolute paths.
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub env_dir: PathBuf,
    pub manifest: PathBuf,
    pub target: PathBuf,
    /// Interpreter candidates in preference order.
    pub interpreters: Vec<String>,
    pub handoff: HandoffMode,
    pub lock: bool,
    /// `None` means subprocess steps may run indefinitely.
    pub step_timeout: Option<Duration>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self::from_source(&ConfigSource::from_pairs(&[]))
    }
}

impl LauncherConfig {
    pub fn from_source(src: &ConfigSource) -> Self {
        let env_dir = src.env_or(layout::PYBOOT_ENV_DIR, || layout::DEFAULT_ENV_DIR.to_string());
        let manifest = src.env_or(layout::PYBOOT_MANIFEST, || {
            layout::DEFAULT_MANIFEST.to_string()
        });
        let target = src.env_or(layout::PYBOOT_TARGET, || layout::DEFAULT_TARGET.to_string());

        let mut interpreters: Vec<String> = src
            .env_optional(runtime::PYBOOT_PYTHON)
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        if interpreters.is_empty() {
            interpreters = runtime::DEFAULT_INTERPRETERS
                .iter()
                .map(|s| s.to_string())
                .collect();
        }

        let handoff = match src.env_optional(runtime::PYBOOT_HANDOFF) {
            Some(raw) => HandoffMode::parse(&raw).unwrap_or_else(|| {
                tracing::warn!("Invalid {}: {}, using spawn", runtime::PYBOOT_HANDOFF, raw);
                HandoffMode::Spawn
            }),
            None => HandoffMode::Spawn,
        };

        let step_timeout = match src.env_optional(runtime::PYBOOT_STEP_TIMEOUT_SECS) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(0) => None,
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(_) => {
                    tracing::warn!(
                        "Invalid {}: {}, running without timeout",
                        runtime::PYBOOT_STEP_TIMEOUT_SECS,
                        raw
                    );
                    None
                }
            },
            None => None,
        };

        Self {
            env_dir: PathBuf::from(env_dir),
            manifest: PathBuf::from(manifest),
            target: PathBuf::from(target),
            interpreters,
            handoff,
            lock: src.env_bool(runtime::PYBOOT_LOCK, true),
            step_timeout,
        }
    }
}

/// Observability config: quiet, log_level, log_json
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
}

impl ObservabilityConfig {
    pub fn from_source(src: &ConfigSource) -> Self {
        Self {
            quiet: src.env_bool(obv_keys::PYBOOT_QUIET, false),
            log_level: src.env_or(obv_keys::PYBOOT_LOG_LEVEL, || {
                obv_keys::DEFAULT_LOG_LEVEL.to_string()
            }),
            log_json: src.env_bool(obv_keys::PYBOOT_LOG_JSON, false),
        }
    }
}
