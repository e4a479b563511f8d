//! Observability: tracing init and quiet mode.
//!
//! Diagnostics always go to stderr; stdout belongs to progress lines and,
//! after handoff, to the target application.

use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::ObservabilityConfig;

/// Initialize tracing. Call once at process startup.
/// `RUST_LOG` takes precedence over `PYBOOT_LOG_LEVEL`. Quiet mode caps the
/// filter at WARN and silences progress lines.
pub fn init_tracing(cfg: &ObservabilityConfig) {
    crate::log::set_quiet(cfg.quiet);

    let level = if cfg.quiet {
        "pyboot=warn".to_string()
    } else {
        cfg.log_level.clone()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    };
}
