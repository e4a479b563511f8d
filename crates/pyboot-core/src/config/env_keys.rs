//! Environment variable keys and their defaults.

/// Install root override. Read from the process environment only, since the
/// `.env` file itself lives in the install root.
pub const PYBOOT_ROOT: &str = "PYBOOT_ROOT";

pub const DOTENV_FILE: &str = ".env";

/// Install layout, relative to the install root
pub mod layout {
    pub const PYBOOT_ENV_DIR: &str = "PYBOOT_ENV_DIR";
    pub const DEFAULT_ENV_DIR: &str = ".venv";

    pub const PYBOOT_MANIFEST: &str = "PYBOOT_MANIFEST";
    pub const DEFAULT_MANIFEST: &str = "requirements.txt";

    pub const PYBOOT_TARGET: &str = "PYBOOT_TARGET";
    pub const DEFAULT_TARGET: &str = "overlay_rules.py";
}

/// Interpreter selection and subprocess policy
pub mod runtime {
    /// Comma-separated interpreter candidates, in preference order.
    pub const PYBOOT_PYTHON: &str = "PYBOOT_PYTHON";
    pub const DEFAULT_INTERPRETERS: &[&str] = &["python3", "python"];

    pub const PYBOOT_HANDOFF: &str = "PYBOOT_HANDOFF";

    pub const PYBOOT_LOCK: &str = "PYBOOT_LOCK";

    /// Timeout for venv creation and each installer call. 0 disables it.
    pub const PYBOOT_STEP_TIMEOUT_SECS: &str = "PYBOOT_STEP_TIMEOUT_SECS";
}

pub mod observability {
    pub const PYBOOT_QUIET: &str = "PYBOOT_QUIET";
    pub const PYBOOT_LOG_LEVEL: &str = "PYBOOT_LOG_LEVEL";
    pub const DEFAULT_LOG_LEVEL: &str = "pyboot=warn";
    pub const PYBOOT_LOG_JSON: &str = "PYBOOT_LOG_JSON";
}
