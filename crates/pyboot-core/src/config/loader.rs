//! Environment variable loading.
//!
//! Lookup order is the process environment first, then the `.env` file in the
//! install root. Values from `.env` never override the process environment
//! and are never written back into it.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use super::env_keys;

/// Layered key/value source backing every `*Config::from_source` call.
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    /// `None` reads the live process environment.
    primary: Option<HashMap<String, String>>,
    dotenv: HashMap<String, String>,
}

impl ConfigSource {
    /// Source backed by the live process environment.
    pub fn process() -> Self {
        Self::default()
    }

    /// Isolated source that ignores the process environment.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            primary: Some(
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            dotenv: HashMap::new(),
        }
    }

    /// Layer the `.env` file of `dir` underneath the primary source.
    /// A missing or unreadable file leaves the source unchanged; an unreadable
    /// one is reported on stderr.
    pub fn with_dotenv_dir(mut self, dir: &Path) -> Self {
        let path = dir.join(env_keys::DOTENV_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                self.dotenv = parse_dotenv(&content);
                tracing::debug!(
                    path = %path.display(),
                    keys = self.dotenv.len(),
                    "loaded .env"
                );
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            // Runs before tracing is initialized, so this goes straight to
            // stderr.
            Err(e) => {
                crate::warn_user!("ignoring unreadable {}: {}", path.display(), e);
            }
        }
        self
    }

    /// Raw lookup: primary source, then `.env`.
    pub fn var(&self, key: &str) -> Option<String> {
        let primary = match &self.primary {
            Some(map) => map.get(key).cloned(),
            None => env::var(key).ok(),
        };
        primary.or_else(|| self.dotenv.get(key).cloned())
    }

    /// Read `key`, falling back to `default` when unset or empty.
    pub fn env_or<F>(&self, key: &str, default: F) -> String
    where
        F: FnOnce() -> String,
    {
        self.var(key)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(default)
    }

    /// Read `key`; blank values count as unset.
    pub fn env_optional(&self, key: &str) -> Option<String> {
        self.var(key).and_then(|s| {
            let s = s.trim().to_string();
            if s.is_empty() {
                None
            } else {
                Some(s)
            }
        })
    }

    /// Boolean flag: 0/false/no/off are false, anything else set is true.
    pub fn env_bool(&self, key: &str, default: bool) -> bool {
        match self.var(key).as_deref() {
            Some(s) => !matches!(
                s.trim().to_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            ),
            None => default,
        }
    }
}

/// Parse `.env` content: `KEY=value` lines, `#` comments, optional quotes.
pub fn parse_dotenv(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some(eq_pos) = line.find('=') else {
            continue;
        };
        let key = line[..eq_pos].trim();
        let mut value = line[eq_pos + 1..].trim();
        // Strip inline comment (# not inside quotes)
        if let Some(hash_pos) = value.find('#') {
            let before_hash = value[..hash_pos].trim_end();
            if !before_hash.contains('"') && !before_hash.contains('\'') {
                value = before_hash;
            }
        }
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }
        if !key.is_empty() {
            vars.insert(key.to_string(), value.to_string());
        }
    }
    vars
}

/// `PYBOOT_ROOT` from the process environment, if set and non-blank.
pub fn root_override() -> Option<PathBuf> {
    ConfigSource::process()
        .env_optional(env_keys::PYBOOT_ROOT)
        .map(PathBuf::from)
}
