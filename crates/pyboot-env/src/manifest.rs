//! Dependency manifest (`requirements.txt`).
//!
//! The file is handed to pip unchanged (`-r`), so pip stays the authority on
//! its syntax. Parsing here only serves reporting and change detection.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// One non-comment line of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub raw: String,
    /// Distribution name; `None` for option lines (`-r`, `--index-url`, ...)
    /// and bare URLs or paths.
    pub name: Option<String>,
    /// Exact `==` pin, if any.
    pub pin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub path: PathBuf,
    pub requirements: Vec<Requirement>,
    /// Hex SHA-256 of the file content.
    pub digest: String,
}

impl Manifest {
    /// Load the manifest at `path`. `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> std::io::Result<Option<Self>> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(Some(Self::parse(path, &content)))
    }

    pub fn parse(path: &Path, content: &str) -> Self {
        let requirements = content
            .lines()
            .map(strip_comment)
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(parse_requirement)
            .collect();
        Self {
            path: path.to_path_buf(),
            requirements,
            digest: digest(content),
        }
    }

    /// Number of lines naming a distribution.
    pub fn package_count(&self) -> usize {
        self.requirements.iter().filter(|r| r.name.is_some()).count()
    }
}

pub fn digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// pip treats `#` as a comment at line start or after whitespace.
fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    match line.find(" #").or_else(|| line.find("\t#")) {
        Some(pos) => &line[..pos],
        None => line,
    }
}

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn parse_requirement(line: &str) -> Requirement {
    let raw = line.to_string();
    if line.starts_with('-') || line.contains("://") || line.starts_with('.') || line.starts_with('/') {
        return Requirement {
            raw,
            name: None,
            pin: None,
        };
    }
    let re = NAME_RE.get_or_init(|| {
        Regex::new(
            r"^([A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[[^\]]*\])?\s*(?:===?\s*([^\s;,]+))?",
        )
        .expect("requirement regex")
    });
    match re.captures(line) {
        Some(caps) => Requirement {
            name: caps.get(1).map(|m| m.as_str().to_string()),
            pin: caps.get(2).map(|m| m.as_str().to_string()),
            raw,
        },
        None => Requirement {
            raw,
            name: None,
            pin: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Manifest {
        Manifest::parse(Path::new("requirements.txt"), content)
    }

    #[test]
    fn test_pinned_requirement() {
        let m = parse("requests==2.31.0\n");
        assert_eq!(m.requirements.len(), 1);
        assert_eq!(m.requirements[0].name.as_deref(), Some("requests"));
        assert_eq!(m.requirements[0].pin.as_deref(), Some("2.31.0"));
        assert_eq!(m.package_count(), 1);
    }

    #[test]
    fn test_comments_options_and_specifiers() {
        let m = parse(
            "# GUI\n\
             PySide6>=6.5  # qt bindings\n\
             \n\
             pynput == 1.7.6 ; sys_platform != 'emscripten'\n\
             uvicorn[standard]==0.30.1\n\
             --index-url https://pypi.org/simple\n\
             -r extra.txt\n\
             https://example.com/pkg.whl\n",
        );
        let names: Vec<Option<&str>> = m.requirements.iter().map(|r| r.name.as_deref()).collect();
        assert_eq!(
            names,
            vec![Some("PySide6"), Some("pynput"), Some("uvicorn"), None, None, None]
        );
        assert_eq!(m.requirements[0].pin, None);
        assert_eq!(m.requirements[0].raw, "PySide6>=6.5");
        assert_eq!(m.requirements[1].pin.as_deref(), Some("1.7.6"));
        assert_eq!(m.requirements[2].pin.as_deref(), Some("0.30.1"));
        assert_eq!(m.package_count(), 3);
    }

    #[test]
    fn test_digest_tracks_content() {
        assert_eq!(parse("a==1\n").digest, parse("a==1\n").digest);
        assert_ne!(parse("a==1\n").digest, parse("a==2\n").digest);
        assert_eq!(parse("").digest.len(), 64);
    }

    #[test]
    fn test_load_missing_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(Manifest::load(&tmp.path().join("requirements.txt")).unwrap(), None);
    }
}
