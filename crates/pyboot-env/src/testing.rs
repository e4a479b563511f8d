//! Fake Python interpreters (`/bin/sh` scripts) for tests.
//!
//! The base interpreter answers `--version` and, on `-m venv DIR`, creates
//! `DIR/bin/python`. That venv interpreter logs every invocation and obeys
//! control files in `ctl/`:
//!
//! - `venv_fail`: venv creation exits 1
//! - `pip_fail`: every `-m pip` call exits 1
//! - `pip_hang`: every `-m pip` call sleeps 30s
//! - `target_exit`: exit code of the target run (content)
//! - `target_signal`: signal the target sends itself (content, e.g. `TERM`)

use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub struct FakeRuntime {
    pub bin: PathBuf,
    pub ctl: PathBuf,
    pub log: PathBuf,
    venv_python: PathBuf,
}

pub fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

impl FakeRuntime {
    pub fn new(base: &Path) -> Self {
        let bin = base.join("fake-bin");
        let ctl = base.join("ctl");
        fs::create_dir_all(&bin).unwrap();
        fs::create_dir_all(&ctl).unwrap();
        let log = base.join("calls.log");
        let venv_python = ctl.join("venv-python");
        let body = format!(
            r#"#!/bin/sh
echo "venv $*" >> '{log}'
case "$1" in
  -m)
    if [ "$2" = "pip" ] && [ -f '{ctl}/pip_fail' ]; then
      echo "ERROR: No matching distribution found" >&2
      exit 1
    fi
    if [ "$2" = "pip" ] && [ -f '{ctl}/pip_hang' ]; then
      exec sleep 30
    fi
    exit 0
    ;;
  *.py)
    echo "target cwd=$(pwd) venv=$VIRTUAL_ENV argc=$#" >> '{log}'
    if [ -f '{ctl}/target_signal' ]; then
      kill -"$(cat '{ctl}/target_signal')" $$
    fi
    if [ -f '{ctl}/target_exit' ]; then
      exit "$(cat '{ctl}/target_exit')"
    fi
    exit 0
    ;;
esac
exit 0
"#,
            log = log.display(),
            ctl = ctl.display(),
        );
        write_script(&venv_python, &body);
        Self {
            bin,
            ctl,
            log,
            venv_python,
        }
    }

    /// Install a base interpreter called `name` reporting `version`.
    pub fn add_python(&self, name: &str, version: &str) -> PathBuf {
        let path = self.bin.join(name);
        let body = format!(
            r#"#!/bin/sh
echo "base $*" >> '{log}'
if [ "$1" = "--version" ]; then
  echo "Python {version}"
  exit 0
fi
if [ "$1" = "-m" ] && [ "$2" = "venv" ]; then
  if [ -f '{ctl}/venv_fail' ]; then
    echo "Error: ensurepip failed" >&2
    exit 1
  fi
  for dir; do :; done
  mkdir -p "$dir/bin"
  cp '{venv_python}' "$dir/bin/python"
  chmod 755 "$dir/bin/python"
fi
exit 0
"#,
            log = self.log.display(),
            ctl = self.ctl.display(),
            venv_python = self.venv_python.display(),
            version = version,
        );
        write_script(&path, &body);
        path
    }

    pub fn search_path(&self) -> OsString {
        self.bin.clone().into_os_string()
    }

    pub fn set(&self, flag: &str, value: &str) {
        fs::write(self.ctl.join(flag), value).unwrap();
    }

    pub fn log_lines(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(String::from)
            .collect()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.log_lines()
            .iter()
            .filter(|l| l.starts_with(prefix))
            .count()
    }
}
