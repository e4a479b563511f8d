//! Subprocess supervision for the environment and installer steps.
//!
//! Captured pipes are drained by background threads while the child runs.
//! Without this a child writing more than the pipe buffer (~64KB) blocks on
//! write and the wait below never returns.

use std::fmt;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{EXIT_FAILURE, EXIT_TIMEOUT};

pub const POLL_INTERVAL_MS: u64 = 50;

/// Lines of captured stderr kept in error messages.
const STDERR_TAIL_LINES: usize = 20;

/// Why a subprocess step did not succeed.
#[derive(Debug, Clone)]
pub enum StepFailure {
    Spawn(String),
    Failed(String),
    /// The program ran and exited unsuccessfully. `code` is `None` when it
    /// was terminated by a signal.
    Exit { code: Option<i32>, stderr: String },
    TimedOut(Duration),
}

impl StepFailure {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exit {
                code: Some(code), ..
            } if *code != 0 => *code,
            Self::TimedOut(_) => EXIT_TIMEOUT,
            _ => EXIT_FAILURE,
        }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(e) => write!(f, "could not start: {}", e),
            Self::Failed(e) => write!(f, "{}", e),
            Self::Exit { code, stderr } => {
                match code {
                    Some(code) => write!(f, "exited with status {}", code)?,
                    None => write!(f, "terminated by signal")?,
                }
                let tail = stderr_tail(stderr);
                if !tail.is_empty() {
                    write!(f, "\n{}", tail)?;
                }
                Ok(())
            }
            Self::TimedOut(d) => write!(f, "timed out after {}s", d.as_secs()),
        }
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim_end().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Run `cmd` to completion.
///
/// With `capture` the child's stdout/stderr are collected (and stdin is
/// closed) and only surface in the failure; otherwise all three streams are
/// inherited so the user sees the child's progress.
pub fn run_step(
    cmd: &mut Command,
    capture: bool,
    timeout: Option<Duration>,
) -> Result<(), StepFailure> {
    if capture {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
    }
    tracing::debug!(command = ?cmd, capture, ?timeout, "running step");

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(|e| StepFailure::Spawn(e.to_string()))?;
    let (status, _stdout, stderr) = wait_with_timeout(&mut child, timeout)?;
    tracing::debug!(
        status = %status,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "step finished"
    );

    if !status.success() {
        return Err(StepFailure::Exit {
            code: status.code(),
            stderr,
        });
    }
    Ok(())
}

/// Wait for `child`, killing it once `timeout` elapses.
///
/// Returns (status, stdout, stderr). Streams that were not piped come back
/// empty.
pub fn wait_with_timeout(
    child: &mut Child,
    timeout: Option<Duration>,
) -> Result<(ExitStatus, String, String), StepFailure> {
    let stdout_handle = child.stdout.take().map(|mut out| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = out.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    });
    let stderr_handle = child.stderr.take().map(|mut err| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = err.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    });
    let collect = |stdout_handle: Option<thread::JoinHandle<String>>,
                   stderr_handle: Option<thread::JoinHandle<String>>| {
        let stdout = stdout_handle
            .map(|h| h.join().unwrap_or_default())
            .unwrap_or_default();
        let stderr = stderr_handle
            .map(|h| h.join().unwrap_or_default())
            .unwrap_or_default();
        (stdout, stderr)
    };

    let Some(timeout) = timeout else {
        let status = child
            .wait()
            .map_err(|e| StepFailure::Failed(format!("failed to wait for process: {}", e)))?;
        let (stdout, stderr) = collect(stdout_handle, stderr_handle);
        return Ok((status, stdout, stderr));
    };

    let start = Instant::now();
    let interval = Duration::from_millis(POLL_INTERVAL_MS);
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let (stdout, stderr) = collect(stdout_handle, stderr_handle);
                return Ok((status, stdout, stderr));
            }
            Ok(None) => {}
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(StepFailure::Failed(format!(
                    "failed to wait for process: {}",
                    e
                )));
            }
        }

        if start.elapsed() > timeout {
            tracing::warn!(pid = child.id(), "step exceeded {}s, killing", timeout.as_secs());
            let _ = child.kill();
            let _ = child.wait();
            // Grandchildren may still hold the pipes open; the reader threads
            // are left detached instead of joined.
            return Err(StepFailure::TimedOut(timeout));
        }

        thread::sleep(interval);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    fn spawn_piped(script: &str) -> Child {
        sh(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap()
    }

    #[test]
    fn test_captures_output() {
        let mut child = spawn_piped("echo hello; echo oops >&2");
        let (status, stdout, stderr) = wait_with_timeout(&mut child, None).unwrap();
        assert!(status.success());
        assert_eq!(stdout.trim(), "hello");
        assert_eq!(stderr.trim(), "oops");
    }

    #[test]
    fn test_successful_step() {
        run_step(&mut sh("echo quiet"), true, None).unwrap();
    }

    #[test]
    fn test_nonzero_exit_keeps_code_and_stderr() {
        let err = run_step(&mut sh("echo broken >&2; exit 3"), true, None).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        match err {
            StepFailure::Exit { code, stderr } => {
                assert_eq!(code, Some(3));
                assert!(stderr.contains("broken"));
            }
            other => panic!("unexpected failure: {:?}", other),
        }
    }

    #[test]
    fn test_large_output_does_not_deadlock() {
        let mut child =
            spawn_piped("i=0; while [ $i -lt 20000 ]; do echo 0123456789; i=$((i+1)); done");
        let (_, stdout, _) =
            wait_with_timeout(&mut child, Some(Duration::from_secs(30))).unwrap();
        assert_eq!(stdout.lines().count(), 20000);
    }

    #[test]
    fn test_timeout_kills_child() {
        let start = Instant::now();
        let err = run_step(&mut sh("sleep 30"), true, Some(Duration::from_millis(200)))
            .unwrap_err();
        assert!(matches!(err, StepFailure::TimedOut(_)));
        assert_eq!(err.exit_code(), EXIT_TIMEOUT);
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_spawn_failure() {
        let err = run_step(
            &mut Command::new("/nonexistent/pyboot-test-binary"),
            true,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, StepFailure::Spawn(_)));
        assert_eq!(err.exit_code(), EXIT_FAILURE);
    }

    #[test]
    fn test_stderr_tail_is_bounded() {
        let long: String = (0..50).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(&long);
        assert_eq!(tail.lines().count(), STDERR_TAIL_LINES);
        assert!(tail.ends_with("line 49"));
    }
}
