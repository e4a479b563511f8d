//! Hand control to the target application.
//!
//! The target runs as `<env python> <target>` with no extra arguments, from
//! the install root, with the launcher's standard streams. In spawn mode the
//! launcher relays termination signals to the child while it waits, then
//! mirrors the child's exit. In exec mode (unix) the launcher process image
//! is replaced.

use std::path::Path;
use std::process::{Command, ExitStatus};

use pyboot_core::config::HandoffMode;
use pyboot_core::progress;

use crate::env::ActivatedEnv;
use crate::error::{LaunchError, EXIT_NOT_EXECUTABLE, EXIT_NOT_FOUND};
use crate::layout::InstallLayout;

/// How the target finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffOutcome {
    Exited(i32),
    /// Terminated by this signal number.
    Signaled(i32),
}

impl HandoffOutcome {
    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Exited(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt as _;
            if let Some(signal) = status.signal() {
                return Self::Signaled(signal);
            }
        }
        Self::Exited(1)
    }

    /// Shell convention: signals map to 128 + N.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exited(code) => *code,
            Self::Signaled(signal) => 128 + signal,
        }
    }
}

/// The command that runs the target inside `env`.
pub fn target_command(env: &ActivatedEnv, layout: &InstallLayout) -> Command {
    let mut cmd = env.python_command();
    cmd.arg(&layout.target).current_dir(&layout.root);
    cmd
}

/// Run the target. In exec mode this only returns on failure.
pub fn handoff(
    env: &ActivatedEnv,
    layout: &InstallLayout,
    mode: HandoffMode,
) -> Result<HandoffOutcome, LaunchError> {
    if !layout.target.is_file() {
        return Err(LaunchError::Handoff {
            target: layout.target.clone(),
            reason: "file not found".to_string(),
            code: EXIT_NOT_FOUND,
        });
    }
    let name = layout
        .target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    progress!("Launching {}", name);

    let cmd = target_command(env, layout);
    match mode {
        HandoffMode::Exec => exec_into(cmd, &layout.target),
        HandoffMode::Spawn => spawn_and_wait(cmd, &layout.target),
    }
}

#[cfg(unix)]
fn exec_into(mut cmd: Command, target: &Path) -> Result<HandoffOutcome, LaunchError> {
    use std::os::unix::process::CommandExt as _;
    tracing::debug!(command = ?cmd, "exec");
    let err = cmd.exec();
    Err(handoff_error(target, err))
}

#[cfg(not(unix))]
fn exec_into(cmd: Command, target: &Path) -> Result<HandoffOutcome, LaunchError> {
    tracing::debug!("exec handoff unavailable on this platform, spawning instead");
    spawn_and_wait(cmd, target)
}

fn spawn_and_wait(mut cmd: Command, target: &Path) -> Result<HandoffOutcome, LaunchError> {
    tracing::debug!(command = ?cmd, "spawn");
    // Installed before spawn: a signal arriving while the child starts is
    // held and relayed once its pid is known. exec resets caught signals, so
    // the child starts with default dispositions.
    let forwarder = SignalForwarder::install();
    let mut child = cmd.spawn().map_err(|e| handoff_error(target, e))?;
    forwarder.attach(child.id());
    let status = child.wait().map_err(|e| LaunchError::Handoff {
        target: target.to_path_buf(),
        reason: format!("failed to wait for target: {}", e),
        code: 1,
    })?;
    drop(forwarder);
    let outcome = HandoffOutcome::from_status(status);
    tracing::debug!(?outcome, "target finished");
    Ok(outcome)
}

fn handoff_error(target: &Path, err: std::io::Error) -> LaunchError {
    let code = if err.kind() == std::io::ErrorKind::PermissionDenied {
        EXIT_NOT_EXECUTABLE
    } else {
        EXIT_NOT_FOUND
    };
    LaunchError::Handoff {
        target: target.to_path_buf(),
        reason: err.to_string(),
        code,
    }
}

#[cfg(unix)]
mod relay {
    use std::sync::atomic::{AtomicI32, Ordering};

    use nix::libc;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    /// Signals relayed to the target while the launcher waits for it.
    pub const FORWARDED: [Signal; 4] = [
        Signal::SIGTERM,
        Signal::SIGHUP,
        Signal::SIGINT,
        Signal::SIGQUIT,
    ];

    /// Pid of the running target; 0 while none is attached.
    pub static CHILD_PID: AtomicI32 = AtomicI32::new(0);
    /// Signal received before the target's pid was known.
    pub static PENDING: AtomicI32 = AtomicI32::new(0);

    /// Interrupt and quit typed at the terminal already reach the whole
    /// foreground group, the target included. Only relay them when another
    /// process sent them to the launcher.
    pub(super) fn already_delivered(sig: libc::c_int, info: *const libc::siginfo_t) -> bool {
        if sig != libc::SIGINT && sig != libc::SIGQUIT {
            return false;
        }
        !sent_by_process(info)
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    fn sent_by_process(info: *const libc::siginfo_t) -> bool {
        // si_code <= 0 marks signals sent from user space (kill, sigqueue).
        // SAFETY: the kernel passes a valid siginfo to SA_SIGINFO handlers.
        !info.is_null() && unsafe { (*info).si_code } <= 0
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    fn sent_by_process(_info: *const libc::siginfo_t) -> bool {
        false
    }

    /// Signal handler. Only atomics and kill(2), both async-signal-safe.
    pub extern "C" fn on_signal(
        sig: libc::c_int,
        info: *mut libc::siginfo_t,
        _ctx: *mut libc::c_void,
    ) {
        if already_delivered(sig, info) {
            return;
        }
        PENDING.store(sig, Ordering::SeqCst);
        let pid = CHILD_PID.load(Ordering::SeqCst);
        if pid > 0 {
            deliver(pid);
        }
    }

    /// Send the pending signal, if any, to `pid`. Exactly one caller wins the
    /// swap, so a signal is relayed once.
    pub fn deliver(pid: i32) {
        let sig = PENDING.swap(0, Ordering::SeqCst);
        if let Ok(sig) = Signal::try_from(sig) {
            let _ = kill(Pid::from_raw(pid), sig);
        }
    }
}

/// Relays termination signals sent to the launcher to the target while it
/// runs, so the launcher never exits ahead of its child. Restores the
/// previous dispositions on drop.
struct SignalForwarder {
    #[cfg(unix)]
    previous: Vec<(nix::sys::signal::Signal, nix::sys::signal::SigAction)>,
}

impl SignalForwarder {
    #[cfg(unix)]
    fn install() -> Self {
        use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet};
        use std::sync::atomic::Ordering;

        relay::CHILD_PID.store(0, Ordering::SeqCst);
        relay::PENDING.store(0, Ordering::SeqCst);
        let action = SigAction::new(
            SigHandler::SigAction(relay::on_signal),
            SaFlags::SA_RESTART | SaFlags::SA_SIGINFO,
            SigSet::empty(),
        );
        let mut previous = Vec::new();
        for sig in relay::FORWARDED {
            // SAFETY: the handler only touches atomics and calls kill(2).
            match unsafe { sigaction(sig, &action) } {
                Ok(prev) => previous.push((sig, prev)),
                Err(e) => tracing::debug!(signal = %sig, "cannot install forwarder: {}", e),
            }
        }
        Self { previous }
    }

    #[cfg(not(unix))]
    fn install() -> Self {
        Self {}
    }

    #[cfg(unix)]
    fn attach(&self, pid: u32) {
        use std::sync::atomic::Ordering;
        let Ok(pid) = i32::try_from(pid) else {
            return;
        };
        relay::CHILD_PID.store(pid, Ordering::SeqCst);
        relay::deliver(pid);
    }

    #[cfg(not(unix))]
    fn attach(&self, _pid: u32) {}
}

#[cfg(unix)]
impl Drop for SignalForwarder {
    fn drop(&mut self) {
        use std::sync::atomic::Ordering;
        relay::CHILD_PID.store(0, Ordering::SeqCst);
        for (sig, prev) in self.previous.drain(..) {
            // SAFETY: restores the disposition that was installed before.
            unsafe {
                let _ = nix::sys::signal::sigaction(sig, &prev);
            }
        }
    }
}

/// Terminate the launcher the way the target terminated.
///
/// A signal death is re-raised on the launcher with the default disposition,
/// so the launcher's parent sees the same signal; if that does not end the
/// process, the 128 + N convention is used.
pub fn exit_with(outcome: HandoffOutcome) -> ! {
    #[cfg(unix)]
    if let HandoffOutcome::Signaled(sig) = outcome {
        use nix::sys::signal::{raise, signal, SigHandler, Signal};
        if let Ok(sig) = Signal::try_from(sig) {
            // SAFETY: restoring the default disposition runs no Rust code.
            unsafe {
                let _ = signal(sig, SigHandler::SigDfl);
            }
            let _ = raise(sig);
        }
    }
    std::process::exit(outcome.exit_code())
}
