//! User-facing launcher messages.
//!
//! Progress lines go to stdout and are dropped in quiet mode (`PYBOOT_QUIET=1`).
//! Warnings always go to stderr. Both carry the `[pyboot]` prefix so they can
//! be told apart from the target application's own output.

use std::sync::atomic::{AtomicBool, Ordering};

pub const PREFIX: &str = "[pyboot]";

static QUIET: AtomicBool = AtomicBool::new(false);

#[macro_export]
macro_rules! progress {
    ($($arg:tt)*) => {{
        if !$crate::log::is_quiet() {
            println!("{} {}", $crate::log::PREFIX, format_args!($($arg)*));
        }
    }};
}

#[macro_export]
macro_rules! warn_user {
    ($($arg:tt)*) => {{
        eprintln!("{} warning: {}", $crate::log::PREFIX, format_args!($($arg)*));
    }};
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}
