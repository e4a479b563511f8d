//! Isolated Python environment: creation, activation, completion state.
//!
//! Activation never touches the launcher's own process environment. The
//! builder returns an `ActivatedEnv` and every later subprocess is built
//! from it.

pub mod builder;
pub mod state;

pub use builder::{activate, ensure_environment, ActivatedEnv, EnvStatus};
pub use state::EnvState;
