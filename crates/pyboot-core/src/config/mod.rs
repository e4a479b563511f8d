//! pyboot configuration layer
//!
//! Every environment variable read goes through this module; launcher code
//! works with the structured configs instead of calling `std::env::var`.
//!
//! - `loader`: `ConfigSource` (process env, then `.env` in the install root)
//! - `schema`: `LauncherConfig`, `ObservabilityConfig`, `HandoffMode`
//! - `env_keys`: key constants and defaults

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{parse_dotenv, root_override, ConfigSource};
pub use schema::{HandoffMode, LauncherConfig, ObservabilityConfig};
