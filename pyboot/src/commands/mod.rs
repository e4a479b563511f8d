//! Management commands. They only inspect or remove what the launcher
//! provisions and never run the target application.

pub mod env;
