//! Shared command-line infrastructure for bzzup.
//!
//! - [`args`] - CLI argument structs shared by several commands
//! - [`logging`] - tracing subscriber initialisation
//! - [`version`] - version information

pub mod args;
pub mod logging;
pub mod version;
