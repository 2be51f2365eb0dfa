//! CLI argument structs.
//!
//! Each struct groups the flags of one concern and is flattened into the
//! commands that need it. Optional values only override the loaded
//! configuration when given on the command line.

mod gateway;
mod log;
mod postage;
mod upload;

pub use gateway::GatewayArgs;
pub use log::LogArgs;
pub use postage::PostageArgs;
pub use upload::UploadArgs;
