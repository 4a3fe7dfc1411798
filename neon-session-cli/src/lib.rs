// Application layer (session driver, schema export)
pub mod application;

// Infrastructure layer (errors, logging)
pub mod infrastructure;

pub use application::{protocol_schema, Autopilot, GameDriver, RunOptions, StartPolicy};
pub use infrastructure::{CliError, LogConfig, Result};
