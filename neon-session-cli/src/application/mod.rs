mod autopilot;
pub mod driver;
mod schema;

pub use autopilot::Autopilot;
pub use driver::{GameDriver, RunOptions, StartPolicy};
pub use schema::{protocol_schema, write_protocol_schema};
