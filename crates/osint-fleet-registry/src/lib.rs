//! Worker fleet registry and load-balanced assignment engine.

mod assignment;
mod registry;

pub use registry::{CollectorAssignment, FleetRegistry};
