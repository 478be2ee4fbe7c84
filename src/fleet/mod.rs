pub mod client;
pub mod launcher;
pub mod unit;

pub use client::{FleetClient, Machine, UnitState, UnitSubmission, DEFAULT_FLEET_API};
pub use launcher::{destroy_units, stop_units, CouchbaseFleet};
pub use unit::UnitOption;
