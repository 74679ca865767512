#![forbid(unsafe_code)]

pub mod env;
pub mod gates;
pub mod probe;
pub mod state;

pub use gates::evaluator::AvailabilityGate;
