#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod keys;
pub mod query;
pub mod state;
pub mod traits;
pub mod types;
