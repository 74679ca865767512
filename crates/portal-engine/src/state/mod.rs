pub mod atomic;
pub mod cache;
pub mod identity;
pub mod journal;
pub mod store;
