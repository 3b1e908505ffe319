//! CLI command implementations

pub mod fetch;
pub mod list;
pub mod store;
