//! Local adapters for single-host deployment.

pub mod json_store;
pub mod memory;

pub use json_store::JsonFileStore;
pub use memory::InMemoryStore;
