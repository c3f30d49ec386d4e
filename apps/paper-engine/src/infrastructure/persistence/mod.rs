//! Persistence Adapters
//!
//! Implementations of the snapshot store port.

pub mod in_memory;
pub mod json_file;

pub use in_memory::InMemoryStateStore;
pub use json_file::JsonFileStateStore;
