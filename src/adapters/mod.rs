// Adapters layer: concrete implementations of the domain ports.

pub mod elasticsearch;
pub mod fake_index;
pub mod memory_store;
pub mod sqlite_store;
pub mod warnings;
