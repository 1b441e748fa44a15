//! Key-value storage adapters backing the offline queue

pub mod file_store;
pub mod memory;

pub use file_store::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;
