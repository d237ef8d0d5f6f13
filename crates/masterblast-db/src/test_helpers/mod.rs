//! In-memory store implementations for tests

mod memory_store;

pub use memory_store::MemoryStore;
