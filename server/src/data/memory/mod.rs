//! In-process data backend.

mod store;

pub use store::new_memory_store;
