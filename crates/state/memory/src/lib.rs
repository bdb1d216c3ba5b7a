mod store;

pub use store::{MemoryCounterStore, spawn_sweeper};
