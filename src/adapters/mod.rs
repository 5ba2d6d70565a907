// Adapters layer: concrete implementations of the domain ports (key-value stores, sku catalog).

pub mod catalog;
pub mod storage;

pub use catalog::HttpCatalog;
pub use storage::{FileStore, MemoryStore};
