pub mod cart;
pub mod classifier;
pub mod commitment;
pub mod custom;
pub mod estimate;
pub mod geometry;
pub mod matcher;
pub mod tiers;

pub use crate::domain::ports::{CatalogSource, KeyValueStore};
pub use crate::utils::error::Result;
