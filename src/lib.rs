pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{Cli, Command};

pub use adapters::{FileStore, HttpCatalog, MemoryStore};
pub use config::SizerConfig;
pub use core::{
    cart::{CartLedger, SharedLedger},
    classifier::SkuClassifier,
    commitment::{CommitmentPricer, CommitmentTerm},
    geometry::GeometryModel,
    tiers::SustainedUseTables,
};
pub use utils::error::{Result, SizerError};
