use crate::domain::model::BillingSku;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// String key-value persistence used by the geometry model.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// Fully paginated billing catalog as seen at `fetched_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub skus: Vec<BillingSku>,
    pub fetched_at: DateTime<Utc>,
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_skus(&self) -> Result<CatalogSnapshot>;
}
