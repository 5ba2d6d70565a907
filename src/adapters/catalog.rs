//! Cloud Billing catalog client.
//!
//! Walks `GET {endpoint}/v1/services/{service}/skus`, following
//! `nextPageToken` until no token is returned or `max_pages` pages have been
//! read, and converts each sku into the crate's [`BillingSku`].

use crate::config::toml_config::CatalogSettings;
use crate::domain::model::{BillingSku, ProductCategory, SkuPricing, Tier, TierTable};
use crate::domain::ports::{CatalogSnapshot, CatalogSource};
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Region key used for skus sold without a region list.
pub const GLOBAL_REGION: &str = "global";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SkuPage {
    #[serde(default)]
    skus: Vec<RawSku>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSku {
    sku_id: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: RawCategory,
    #[serde(default)]
    service_regions: Vec<String>,
    #[serde(default)]
    pricing_info: Vec<RawPricingInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawCategory {
    resource_family: String,
    resource_group: String,
    usage_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPricingInfo {
    pricing_expression: RawPricingExpression,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPricingExpression {
    #[serde(default)]
    tiered_rates: Vec<RawTieredRate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTieredRate {
    #[serde(default)]
    start_usage_amount: f64,
    unit_price: RawMoney,
}

/// int64 `units` arrive as JSON strings and are omitted when zero.
#[derive(Debug, Deserialize)]
struct RawMoney {
    #[serde(default = "zero_units")]
    units: serde_json::Value,
    #[serde(default)]
    nanos: i64,
}

fn zero_units() -> serde_json::Value {
    serde_json::Value::String("0".to_string())
}

impl RawMoney {
    /// `None` when `units` is present but not a number.
    fn amount(&self) -> Option<f64> {
        let units = match &self.units {
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
            serde_json::Value::Number(n) => n.as_f64()?,
            _ => return None,
        };
        units
            .is_finite()
            .then(|| units + self.nanos as f64 / 1e9)
    }
}

/// Derives the cart category from catalog metadata.
fn category_for(raw: &RawSku) -> ProductCategory {
    let description = raw.description.to_lowercase();
    let group = raw.category.resource_group.to_lowercase();

    if description.contains("forwarding rule") {
        if description.contains("additional") {
            return ProductCategory::ForwardingRuleExtra;
        }
        return ProductCategory::ForwardingRule;
    }
    let committed_usage = matches!(raw.category.usage_type.as_str(), "Commit1Yr" | "Commit3Yr");
    if description.contains("commitment") || committed_usage {
        return ProductCategory::CommittedUse;
    }
    if description.contains("support") {
        return ProductCategory::Support;
    }
    if description.contains("training") {
        return ProductCategory::MlTraining;
    }

    match raw.category.resource_family.as_str() {
        "Compute" => ProductCategory::ComputeInstance,
        "Storage" => {
            if group.contains("pd") || group.contains("ssd") || group.contains("snapshot") {
                ProductCategory::PersistentDisk
            } else {
                ProductCategory::CloudStorage
            }
        }
        "Network" if group.contains("egress") => ProductCategory::NetworkEgress,
        _ => ProductCategory::Other,
    }
}

fn convert(raw: RawSku) -> Option<BillingSku> {
    let category = category_for(&raw);
    let rates = &raw.pricing_info.last()?.pricing_expression.tiered_rates;

    let pricing = match rates.as_slice() {
        [] => {
            tracing::debug!("Skipping sku {} without rates", raw.sku_id);
            return None;
        }
        [single] => {
            let Some(price) = single.unit_price.amount() else {
                tracing::warn!("Skipping sku {}: unreadable unit price", raw.sku_id);
                return None;
            };
            let regions = if raw.service_regions.is_empty() {
                vec![GLOBAL_REGION.to_string()]
            } else {
                raw.service_regions.clone()
            };
            SkuPricing::Regional(regions.into_iter().map(|region| (region, price)).collect())
        }
        tiered => {
            // Each catalog tier starts where the previous one ends; the last is open-ended.
            let tiers: Option<Vec<Tier>> = tiered
                .iter()
                .enumerate()
                .map(|(i, rate)| {
                    Some(Tier {
                        threshold: tiered
                            .get(i + 1)
                            .map(|next| next.start_usage_amount)
                            .unwrap_or(f64::MAX),
                        rate: rate.unit_price.amount()?,
                    })
                })
                .collect();
            let Some(tiers) = tiers else {
                tracing::warn!("Skipping sku {}: unreadable tier price", raw.sku_id);
                return None;
            };
            match TierTable::new(tiers) {
                Ok(table) => SkuPricing::Tiered(table),
                Err(e) => {
                    tracing::warn!("Skipping sku {}: {}", raw.sku_id, e);
                    return None;
                }
            }
        }
    };

    Some(BillingSku {
        id: raw.sku_id,
        description: raw.description,
        category,
        pricing,
        free_quota: None,
        fixed_price: false,
    })
}

pub struct HttpCatalog {
    client: Client,
    endpoint: String,
    service_id: String,
    api_key: Option<String>,
    page_size: usize,
    max_pages: usize,
}

impl HttpCatalog {
    pub fn new(settings: &CatalogSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            service_id: settings.service_id.clone(),
            api_key: settings.api_key.clone(),
            page_size: settings.page_size,
            max_pages: settings.max_pages,
        })
    }

    async fn fetch_page(&self, page_token: &str) -> Result<SkuPage> {
        let url = format!("{}/v1/services/{}/skus", self.endpoint, self.service_id);
        let mut query = vec![
            ("pageSize", self.page_size.to_string()),
            ("pageToken", page_token.to_string()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("key", key.clone()));
        }

        tracing::debug!("Requesting catalog page from {} (token {:?})", url, page_token);
        let response = self.client.get(&url).query(&query).send().await?;
        tracing::debug!("Catalog response status: {}", response.status());

        let page = response.error_for_status()?.json::<SkuPage>().await?;
        Ok(page)
    }
}

#[async_trait]
impl CatalogSource for HttpCatalog {
    async fn fetch_skus(&self) -> Result<CatalogSnapshot> {
        let mut skus = Vec::new();
        let mut token = String::new();
        let mut pages = 0;

        loop {
            let page = self.fetch_page(&token).await?;
            pages += 1;
            let received = page.skus.len();
            skus.extend(page.skus.into_iter().filter_map(convert));
            tracing::debug!("Catalog page {}: {} skus", pages, received);

            match page.next_page_token.filter(|next| !next.is_empty()) {
                Some(next) if pages < self.max_pages => token = next,
                Some(_) => {
                    tracing::warn!(
                        "Stopping catalog fetch after {} pages; more pages are available",
                        pages
                    );
                    break;
                }
                None => break,
            }
        }

        tracing::info!("Fetched {} skus in {} pages", skus.len(), pages);
        Ok(CatalogSnapshot {
            skus,
            fetched_at: chrono::Utc::now(),
        })
    }
}
