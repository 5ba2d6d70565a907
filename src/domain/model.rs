use crate::utils::error::{Result, SizerError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// User-supplied sizing figures for one resource dimension (vCPU, memory, disk).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryInput {
    pub title: String,
    pub unit_label: String,
    pub current: f64,
    /// Observed utilization, percent.
    pub utilization: f64,
    /// Target utilization, percent. Zero disables recomputation.
    pub utilization_desired: f64,
    /// Tolerance band around the recommendation, percent.
    pub spread_percent: f64,
    pub collapsed: bool,
}

impl GeometryInput {
    pub fn new(title: &str, unit_label: &str) -> Self {
        Self {
            title: title.to_string(),
            unit_label: unit_label.to_string(),
            current: 0.0,
            utilization: 0.0,
            utilization_desired: 0.0,
            spread_percent: 0.0,
            collapsed: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommended: f64,
    pub min_recommended: f64,
    pub max_recommended: f64,
    /// `None` while `current` is zero.
    pub min_utilization_actual: Option<f64>,
    pub max_utilization_actual: Option<f64>,
}

/// Product category tag of a billing sku; selects the cart pricing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductCategory {
    ComputeInstance,
    PersistentDisk,
    NetworkEgress,
    CloudStorage,
    ForwardingRule,
    ForwardingRuleExtra,
    CommittedUse,
    Support,
    MlTraining,
    Other,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 10] = [
        ProductCategory::ComputeInstance,
        ProductCategory::PersistentDisk,
        ProductCategory::NetworkEgress,
        ProductCategory::CloudStorage,
        ProductCategory::ForwardingRule,
        ProductCategory::ForwardingRuleExtra,
        ProductCategory::CommittedUse,
        ProductCategory::Support,
        ProductCategory::MlTraining,
        ProductCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::ComputeInstance => "compute-instance",
            ProductCategory::PersistentDisk => "persistent-disk",
            ProductCategory::NetworkEgress => "network-egress",
            ProductCategory::CloudStorage => "cloud-storage",
            ProductCategory::ForwardingRule => "forwarding-rule",
            ProductCategory::ForwardingRuleExtra => "forwarding-rule-extra",
            ProductCategory::CommittedUse => "committed-use",
            ProductCategory::Support => "support",
            ProductCategory::MlTraining => "ml-training",
            ProductCategory::Other => "other",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductCategory {
    type Err = SizerError;

    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim().to_lowercase().replace('_', "-");
        ProductCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == tag)
            .ok_or_else(|| SizerError::ParseError {
                input: s.to_string(),
                reason: "unknown product category".to_string(),
            })
    }
}

/// One band of a block-rate table: quantity up to `threshold` is charged at `rate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub threshold: f64,
    pub rate: f64,
}

/// Block-rate table with strictly ascending, non-negative thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Tier>", into = "Vec<Tier>")]
pub struct TierTable {
    tiers: Vec<Tier>,
}

impl TierTable {
    pub fn new(tiers: Vec<Tier>) -> Result<Self> {
        if tiers.is_empty() {
            return Err(SizerError::MalformedTiers {
                reason: "tier table is empty".to_string(),
            });
        }
        let mut last = f64::NEG_INFINITY;
        for tier in &tiers {
            if tier.threshold.is_nan() || tier.threshold < 0.0 {
                return Err(SizerError::MalformedTiers {
                    reason: format!("threshold {} is negative", tier.threshold),
                });
            }
            if tier.threshold <= last {
                return Err(SizerError::MalformedTiers {
                    reason: format!(
                        "threshold {} does not ascend past {}",
                        tier.threshold, last
                    ),
                });
            }
            last = tier.threshold;
        }
        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Rate charged past the final threshold.
    pub fn overflow_rate(&self) -> f64 {
        self.tiers.last().map(|t| t.rate).unwrap_or(0.0)
    }
}

impl TryFrom<Vec<Tier>> for TierTable {
    type Error = SizerError;

    fn try_from(tiers: Vec<Tier>) -> Result<Self> {
        TierTable::new(tiers)
    }
}

impl From<TierTable> for Vec<Tier> {
    fn from(table: TierTable) -> Self {
        table.tiers
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SustainedUseTier {
    pub cumulative_usage_fraction: f64,
    pub discount_multiplier: f64,
}

/// Sustained-use tiers of one family; fractions strictly ascending within (0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SustainedUseTier>", into = "Vec<SustainedUseTier>")]
pub struct SustainedUseTierSet {
    tiers: Vec<SustainedUseTier>,
}

impl SustainedUseTierSet {
    pub fn new(tiers: Vec<SustainedUseTier>) -> Result<Self> {
        if tiers.is_empty() {
            return Err(SizerError::MalformedTiers {
                reason: "sustained-use tier set is empty".to_string(),
            });
        }
        let mut last = 0.0;
        for tier in &tiers {
            let fraction = tier.cumulative_usage_fraction;
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(SizerError::MalformedTiers {
                    reason: format!("usage fraction {} outside (0, 1]", fraction),
                });
            }
            if fraction <= last {
                return Err(SizerError::MalformedTiers {
                    reason: format!("usage fraction {} does not ascend past {}", fraction, last),
                });
            }
            last = fraction;
        }
        Ok(Self { tiers })
    }

    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self> {
        Self::new(
            pairs
                .iter()
                .map(|&(fraction, multiplier)| SustainedUseTier {
                    cumulative_usage_fraction: fraction,
                    discount_multiplier: multiplier,
                })
                .collect(),
        )
    }

    pub fn tiers(&self) -> &[SustainedUseTier] {
        &self.tiers
    }
}

impl TryFrom<Vec<SustainedUseTier>> for SustainedUseTierSet {
    type Error = SizerError;

    fn try_from(tiers: Vec<SustainedUseTier>) -> Result<Self> {
        SustainedUseTierSet::new(tiers)
    }
}

impl From<SustainedUseTierSet> for Vec<SustainedUseTier> {
    fn from(set: SustainedUseTierSet) -> Self {
        set.tiers
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkuPricing {
    /// Unit price per region.
    Regional(HashMap<String, f64>),
    /// Block-rate table, identical in every region the sku is sold in.
    Tiered(TierTable),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingSku {
    pub id: String,
    pub description: String,
    pub category: ProductCategory,
    pub pricing: SkuPricing,
    #[serde(default)]
    pub free_quota: Option<f64>,
    /// Charged once per line item regardless of quantity.
    #[serde(default)]
    pub fixed_price: bool,
}

impl BillingSku {
    pub fn regional(
        id: &str,
        description: &str,
        category: ProductCategory,
        prices: &[(&str, f64)],
    ) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            category,
            pricing: SkuPricing::Regional(
                prices
                    .iter()
                    .map(|(region, price)| (region.to_string(), *price))
                    .collect(),
            ),
            free_quota: None,
            fixed_price: false,
        }
    }

    pub fn tiered(
        id: &str,
        description: &str,
        category: ProductCategory,
        table: TierTable,
    ) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            category,
            pricing: SkuPricing::Tiered(table),
            free_quota: None,
            fixed_price: false,
        }
    }

    pub fn with_free_quota(mut self, quota: f64) -> Self {
        self.free_quota = Some(quota);
        self
    }

    pub fn with_fixed_price(mut self) -> Self {
        self.fixed_price = true;
        self
    }

    /// Unit price in `region`. Tiered skus have no single unit price.
    pub fn unit_price(&self, region: &str) -> Result<f64> {
        match &self.pricing {
            SkuPricing::Regional(prices) => {
                prices
                    .get(region)
                    .copied()
                    .ok_or_else(|| SizerError::PriceUnavailable {
                        sku: self.id.clone(),
                        region: region.to_string(),
                    })
            }
            SkuPricing::Tiered(_) => Err(SizerError::PriceUnavailable {
                sku: self.id.clone(),
                region: region.to_string(),
            }),
        }
    }

    pub fn is_preemptible(&self) -> bool {
        self.description.to_lowercase().starts_with("preemptible")
    }
}

/// Role a sku plays for a given machine family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SkuRole {
    Cpu,
    Ram,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifiedSku<'a> {
    pub sku: &'a BillingSku,
    pub role: SkuRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineType {
    pub family: String,
    pub series: String,
    pub type_name: String,
    pub vcpu: u32,
    pub memory_gb: f64,
    #[serde(default)]
    pub gpu_count: u32,
    #[serde(default)]
    pub is_custom: bool,
}

impl MachineType {
    pub fn predefined(
        family: &str,
        series: &str,
        type_name: &str,
        vcpu: u32,
        memory_gb: f64,
    ) -> Self {
        Self {
            family: family.to_uppercase(),
            series: series.to_string(),
            type_name: type_name.to_string(),
            vcpu,
            memory_gb,
            gpu_count: 0,
            is_custom: false,
        }
    }

    pub fn custom(family: &str, vcpu: u32, memory_gb: f64) -> Self {
        let family = family.to_uppercase();
        let memory_mb = (memory_gb * 1024.0).round() as u64;
        Self {
            type_name: format!("{}-custom-{}-{}", family.to_lowercase(), vcpu, memory_mb),
            series: "custom".to_string(),
            family,
            vcpu,
            memory_gb,
            gpu_count: 0,
            is_custom: true,
        }
    }
}

/// Usage profile of a compute line item: `quantity` counts cores or GB,
/// `hours` is the monthly runtime of each unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceUsage {
    pub family: String,
    pub hours: f64,
    pub preemptible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineItemRequest {
    pub sku: BillingSku,
    pub quantity: f64,
    pub region: String,
    pub depends_on_sku: Option<String>,
    pub usage: Option<InstanceUsage>,
}

impl LineItemRequest {
    pub fn new(sku: BillingSku, quantity: f64, region: &str) -> Self {
        Self {
            sku,
            quantity,
            region: region.to_string(),
            depends_on_sku: None,
            usage: None,
        }
    }

    pub fn depends_on(mut self, sku_id: &str) -> Self {
        self.depends_on_sku = Some(sku_id.to_string());
        self
    }

    pub fn with_usage(mut self, usage: InstanceUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLineItem {
    pub sku: BillingSku,
    pub quantity: f64,
    pub region: String,
    pub depends_on_sku: Option<String>,
    pub category: ProductCategory,
    pub usage: Option<InstanceUsage>,
    pub(crate) price: f64,
}

impl CartLineItem {
    /// Price from the last recompute.
    pub fn price(&self) -> f64 {
        self.price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_table_rejects_non_ascending() {
        let tiers = vec![
            Tier { threshold: 500.0, rate: 0.02 },
            Tier { threshold: 100.0, rate: 0.01 },
        ];
        assert!(matches!(
            TierTable::new(tiers),
            Err(SizerError::MalformedTiers { .. })
        ));
        assert!(TierTable::new(Vec::new()).is_err());
    }

    #[test]
    fn test_tier_table_deserialize_validates() {
        let bad = r#"[{"threshold": 10, "rate": 1.0}, {"threshold": 10, "rate": 0.5}]"#;
        assert!(serde_json::from_str::<TierTable>(bad).is_err());

        let good = r#"[{"threshold": 10, "rate": 1.0}, {"threshold": 20, "rate": 0.5}]"#;
        let table: TierTable = serde_json::from_str(good).unwrap();
        assert_eq!(table.overflow_rate(), 0.5);
    }

    #[test]
    fn test_sustained_use_tier_set_bounds() {
        assert!(SustainedUseTierSet::from_pairs(&[(0.5, 1.0), (1.0, 0.8)]).is_ok());
        assert!(SustainedUseTierSet::from_pairs(&[(0.0, 1.0)]).is_err());
        assert!(SustainedUseTierSet::from_pairs(&[(0.5, 1.0), (1.2, 0.8)]).is_err());
        assert!(SustainedUseTierSet::from_pairs(&[(0.5, 1.0), (0.5, 0.8)]).is_err());
    }

    #[test]
    fn test_product_category_round_trip_tag() {
        assert_eq!(
            "forwarding_rule".parse::<ProductCategory>().unwrap(),
            ProductCategory::ForwardingRule
        );
        assert_eq!(ProductCategory::MlTraining.to_string(), "ml-training");
        assert!("bogus".parse::<ProductCategory>().is_err());
    }

    #[test]
    fn test_unit_price_missing_region_is_explicit() {
        let sku = BillingSku::regional(
            "CPU-1",
            "N1 Predefined Instance Core running in Americas",
            ProductCategory::ComputeInstance,
            &[("us-central1", 0.031611)],
        );
        assert_eq!(sku.unit_price("us-central1").unwrap(), 0.031611);
        assert!(matches!(
            sku.unit_price("europe-west1"),
            Err(SizerError::PriceUnavailable { .. })
        ));
    }

    #[test]
    fn test_custom_machine_type_name() {
        let machine = MachineType::custom("n2", 4, 16.0);
        assert_eq!(machine.family, "N2");
        assert_eq!(machine.type_name, "n2-custom-4-16384");
        assert!(machine.is_custom);
    }
}
