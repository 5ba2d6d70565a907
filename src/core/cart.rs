//! Cart of priced line items.
//!
//! The ledger keeps `total_price` equal to the sum of item prices by only
//! ever adjusting it incrementally: an item's old price is subtracted before
//! its recomputed price is added. Item prices are always produced by the
//! pricing strategy registered for the sku's [`ProductCategory`].

use crate::core::tiers::{price_tiered, SustainedUseTables};
use crate::domain::model::{
    BillingSku, CartLineItem, InstanceUsage, LineItemRequest, ProductCategory, SkuPricing,
};
use crate::utils::error::{Result, SizerError};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Everything a strategy needs to price one line item.
pub struct PricingRequest<'a> {
    pub sku: &'a BillingSku,
    pub quantity: f64,
    pub region: &'a str,
    /// Free quota still available to this item after dependencies.
    pub free_quota: f64,
    pub usage: Option<&'a InstanceUsage>,
    pub sustained_use: &'a SustainedUseTables,
}

impl PricingRequest<'_> {
    fn billable_quantity(&self) -> f64 {
        (self.quantity - self.free_quota).max(0.0)
    }
}

pub type PricingStrategy = fn(&PricingRequest<'_>) -> Result<f64>;

/// Unit price times billable quantity, or the block-rate table for tiered skus.
pub fn per_unit(request: &PricingRequest<'_>) -> Result<f64> {
    if request.sku.fixed_price {
        return fixed_entry(request);
    }
    let billable = request.billable_quantity();
    match &request.sku.pricing {
        SkuPricing::Regional(_) => Ok(request.sku.unit_price(request.region)? * billable),
        SkuPricing::Tiered(table) => Ok(price_tiered(table, billable)),
    }
}

/// One charge per line item regardless of quantity.
pub fn fixed_entry(request: &PricingRequest<'_>) -> Result<f64> {
    if request.quantity <= 0.0 {
        return Ok(0.0);
    }
    match &request.sku.pricing {
        SkuPricing::Regional(_) => request.sku.unit_price(request.region),
        SkuPricing::Tiered(table) => Ok(price_tiered(table, 1.0)),
    }
}

/// Per-unit monthly price with sustained-use blending over the item's hours.
pub fn sustained_use(request: &PricingRequest<'_>) -> Result<f64> {
    let Some(usage) = request.usage else {
        return per_unit(request);
    };
    let unit_price = request.sku.unit_price(request.region)?;
    let monthly = request.sustained_use.price(
        &usage.family,
        unit_price,
        usage.hours,
        usage.preemptible,
    )?;
    Ok(monthly.total_price * request.billable_quantity())
}

/// Maps product categories to pricing strategies.
#[derive(Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<ProductCategory, PricingStrategy>,
    fallback: PricingStrategy,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        let mut registry = Self {
            strategies: HashMap::new(),
            fallback: per_unit,
        };
        registry.register(ProductCategory::ComputeInstance, sustained_use);
        registry.register(ProductCategory::ForwardingRule, fixed_entry);
        registry.register(ProductCategory::Support, fixed_entry);
        registry
    }
}

impl StrategyRegistry {
    pub fn register(&mut self, category: ProductCategory, strategy: PricingStrategy) {
        self.strategies.insert(category, strategy);
    }

    pub fn strategy_for(&self, category: ProductCategory) -> PricingStrategy {
        self.strategies
            .get(&category)
            .copied()
            .unwrap_or(self.fallback)
    }
}

#[derive(Debug, Clone)]
pub struct LedgerSettings {
    /// Most units a single forwarding-rule item may hold.
    pub forwarding_rule_cap: f64,
    /// Categories billed per entry; never merged into an existing item.
    pub never_merge: HashSet<ProductCategory>,
    /// Per-unit sku charged for forwarding rules past the cap.
    pub extra_forwarding_rule_sku: Option<BillingSku>,
    pub sustained_use: SustainedUseTables,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            forwarding_rule_cap: 5.0,
            never_merge: [
                ProductCategory::CommittedUse,
                ProductCategory::Support,
                ProductCategory::MlTraining,
            ]
            .into_iter()
            .collect(),
            extra_forwarding_rule_sku: None,
            sustained_use: SustainedUseTables::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSummary {
    pub sku: String,
    pub description: String,
    pub category: ProductCategory,
    pub region: String,
    pub quantity: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartSummary {
    pub total_price: f64,
    pub breakdown: Vec<LineSummary>,
}

pub struct CartLedger {
    items: Vec<CartLineItem>,
    total_price: f64,
    settings: LedgerSettings,
    strategies: StrategyRegistry,
}

impl Default for CartLedger {
    fn default() -> Self {
        Self::new(LedgerSettings::default())
    }
}

impl CartLedger {
    pub fn new(settings: LedgerSettings) -> Self {
        Self::with_strategies(settings, StrategyRegistry::default())
    }

    pub fn with_strategies(settings: LedgerSettings, strategies: StrategyRegistry) -> Self {
        Self {
            items: Vec::new(),
            total_price: 0.0,
            settings,
            strategies,
        }
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn total_price(&self) -> f64 {
        self.total_price
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Adds or merges a line item and returns the affected item's new price.
    pub fn add_line_item(&mut self, request: LineItemRequest) -> Result<f64> {
        let sku_id = request.sku.id.clone();
        let category = request.sku.category;

        let merge_target = if self.settings.never_merge.contains(&category) {
            None
        } else {
            self.items.iter().position(|item| {
                item.sku.id == request.sku.id
                    && item.region == request.region
                    && item.usage == request.usage
            })
        };

        let price = match merge_target {
            Some(index) => {
                let quantity = self.items[index].quantity + request.quantity;
                tracing::debug!(
                    "Merging {} into line item {} (quantity {})",
                    sku_id,
                    index,
                    quantity
                );
                self.set_quantity(index, quantity)?
            }
            None => self.push_item(request, category)?,
        };

        self.recalculate_dependents(&sku_id)?;
        Ok(price)
    }

    /// Removes the item at `index` and reprices items depending on its sku.
    pub fn remove(&mut self, index: usize) -> Result<CartLineItem> {
        if index >= self.items.len() {
            return Err(SizerError::LineItemNotFound { index });
        }
        let item = self.items.remove(index);
        self.total_price -= item.price;
        self.recalculate_dependents(&item.sku.id)?;
        Ok(item)
    }

    /// Reprices every item depending on `sku_id`, transitively.
    pub fn recalculate_dependents(&mut self, sku_id: &str) -> Result<()> {
        let mut pending = vec![sku_id.to_string()];
        let mut visited = HashSet::new();

        while let Some(parent) = pending.pop() {
            if !visited.insert(parent.clone()) {
                continue;
            }
            let dependents: Vec<usize> = self
                .items
                .iter()
                .enumerate()
                .filter(|(_, item)| item.depends_on_sku.as_deref() == Some(parent.as_str()))
                .map(|(index, _)| index)
                .collect();

            for index in dependents {
                let price = self.price_item(&self.items[index])?;
                self.replace_price(index, price);
                pending.push(self.items[index].sku.id.clone());
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> CartSummary {
        CartSummary {
            total_price: self.total_price,
            breakdown: self
                .items
                .iter()
                .map(|item| LineSummary {
                    sku: item.sku.id.clone(),
                    description: item.sku.description.clone(),
                    category: item.category,
                    region: item.region.clone(),
                    quantity: item.quantity,
                    price: item.price,
                })
                .collect(),
        }
    }

    fn push_item(&mut self, request: LineItemRequest, category: ProductCategory) -> Result<f64> {
        let (quantity, overflow) = self.split_cap(category, request.quantity);
        self.ensure_overflow_sku(overflow, &request.region)?;

        let mut item = CartLineItem {
            sku: request.sku,
            quantity,
            region: request.region,
            depends_on_sku: request.depends_on_sku,
            category,
            usage: request.usage,
            price: 0.0,
        };
        item.price = self.price_item(&item)?;
        let price = item.price;
        let region = item.region.clone();

        self.items.push(item);
        self.total_price += price;

        if overflow > 0.0 {
            self.add_overflow(overflow, &region)?;
        }
        Ok(price)
    }

    fn set_quantity(&mut self, index: usize, quantity: f64) -> Result<f64> {
        let category = self.items[index].category;
        let (quantity, overflow) = self.split_cap(category, quantity);
        let region = self.items[index].region.clone();
        self.ensure_overflow_sku(overflow, &region)?;

        let mut candidate = self.items[index].clone();
        candidate.quantity = quantity;
        let price = self.price_item(&candidate)?;

        self.items[index].quantity = quantity;
        self.replace_price(index, price);

        if overflow > 0.0 {
            self.add_overflow(overflow, &region)?;
        }
        Ok(price)
    }

    fn replace_price(&mut self, index: usize, price: f64) {
        self.total_price -= self.items[index].price;
        self.items[index].price = price;
        self.total_price += price;
    }

    fn split_cap(&self, category: ProductCategory, quantity: f64) -> (f64, f64) {
        let cap = self.settings.forwarding_rule_cap;
        if category == ProductCategory::ForwardingRule && quantity > cap {
            (cap, quantity - cap)
        } else {
            (quantity, 0.0)
        }
    }

    /// Fails when `overflow` units could not be priced on the extra sku.
    fn ensure_overflow_sku(&self, overflow: f64, region: &str) -> Result<()> {
        if overflow <= 0.0 {
            return Ok(());
        }
        let Some(extra) = &self.settings.extra_forwarding_rule_sku else {
            return Err(SizerError::PriceUnavailable {
                sku: ProductCategory::ForwardingRuleExtra.to_string(),
                region: region.to_string(),
            });
        };
        let candidate = CartLineItem {
            sku: extra.clone(),
            quantity: overflow,
            region: region.to_string(),
            depends_on_sku: None,
            category: extra.category,
            usage: None,
            price: 0.0,
        };
        self.price_item(&candidate).map(|_| ())
    }

    fn add_overflow(&mut self, overflow: f64, region: &str) -> Result<()> {
        let Some(extra) = self.settings.extra_forwarding_rule_sku.clone() else {
            return self.ensure_overflow_sku(overflow, region);
        };
        tracing::debug!("Forwarding rules over cap, adding {} extra to {}", overflow, extra.id);
        self.add_line_item(LineItemRequest::new(extra, overflow, region))?;
        Ok(())
    }

    fn free_quota_for(&self, item: &CartLineItem) -> f64 {
        let quota = item.sku.free_quota.unwrap_or(0.0);
        match &item.depends_on_sku {
            Some(parent) => {
                let consumed: f64 = self
                    .items
                    .iter()
                    .filter(|other| &other.sku.id == parent)
                    .map(|other| other.quantity)
                    .sum();
                (quota - consumed).max(0.0)
            }
            None => quota,
        }
    }

    fn price_item(&self, item: &CartLineItem) -> Result<f64> {
        let request = PricingRequest {
            sku: &item.sku,
            quantity: item.quantity,
            region: &item.region,
            free_quota: self.free_quota_for(item),
            usage: item.usage.as_ref(),
            sustained_use: &self.settings.sustained_use,
        };
        let strategy = self.strategies.strategy_for(item.category);
        strategy(&request)
    }
}

/// Ledger handle that serializes mutations from concurrent callers.
#[derive(Clone, Default)]
pub struct SharedLedger {
    inner: Arc<Mutex<CartLedger>>,
}

impl SharedLedger {
    pub fn new(ledger: CartLedger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    pub fn with<T>(&self, f: impl FnOnce(&mut CartLedger) -> Result<T>) -> Result<T> {
        let mut ledger = self.inner.lock().map_err(|_| SizerError::StatePoisoned)?;
        f(&mut ledger)
    }

    pub fn add_line_item(&self, request: LineItemRequest) -> Result<f64> {
        self.with(|ledger| ledger.add_line_item(request))
    }

    pub fn remove(&self, index: usize) -> Result<CartLineItem> {
        self.with(|ledger| ledger.remove(index))
    }

    pub fn summary(&self) -> Result<CartSummary> {
        self.with(|ledger| Ok(ledger.summary()))
    }
}
