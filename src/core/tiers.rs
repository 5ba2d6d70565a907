//! Block-rate tiered pricing and sustained-use discount blending.

use crate::domain::model::{SustainedUseTierSet, Tier, TierTable};
use crate::utils::error::{Result, SizerError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Hours billed in a 30-day (730h) or 31-day (744h) month.
pub const HOURS_PER_MONTH: f64 = 730.0;
pub const HOURS_PER_LONG_MONTH: f64 = 744.0;

/// Prices `quantity` against a validated block-rate table.
///
/// Each tier charges its `rate` for the span between the previous threshold
/// and its own. Quantity past the final threshold is charged at the final
/// tier's rate.
pub fn price_tiered(table: &TierTable, quantity: f64) -> f64 {
    let mut remaining = quantity.max(0.0);
    let mut last_level = 0.0;
    let mut total = 0.0;

    for tier in table.tiers() {
        if remaining <= 0.0 {
            break;
        }
        let span = tier.threshold - last_level;
        let consumed = remaining.min(span);
        total += consumed * tier.rate;
        remaining -= consumed;
        last_level = tier.threshold;
    }

    if remaining > 0.0 {
        total += remaining * table.overflow_rate();
    }
    total
}

/// Validates `tiers` and prices `quantity` against them.
pub fn price_tiers(tiers: &[Tier], quantity: f64) -> Result<f64> {
    let table = TierTable::new(tiers.to_vec())?;
    Ok(price_tiered(&table, quantity))
}

/// Billing hours in the month `billable_hours` falls into.
pub fn billing_hours_in_month(billable_hours: f64) -> f64 {
    if billable_hours > HOURS_PER_MONTH {
        HOURS_PER_LONG_MONTH
    } else {
        HOURS_PER_MONTH
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SustainedUseBand {
    /// Cumulative usage fraction closing this band.
    pub level: f64,
    /// Fraction of the month consumed inside this band.
    pub usage_fraction: f64,
    pub discount_multiplier: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SustainedUsePrice {
    pub total_price: f64,
    pub cumulative_discount: f64,
    pub effective_rate: f64,
    pub breakdown: Vec<SustainedUseBand>,
}

/// Blends a unit price over a month of usage with sustained-use tiers.
///
/// Usage beyond the last tier's fraction is charged at the last multiplier.
pub fn price_sustained_use(
    unit_price: f64,
    billable_hours: f64,
    tier_set: &SustainedUseTierSet,
    total_billing_hours_in_month: f64,
) -> SustainedUsePrice {
    let mut percent_used = billable_hours.max(0.0) / total_billing_hours_in_month;
    let month_price = unit_price * total_billing_hours_in_month;
    let mut breakdown: Vec<SustainedUseBand> = Vec::new();
    let mut last_level = 0.0;

    for tier in tier_set.tiers() {
        if percent_used <= 0.0 {
            break;
        }
        let level = tier.cumulative_usage_fraction;
        let level_delta = level - last_level;
        let multiplier = tier.discount_multiplier;

        if percent_used - level_delta < 0.0 {
            breakdown.push(SustainedUseBand {
                level,
                usage_fraction: percent_used,
                discount_multiplier: multiplier,
                price: percent_used * month_price * multiplier,
            });
            percent_used = 0.0;
            break;
        }

        breakdown.push(SustainedUseBand {
            level,
            usage_fraction: level_delta,
            discount_multiplier: multiplier,
            price: level_delta * month_price * multiplier,
        });
        percent_used -= level_delta;
        last_level = level;
    }

    if percent_used > 0.0 {
        if let Some(last) = breakdown.last_mut() {
            let extra = percent_used * month_price * last.discount_multiplier;
            last.usage_fraction += percent_used;
            last.price += extra;
        }
    }

    let total_price: f64 = breakdown.iter().map(|band| band.price).sum();
    let normal_price = unit_price * billable_hours;
    let (cumulative_discount, effective_rate) = if normal_price > 0.0 {
        (1.0 - total_price / normal_price, total_price / billable_hours)
    } else {
        (0.0, 0.0)
    };

    SustainedUsePrice {
        total_price,
        cumulative_discount,
        effective_rate,
        breakdown,
    }
}

/// Flat price for preemptible capacity; no sustained-use discount applies.
pub fn price_preemptible(unit_price: f64, billable_hours: f64) -> SustainedUsePrice {
    let total_price = unit_price * billable_hours.max(0.0);
    SustainedUsePrice {
        total_price,
        cumulative_discount: 0.0,
        effective_rate: if billable_hours > 0.0 { unit_price } else { 0.0 },
        breakdown: Vec::new(),
    }
}

/// Sustained-use tier sets keyed by uppercase family name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SustainedUseTables {
    /// Width of a standard sustained-use band as a fraction of the month.
    pub base_percentage: f64,
    pub families: HashMap<String, SustainedUseTierSet>,
}

impl SustainedUseTables {
    pub fn tier_set(&self, family: &str) -> Result<&SustainedUseTierSet> {
        self.families
            .get(&family.to_uppercase())
            .ok_or_else(|| SizerError::UnknownFamily {
                family: family.to_string(),
            })
    }

    /// Ceiling discount factor of a family: the sum of its tier multipliers
    /// scaled by the base percentage.
    pub fn max_sud_for_series(&self, family: &str) -> Result<f64> {
        let tiers = self.tier_set(family)?;
        let sum: f64 = tiers.tiers().iter().map(|t| t.discount_multiplier).sum();
        Ok(sum * self.base_percentage)
    }

    /// Prices a unit over `billable_hours`, or flat when `preemptible`.
    pub fn price(
        &self,
        family: &str,
        unit_price: f64,
        billable_hours: f64,
        preemptible: bool,
    ) -> Result<SustainedUsePrice> {
        if preemptible {
            return Ok(price_preemptible(unit_price, billable_hours));
        }
        let tier_set = self.tier_set(family)?;
        Ok(price_sustained_use(
            unit_price,
            billable_hours,
            tier_set,
            billing_hours_in_month(billable_hours),
        ))
    }
}

impl Default for SustainedUseTables {
    fn default() -> Self {
        let classic = [(0.25, 1.0), (0.5, 0.8), (0.75, 0.6), (1.0, 0.4)];
        let second_gen = [(0.25, 1.0), (0.5, 0.8678), (0.75, 0.7357), (1.0, 0.6035)];
        let none = [(1.0, 1.0)];

        let mut families = HashMap::new();
        for (family, pairs) in [
            ("N1", &classic[..]),
            ("F1", &classic[..]),
            ("G1", &classic[..]),
            ("N2", &second_gen[..]),
            ("N2D", &second_gen[..]),
            ("C2", &second_gen[..]),
            ("M1", &second_gen[..]),
            ("M2", &second_gen[..]),
            ("E2", &none[..]),
        ] {
            if let Ok(set) = SustainedUseTierSet::from_pairs(pairs) {
                families.insert(family.to_string(), set);
            }
        }

        Self {
            base_percentage: 0.25,
            families,
        }
    }
}
