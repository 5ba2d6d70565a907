//! Monthly estimate for a single machine: classify the catalog for the
//! machine's family, pick the CPU and RAM skus, then price each unit with
//! sustained-use blending (flat for preemptible capacity).

use crate::core::classifier::SkuClassifier;
use crate::core::tiers::{SustainedUsePrice, SustainedUseTables};
use crate::domain::model::{
    BillingSku, ClassifiedSku, InstanceUsage, LineItemRequest, MachineType, SkuRole,
};
use crate::utils::error::{Result, SizerError};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct InstanceEstimate {
    pub machine: MachineType,
    pub region: String,
    pub hours: f64,
    pub preemptible: bool,
    pub cpu_sku: BillingSku,
    pub ram_sku: BillingSku,
    pub hourly_on_demand: f64,
    /// Monthly price of one vCPU.
    pub cpu_unit: SustainedUsePrice,
    /// Monthly price of one GB of memory.
    pub ram_unit: SustainedUsePrice,
    pub monthly_total: f64,
}

impl InstanceEstimate {
    /// Cart requests for the CPU and RAM parts of this machine.
    pub fn line_items(&self) -> Vec<LineItemRequest> {
        let usage = InstanceUsage {
            family: self.machine.family.clone(),
            hours: self.hours,
            preemptible: self.preemptible,
        };
        vec![
            LineItemRequest::new(self.cpu_sku.clone(), self.machine.vcpu as f64, &self.region)
                .with_usage(usage.clone()),
            LineItemRequest::new(self.ram_sku.clone(), self.machine.memory_gb, &self.region)
                .with_usage(usage),
        ]
    }
}

fn pick<'a>(
    classified: &[ClassifiedSku<'a>],
    role: SkuRole,
    preemptible: bool,
    region: &str,
) -> Option<&'a BillingSku> {
    let candidates: Vec<&'a BillingSku> = classified
        .iter()
        .filter(|c| c.role == role && c.sku.is_preemptible() == preemptible)
        .map(|c| c.sku)
        .filter(|sku| sku.unit_price(region).is_ok())
        .collect();

    let chosen = candidates.first().copied()?;
    if candidates.len() > 1 {
        tracing::warn!(
            "{} {:?} skus priced in {}; using {} ({})",
            candidates.len(),
            role,
            region,
            chosen.id,
            chosen.description
        );
    }
    Some(chosen)
}

pub fn estimate_instance(
    classifier: &SkuClassifier,
    sustained_use: &SustainedUseTables,
    machine: &MachineType,
    skus: &[BillingSku],
    region: &str,
    hours: f64,
    preemptible: bool,
) -> Result<InstanceEstimate> {
    if !classifier.knows(&machine.family) {
        return Err(SizerError::UnknownFamily {
            family: machine.family.clone(),
        });
    }

    let classified = classifier.classify(&machine.family, machine.is_custom, skus)?;
    let missing = |role: &str| SizerError::PriceUnavailable {
        sku: format!("{} {} {}", machine.family, machine.series, role),
        region: region.to_string(),
    };
    let cpu_sku =
        pick(&classified, SkuRole::Cpu, preemptible, region).ok_or_else(|| missing("CPU"))?;
    let ram_sku =
        pick(&classified, SkuRole::Ram, preemptible, region).ok_or_else(|| missing("RAM"))?;

    let cpu_price = cpu_sku.unit_price(region)?;
    let ram_price = ram_sku.unit_price(region)?;
    let vcpu = machine.vcpu as f64;

    let cpu_unit = sustained_use.price(&machine.family, cpu_price, hours, preemptible)?;
    let ram_unit = sustained_use.price(&machine.family, ram_price, hours, preemptible)?;
    let monthly_total = cpu_unit.total_price * vcpu + ram_unit.total_price * machine.memory_gb;

    tracing::info!(
        "{} in {}: {:.4}/month over {} hours",
        machine.type_name,
        region,
        monthly_total,
        hours
    );

    Ok(InstanceEstimate {
        machine: machine.clone(),
        region: region.to_string(),
        hours,
        preemptible,
        cpu_sku: cpu_sku.clone(),
        ram_sku: ram_sku.clone(),
        hourly_on_demand: cpu_price * vcpu + ram_price * machine.memory_gb,
        cpu_unit,
        ram_unit,
        monthly_total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cart::CartLedger;
    use crate::domain::model::ProductCategory;

    const REGION: &str = "us-central1";

    fn skus() -> Vec<BillingSku> {
        vec![
            sku("N1-CPU", "N1 Predefined Instance Core running in Americas", 0.031611),
            sku("N1-RAM", "N1 Predefined Instance Ram running in Americas", 0.004237),
            sku(
                "N1-PRE-CPU",
                "Preemptible N1 Predefined Instance Core running in Americas",
                0.00667,
            ),
            sku(
                "N1-PRE-RAM",
                "Preemptible N1 Predefined Instance Ram running in Americas",
                0.00089,
            ),
        ]
    }

    fn sku(id: &str, description: &str, price: f64) -> BillingSku {
        BillingSku::regional(
            id,
            description,
            ProductCategory::ComputeInstance,
            &[(REGION, price)],
        )
    }

    #[test]
    fn test_full_month_estimate() {
        let machine = MachineType::predefined("N1", "standard", "n1-standard-4", 4, 15.0);
        let estimate = estimate_instance(
            &SkuClassifier::new(),
            &SustainedUseTables::default(),
            &machine,
            &skus(),
            REGION,
            730.0,
            false,
        )
        .unwrap();

        assert_eq!(estimate.cpu_sku.id, "N1-CPU");
        assert_eq!(estimate.ram_sku.id, "N1-RAM");
        let hourly = 4.0 * 0.031611 + 15.0 * 0.004237;
        assert!((estimate.hourly_on_demand - hourly).abs() < 1e-9);
        assert!((estimate.monthly_total - hourly * 730.0 * 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_preemptible_estimate_is_flat() {
        let machine = MachineType::predefined("N1", "standard", "n1-standard-4", 4, 15.0);
        let estimate = estimate_instance(
            &SkuClassifier::new(),
            &SustainedUseTables::default(),
            &machine,
            &skus(),
            REGION,
            730.0,
            true,
        )
        .unwrap();
        assert_eq!(estimate.cpu_sku.id, "N1-PRE-CPU");
        let expected = (4.0 * 0.00667 + 15.0 * 0.00089) * 730.0;
        assert!((estimate.monthly_total - expected).abs() < 1e-9);
    }

    #[test]
    fn test_estimate_feeds_cart() {
        let machine = MachineType::predefined("N1", "standard", "n1-standard-4", 4, 15.0);
        let estimate = estimate_instance(
            &SkuClassifier::new(),
            &SustainedUseTables::default(),
            &machine,
            &skus(),
            REGION,
            365.0,
            false,
        )
        .unwrap();

        let mut ledger = CartLedger::default();
        for request in estimate.line_items() {
            ledger.add_line_item(request).unwrap();
        }
        assert!((ledger.total_price() - estimate.monthly_total).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_family_and_missing_region() {
        let classifier = SkuClassifier::new();
        let tables = SustainedUseTables::default();
        let machine = MachineType::predefined("Z9", "standard", "z9-standard-4", 4, 16.0);
        assert!(matches!(
            estimate_instance(&classifier, &tables, &machine, &skus(), REGION, 730.0, false),
            Err(SizerError::UnknownFamily { .. })
        ));

        let machine = MachineType::predefined("N1", "standard", "n1-standard-4", 4, 15.0);
        assert!(matches!(
            estimate_instance(&classifier, &tables, &machine, &skus(), "asia-east1", 730.0, false),
            Err(SizerError::PriceUnavailable { .. })
        ));
    }

    #[test]
    fn test_legacy_family_skips_other_families_skus() {
        let mut catalog = skus();
        catalog.push(sku("M1-CPU", "Memory-optimized Core running in Americas", 0.0348));
        catalog.push(sku("M1-RAM", "Memory-optimized Ram running in Americas", 0.0051));

        let machine = MachineType::predefined("M1", "megamem", "m1-megamem-96", 96, 1433.6);
        let estimate = estimate_instance(
            &SkuClassifier::new(),
            &SustainedUseTables::default(),
            &machine,
            &catalog,
            REGION,
            1.0,
            false,
        )
        .unwrap();

        assert_eq!(estimate.cpu_sku.id, "M1-CPU");
        assert_eq!(estimate.ram_sku.id, "M1-RAM");
    }
}
