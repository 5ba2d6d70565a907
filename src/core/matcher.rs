//! Picks the machine shape that covers a recommendation.

use crate::domain::model::MachineType;
use std::cmp::Ordering;

/// Custom machine memory is sold in 256 MB steps.
const CUSTOM_MEMORY_STEP_GB: f64 = 0.25;

/// Smallest catalog shape (fewest vCPU, then least memory) covering the
/// requested vCPU and memory, optionally restricted to one family.
pub fn best_fit<'a>(
    catalog: &'a [MachineType],
    vcpu: f64,
    memory_gb: f64,
    family: Option<&str>,
) -> Option<&'a MachineType> {
    catalog
        .iter()
        .filter(|machine| family.map_or(true, |f| machine.family.eq_ignore_ascii_case(f)))
        .filter(|machine| machine.vcpu as f64 >= vcpu && machine.memory_gb >= memory_gb)
        .min_by(|a, b| {
            a.vcpu.cmp(&b.vcpu).then_with(|| {
                a.memory_gb
                    .partial_cmp(&b.memory_gb)
                    .unwrap_or(Ordering::Equal)
            })
        })
}

/// Catalog fit, or a custom shape of `family` sized to the request.
pub fn fit_or_custom(
    catalog: &[MachineType],
    vcpu: f64,
    memory_gb: f64,
    family: &str,
) -> MachineType {
    if let Some(machine) = best_fit(catalog, vcpu, memory_gb, Some(family)) {
        return machine.clone();
    }
    let cores = (vcpu.ceil().max(1.0)) as u32;
    let memory = (memory_gb / CUSTOM_MEMORY_STEP_GB).ceil() * CUSTOM_MEMORY_STEP_GB;
    tracing::debug!(
        "No {} catalog shape covers {} vCPU / {} GB, using custom {}c/{}GB",
        family,
        vcpu,
        memory_gb,
        cores,
        memory
    );
    MachineType::custom(family, cores, memory)
}
