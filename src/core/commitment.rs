//! Committed-use (1- and 3-year) hourly pricing.

use crate::core::tiers::SustainedUseTables;
use crate::utils::error::{Result, SizerError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Families eligible for the CPU-overcommit premium.
const OVERCOMMIT_FAMILIES: &[&str] = &["N1", "N2"];
/// Families that always carry the memory-optimized premium.
const MEMORY_OPTIMIZED_FAMILIES: &[&str] = &["M2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitmentTerm {
    OneYear,
    ThreeYear,
}

impl CommitmentTerm {
    pub fn from_years(years: u32) -> Result<Self> {
        match years {
            1 => Ok(CommitmentTerm::OneYear),
            3 => Ok(CommitmentTerm::ThreeYear),
            other => Err(SizerError::ValidationError {
                message: format!("commitment term must be 1 or 3 years, got {}", other),
            }),
        }
    }

    pub fn years(&self) -> u32 {
        match self {
            CommitmentTerm::OneYear => 1,
            CommitmentTerm::ThreeYear => 3,
        }
    }
}

impl fmt::Display for CommitmentTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}y", self.years())
    }
}

impl FromStr for CommitmentTerm {
    type Err = SizerError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_end_matches(|c: char| c.eq_ignore_ascii_case(&'y'));
        let years = trimmed.parse::<u32>().map_err(|_| SizerError::ParseError {
            input: s.to_string(),
            reason: "expected 1, 3, 1y or 3y".to_string(),
        })?;
        Self::from_years(years)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoreRamRate {
    pub cpu: f64,
    pub ram: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TermRate {
    pub one_year: f64,
    pub three_year: f64,
}

impl TermRate {
    pub fn for_term(&self, term: CommitmentTerm) -> f64 {
        match term {
            CommitmentTerm::OneYear => self.one_year,
            CommitmentTerm::ThreeYear => self.three_year,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyCommitmentRates {
    pub on_demand: CoreRamRate,
    pub one_year: CoreRamRate,
    pub three_year: CoreRamRate,
    /// Committed rate for memory above `max_ram_per_core`.
    #[serde(default)]
    pub extended_ram: Option<TermRate>,
    #[serde(default)]
    pub max_ram_per_core: Option<f64>,
    /// Flat per-instance rate of shared-core families.
    #[serde(default)]
    pub shared_core: Option<TermRate>,
}

impl FamilyCommitmentRates {
    fn standard(on_demand: (f64, f64), one_year: (f64, f64), three_year: (f64, f64)) -> Self {
        Self {
            on_demand: CoreRamRate { cpu: on_demand.0, ram: on_demand.1 },
            one_year: CoreRamRate { cpu: one_year.0, ram: one_year.1 },
            three_year: CoreRamRate { cpu: three_year.0, ram: three_year.1 },
            extended_ram: None,
            max_ram_per_core: None,
            shared_core: None,
        }
    }

    fn with_extended(mut self, max_ram_per_core: f64, extended: Option<f64>) -> Self {
        self.max_ram_per_core = Some(max_ram_per_core);
        self.extended_ram = extended.map(|rate| TermRate { one_year: rate, three_year: rate });
        self
    }

    fn shared(on_demand: f64, one_year: f64, three_year: f64) -> Self {
        Self {
            shared_core: Some(TermRate { one_year, three_year }),
            ..Self::standard((on_demand, 0.0), (one_year, 0.0), (three_year, 0.0))
        }
    }

    pub fn committed(&self, term: CommitmentTerm) -> CoreRamRate {
        match term {
            CommitmentTerm::OneYear => self.one_year,
            CommitmentTerm::ThreeYear => self.three_year,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitmentRates {
    /// Price multiplier per region relative to the base rates.
    pub region_multipliers: HashMap<String, f64>,
    pub families: HashMap<String, FamilyCommitmentRates>,
}

impl Default for CommitmentRates {
    fn default() -> Self {
        let region_multipliers = [
            ("us-central1", 1.0),
            ("us-east1", 1.0),
            ("europe-west1", 1.1),
            ("asia-east1", 1.16),
        ]
        .into_iter()
        .map(|(region, multiplier)| (region.to_string(), multiplier))
        .collect();

        let families = [
            (
                "N1",
                FamilyCommitmentRates::standard(
                    (0.031611, 0.004237),
                    (0.019915, 0.002669),
                    (0.014225, 0.001907),
                )
                .with_extended(6.5, Some(0.00955)),
            ),
            (
                "N2",
                FamilyCommitmentRates::standard(
                    (0.031611, 0.004237),
                    (0.019915, 0.002669),
                    (0.014225, 0.001907),
                )
                .with_extended(8.0, Some(0.00955)),
            ),
            (
                "N2D",
                FamilyCommitmentRates::standard(
                    (0.027502, 0.003686),
                    (0.017326, 0.002322),
                    (0.012376, 0.001659),
                )
                .with_extended(8.0, Some(0.008308)),
            ),
            (
                "E2",
                FamilyCommitmentRates::standard(
                    (0.021811, 0.002923),
                    (0.013741, 0.001842),
                    (0.009815, 0.001316),
                )
                .with_extended(8.0, None),
            ),
            (
                "C2",
                FamilyCommitmentRates::standard(
                    (0.03398, 0.00455),
                    (0.0214, 0.00287),
                    (0.0153, 0.00205),
                ),
            ),
            (
                "M1",
                FamilyCommitmentRates::standard(
                    (0.0348, 0.0051),
                    (0.0204, 0.003),
                    (0.0104, 0.0015),
                ),
            ),
            (
                "M2",
                FamilyCommitmentRates::standard(
                    (0.0348, 0.0051),
                    (0.0204, 0.003),
                    (0.0104, 0.0015),
                ),
            ),
            ("F1", FamilyCommitmentRates::shared(0.0076, 0.0048, 0.0034)),
            ("G1", FamilyCommitmentRates::shared(0.0257, 0.0162, 0.0116)),
        ]
        .into_iter()
        .map(|(family, rates)| (family.to_string(), rates))
        .collect();

        Self {
            region_multipliers,
            families,
        }
    }
}

/// Premium percentages applied on top of committed pricing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PremiumRates {
    pub sole_tenancy: f64,
    pub cpu_overcommit: f64,
    pub memory_optimized: f64,
}

impl Default for PremiumRates {
    fn default() -> Self {
        Self {
            sole_tenancy: 0.10,
            cpu_overcommit: 0.25,
            memory_optimized: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CommitmentOptions {
    pub sole_tenancy: bool,
    pub cpu_overcommit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommittedPrice {
    pub family: String,
    pub term: CommitmentTerm,
    pub region: String,
    /// Committed core and RAM cost before premiums.
    pub committed_hourly: f64,
    pub premiums_hourly: f64,
    pub hourly: f64,
    pub extended_ram_gb: f64,
}

impl CommittedPrice {
    pub fn monthly(&self) -> f64 {
        self.hourly * crate::core::tiers::HOURS_PER_MONTH
    }
}

pub struct CommitmentPricer {
    rates: CommitmentRates,
    premiums: PremiumRates,
    sustained_use: SustainedUseTables,
}

impl CommitmentPricer {
    pub fn new(
        rates: CommitmentRates,
        premiums: PremiumRates,
        sustained_use: SustainedUseTables,
    ) -> Self {
        Self {
            rates,
            premiums,
            sustained_use,
        }
    }

    pub fn price_committed(
        &self,
        cores: u32,
        ram_gb: f64,
        family: &str,
        term: CommitmentTerm,
        region: &str,
        options: CommitmentOptions,
    ) -> Result<CommittedPrice> {
        let family_key = family.to_uppercase();
        let rates = self
            .rates
            .families
            .get(&family_key)
            .ok_or_else(|| SizerError::UnknownFamily {
                family: family.to_string(),
            })?;
        let multiplier = self
            .rates
            .region_multipliers
            .get(region)
            .copied()
            .ok_or_else(|| SizerError::PriceUnavailable {
                sku: format!("{} {} commitment", family_key, term),
                region: region.to_string(),
            })?;

        if let Some(shared) = &rates.shared_core {
            let hourly = shared.for_term(term) * multiplier;
            if options.sole_tenancy || options.cpu_overcommit {
                tracing::debug!("Premiums do not apply to shared-core family {}", family_key);
            }
            return Ok(CommittedPrice {
                family: family_key,
                term,
                region: region.to_string(),
                committed_hourly: hourly,
                premiums_hourly: 0.0,
                hourly,
                extended_ram_gb: 0.0,
            });
        }

        let cores_f = cores as f64;
        let extended_ram_gb = rates
            .max_ram_per_core
            .map(|ratio| (ram_gb - cores_f * ratio).max(0.0))
            .unwrap_or(0.0);
        let standard_ram_gb = ram_gb - extended_ram_gb;

        let committed = rates.committed(term);
        let mut committed_hourly = cores_f * committed.cpu + standard_ram_gb * committed.ram;
        if extended_ram_gb > 0.0 {
            let extended = rates.extended_ram.ok_or_else(|| SizerError::PriceUnavailable {
                sku: format!("{} extended memory {} commitment", family_key, term),
                region: region.to_string(),
            })?;
            committed_hourly += extended_ram_gb * extended.for_term(term);
        }
        committed_hourly *= multiplier;

        let mut premium_share = 0.0;
        if options.sole_tenancy {
            premium_share += self.premiums.sole_tenancy;
        }
        if options.cpu_overcommit {
            if OVERCOMMIT_FAMILIES.contains(&family_key.as_str()) {
                premium_share += self.premiums.cpu_overcommit;
            } else {
                tracing::debug!("CPU overcommit is not offered for family {}", family_key);
            }
        }
        if MEMORY_OPTIMIZED_FAMILIES.contains(&family_key.as_str()) {
            premium_share += self.premiums.memory_optimized;
        }

        let premiums_hourly = if premium_share > 0.0 {
            let base_hourly =
                (cores_f * rates.on_demand.cpu + ram_gb * rates.on_demand.ram) * multiplier;
            base_hourly * premium_share * self.sustained_use.max_sud_for_series(&family_key)?
        } else {
            0.0
        };

        tracing::debug!(
            "{} {}c/{}GB {} in {}: committed {:.6}/h, premiums {:.6}/h",
            family_key,
            cores,
            ram_gb,
            term,
            region,
            committed_hourly,
            premiums_hourly
        );

        Ok(CommittedPrice {
            family: family_key,
            term,
            region: region.to_string(),
            committed_hourly,
            premiums_hourly,
            hourly: committed_hourly + premiums_hourly,
            extended_ram_gb,
        })
    }
}

impl Default for CommitmentPricer {
    fn default() -> Self {
        Self::new(
            CommitmentRates::default(),
            PremiumRates::default(),
            SustainedUseTables::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_one_year_n1() {
        let pricer = CommitmentPricer::default();
        let price = pricer
            .price_committed(
                4,
                15.0,
                "n1",
                CommitmentTerm::OneYear,
                "us-central1",
                CommitmentOptions::default(),
            )
            .unwrap();
        assert!(close(price.hourly, 4.0 * 0.019915 + 15.0 * 0.002669));
        assert_eq!(price.premiums_hourly, 0.0);
        assert_eq!(price.extended_ram_gb, 0.0);
    }

    #[test]
    fn test_extended_memory_billed_separately() {
        let pricer = CommitmentPricer::default();
        let price = pricer
            .price_committed(
                2,
                20.0,
                "N1",
                CommitmentTerm::OneYear,
                "us-central1",
                CommitmentOptions::default(),
            )
            .unwrap();
        assert!(close(price.extended_ram_gb, 7.0));
        let expected = 2.0 * 0.019915 + 13.0 * 0.002669 + 7.0 * 0.00955;
        assert!(close(price.hourly, expected));
    }

    #[test]
    fn test_sole_tenancy_premium_scaled_by_max_sud() {
        let pricer = CommitmentPricer::default();
        let options = CommitmentOptions {
            sole_tenancy: true,
            cpu_overcommit: false,
        };
        let price = pricer
            .price_committed(4, 15.0, "N1", CommitmentTerm::ThreeYear, "us-central1", options)
            .unwrap();
        let base = 4.0 * 0.031611 + 15.0 * 0.004237;
        assert!(close(price.premiums_hourly, base * 0.10 * 0.7));
        assert!(close(price.committed_hourly, 4.0 * 0.014225 + 15.0 * 0.001907));
    }

    #[test]
    fn test_overcommit_only_for_n1_n2() {
        let pricer = CommitmentPricer::default();
        let options = CommitmentOptions {
            sole_tenancy: false,
            cpu_overcommit: true,
        };
        let n2 = pricer
            .price_committed(2, 8.0, "N2", CommitmentTerm::OneYear, "us-central1", options)
            .unwrap();
        assert!(n2.premiums_hourly > 0.0);

        let e2 = pricer
            .price_committed(2, 8.0, "E2", CommitmentTerm::OneYear, "us-central1", options)
            .unwrap();
        assert_eq!(e2.premiums_hourly, 0.0);
    }

    #[test]
    fn test_m2_memory_optimized_premium() {
        let pricer = CommitmentPricer::default();
        let price = pricer
            .price_committed(
                208,
                5888.0,
                "M2",
                CommitmentTerm::OneYear,
                "us-central1",
                CommitmentOptions::default(),
            )
            .unwrap();
        let base = 208.0 * 0.0348 + 5888.0 * 0.0051;
        let max_sud = (1.0 + 0.8678 + 0.7357 + 0.6035) * 0.25;
        assert!(close(price.premiums_hourly, base * 0.05 * max_sud));
    }

    #[test]
    fn test_shared_core_flat_rate() {
        let pricer = CommitmentPricer::default();
        let price = pricer
            .price_committed(
                1,
                0.6,
                "F1",
                CommitmentTerm::ThreeYear,
                "us-central1",
                CommitmentOptions::default(),
            )
            .unwrap();
        assert!(close(price.hourly, 0.0034));
    }

    #[test]
    fn test_region_multiplier_and_missing_region() {
        let pricer = CommitmentPricer::default();
        let base = pricer
            .price_committed(
                4,
                16.0,
                "N2",
                CommitmentTerm::OneYear,
                "us-central1",
                CommitmentOptions::default(),
            )
            .unwrap();
        let eu = pricer
            .price_committed(
                4,
                16.0,
                "N2",
                CommitmentTerm::OneYear,
                "europe-west1",
                CommitmentOptions::default(),
            )
            .unwrap();
        assert!(close(eu.hourly, base.hourly * 1.1));

        assert!(matches!(
            pricer.price_committed(
                4,
                16.0,
                "N2",
                CommitmentTerm::OneYear,
                "moon-base1",
                CommitmentOptions::default(),
            ),
            Err(SizerError::PriceUnavailable { .. })
        ));
        assert!(matches!(
            pricer.price_committed(
                4,
                16.0,
                "Z9",
                CommitmentTerm::OneYear,
                "us-central1",
                CommitmentOptions::default(),
            ),
            Err(SizerError::UnknownFamily { .. })
        ));
    }

    #[test]
    fn test_term_parsing() {
        assert_eq!("1y".parse::<CommitmentTerm>().unwrap(), CommitmentTerm::OneYear);
        assert_eq!("3".parse::<CommitmentTerm>().unwrap(), CommitmentTerm::ThreeYear);
        assert!("2".parse::<CommitmentTerm>().is_err());
        assert!("forever".parse::<CommitmentTerm>().is_err());
    }
}
