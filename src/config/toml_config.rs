use crate::core::cart::LedgerSettings;
use crate::core::commitment::{CommitmentPricer, CommitmentRates, PremiumRates};
use crate::core::tiers::SustainedUseTables;
use crate::domain::model::{BillingSku, ProductCategory};
use crate::utils::error::{Result, SizerError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SizerConfig {
    pub catalog: CatalogSettings,
    pub sustained_use: SustainedUseTables,
    pub commitment: CommitmentRates,
    pub premiums: PremiumRates,
    pub cart: CartSettings,
    pub custom: CustomSettings,
    pub store: StoreSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub endpoint: String,
    /// Billing service id; the default is Compute Engine.
    pub service_id: String,
    pub api_key: Option<String>,
    pub page_size: usize,
    pub max_pages: usize,
    pub timeout_seconds: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://cloudbilling.googleapis.com".to_string(),
            service_id: "6F81-5844-456A".to_string(),
            api_key: None,
            page_size: 5000,
            max_pages: 50,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CartSettings {
    pub forwarding_rule_cap: f64,
    pub never_merge: Vec<ProductCategory>,
    pub extra_forwarding_rule_sku: Option<BillingSku>,
}

impl Default for CartSettings {
    fn default() -> Self {
        let defaults = LedgerSettings::default();
        let mut never_merge: Vec<ProductCategory> = defaults.never_merge.into_iter().collect();
        never_merge.sort_by_key(|category| category.as_str());
        Self {
            forwarding_rule_cap: defaults.forwarding_rule_cap,
            never_merge,
            extra_forwarding_rule_sku: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomSettings {
    /// Identifier prefixes whose custom RAM token is already in GB.
    pub ram_in_gb_prefixes: Vec<String>,
}

impl Default for CustomSettings {
    fn default() -> Self {
        Self {
            ram_in_gb_prefixes: crate::core::custom::DEFAULT_GB_PREFIXES
                .iter()
                .map(|prefix| prefix.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: "./.gcp-sizer/geometry.json".to_string(),
        }
    }
}

impl SizerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SizerError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| SizerError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value, leaving unknown names as-is.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").expect("static pattern");

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("catalog.endpoint", &self.catalog.endpoint)?;
        validation::validate_non_empty_string("catalog.service_id", &self.catalog.service_id)?;
        validation::validate_positive_number("catalog.page_size", self.catalog.page_size, 1)?;
        validation::validate_positive_number("catalog.max_pages", self.catalog.max_pages, 1)?;
        validation::validate_non_empty_string("store.path", &self.store.path)?;

        let base = self.sustained_use.base_percentage;
        if !(base > 0.0 && base <= 1.0) {
            return Err(SizerError::InvalidConfigValueError {
                field: "sustained_use.base_percentage".to_string(),
                value: base.to_string(),
                reason: "Value must be within (0, 1]".to_string(),
            });
        }

        validation::validate_range("premiums.sole_tenancy", self.premiums.sole_tenancy, 0.0, 1.0)?;
        validation::validate_range(
            "premiums.cpu_overcommit",
            self.premiums.cpu_overcommit,
            0.0,
            1.0,
        )?;
        validation::validate_range(
            "premiums.memory_optimized",
            self.premiums.memory_optimized,
            0.0,
            1.0,
        )?;

        if self.cart.forwarding_rule_cap < 1.0 {
            return Err(SizerError::InvalidConfigValueError {
                field: "cart.forwarding_rule_cap".to_string(),
                value: self.cart.forwarding_rule_cap.to_string(),
                reason: "Value must be at least 1".to_string(),
            });
        }

        for (region, multiplier) in &self.commitment.region_multipliers {
            if *multiplier <= 0.0 {
                return Err(SizerError::InvalidConfigValueError {
                    field: format!("commitment.region_multipliers.{}", region),
                    value: multiplier.to_string(),
                    reason: "Multiplier must be positive".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            forwarding_rule_cap: self.cart.forwarding_rule_cap,
            never_merge: self.cart.never_merge.iter().copied().collect(),
            extra_forwarding_rule_sku: self.cart.extra_forwarding_rule_sku.clone(),
            sustained_use: self.sustained_use.clone(),
        }
    }

    pub fn commitment_pricer(&self) -> CommitmentPricer {
        CommitmentPricer::new(
            self.commitment.clone(),
            self.premiums,
            self.sustained_use.clone(),
        )
    }
}

impl Validate for SizerConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
