//! Labels billing skus as CPU or RAM contributors for a machine family.
//!
//! Every family owns a standard rule pair and, optionally, a custom rule
//! pair; families without dedicated custom skus reuse the standard pair.
//! Rules are compiled once into case-insensitive regexes. Only compute
//! instance skus are considered, and a family whose rules are generic
//! suffixes never claims a sku that a specific family's rules match.

use crate::domain::model::{BillingSku, ClassifiedSku, ProductCategory, SkuRole};
use crate::utils::error::{Result, SizerError};
use regex::Regex;
use std::collections::HashMap;

/// How a rule matches a sku description.
#[derive(Debug, Clone, Copy)]
pub enum MatchRule {
    /// Description starts with the text, optionally after "Preemptible ".
    Prefix(&'static str),
    /// Like `Prefix`, and the text must be followed by "running in".
    RunningIn(&'static str),
    /// Last word before the optional "running in <region>" tail.
    EndsWith(&'static str),
}

impl MatchRule {
    fn compile(&self) -> Regex {
        let pattern = match self {
            MatchRule::Prefix(text) => {
                format!(r"(?i)^(?:preemptible\s+)?{}\b", regex::escape(text))
            }
            MatchRule::RunningIn(text) => {
                format!(r"(?i)^(?:preemptible\s+)?{}\s+running\s+in\b", regex::escape(text))
            }
            MatchRule::EndsWith(word) => {
                format!(r"(?i)\b{}(?:\s+running\s+in\s+.*)?$", regex::escape(word))
            }
        };
        Regex::new(&pattern).expect("rule patterns are built from escaped literals")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RulePair {
    pub cpu: MatchRule,
    pub ram: MatchRule,
}

#[derive(Debug, Clone, Copy)]
pub struct FamilyRules {
    pub standard: RulePair,
    /// `None` when the family has no separate custom skus.
    pub custom: Option<RulePair>,
}

/// Built-in family table.
pub const FAMILY_RULES: &[(&str, FamilyRules)] = &[
    (
        "N1",
        FamilyRules {
            standard: RulePair {
                cpu: MatchRule::Prefix("N1 Predefined Instance Core"),
                ram: MatchRule::Prefix("N1 Predefined Instance Ram"),
            },
            custom: Some(RulePair {
                cpu: MatchRule::Prefix("Custom Instance Core"),
                ram: MatchRule::Prefix("Custom Instance Ram"),
            }),
        },
    ),
    (
        "N2",
        FamilyRules {
            standard: RulePair {
                cpu: MatchRule::Prefix("N2 Instance Core"),
                ram: MatchRule::Prefix("N2 Instance Ram"),
            },
            custom: Some(RulePair {
                cpu: MatchRule::Prefix("N2 Custom Instance Core"),
                ram: MatchRule::Prefix("N2 Custom Instance Ram"),
            }),
        },
    ),
    (
        "N2D",
        FamilyRules {
            standard: RulePair {
                cpu: MatchRule::RunningIn("N2D AMD Instance Core"),
                ram: MatchRule::RunningIn("N2D AMD Instance Ram"),
            },
            custom: Some(RulePair {
                cpu: MatchRule::RunningIn("N2D AMD Custom Instance Core"),
                ram: MatchRule::RunningIn("N2D AMD Custom Instance Ram"),
            }),
        },
    ),
    (
        "E2",
        FamilyRules {
            standard: RulePair {
                cpu: MatchRule::Prefix("E2 Instance Core"),
                ram: MatchRule::Prefix("E2 Instance Ram"),
            },
            custom: Some(RulePair {
                cpu: MatchRule::Prefix("E2 Custom Instance Core"),
                ram: MatchRule::Prefix("E2 Custom Instance Ram"),
            }),
        },
    ),
    (
        "C2",
        FamilyRules {
            standard: RulePair {
                cpu: MatchRule::Prefix("Compute optimized Core"),
                ram: MatchRule::Prefix("Compute optimized Ram"),
            },
            custom: None,
        },
    ),
    (
        "M1",
        FamilyRules {
            standard: RulePair {
                cpu: MatchRule::EndsWith("core"),
                ram: MatchRule::EndsWith("ram"),
            },
            custom: None,
        },
    ),
    (
        "M2",
        FamilyRules {
            standard: RulePair {
                cpu: MatchRule::Prefix("Memory-optimized Instance Core"),
                ram: MatchRule::Prefix("Memory-optimized Instance Ram"),
            },
            custom: None,
        },
    ),
];

struct CompiledPair {
    cpu: Regex,
    ram: Regex,
}

impl CompiledPair {
    fn compile(pair: &RulePair) -> Self {
        Self {
            cpu: pair.cpu.compile(),
            ram: pair.ram.compile(),
        }
    }

    fn matches(&self, description: &str) -> bool {
        self.cpu.is_match(description) || self.ram.is_match(description)
    }
}

impl RulePair {
    fn is_generic(&self) -> bool {
        [self.cpu, self.ram]
            .iter()
            .any(|rule| matches!(rule, MatchRule::EndsWith(_)))
    }
}

struct CompiledFamily {
    standard: CompiledPair,
    custom: Option<CompiledPair>,
    /// Rules match on a bare suffix rather than a family-specific prefix.
    generic: bool,
}

impl CompiledFamily {
    fn claims(&self, description: &str) -> bool {
        self.standard.matches(description)
            || self.custom.as_ref().is_some_and(|pair| pair.matches(description))
    }
}

pub struct SkuClassifier {
    families: HashMap<String, CompiledFamily>,
}

impl Default for SkuClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SkuClassifier {
    pub fn new() -> Self {
        Self::from_rules(FAMILY_RULES)
    }

    pub fn from_rules(rules: &[(&str, FamilyRules)]) -> Self {
        let families = rules
            .iter()
            .map(|(family, rules)| {
                (
                    family.to_uppercase(),
                    CompiledFamily {
                        standard: CompiledPair::compile(&rules.standard),
                        custom: rules.custom.as_ref().map(CompiledPair::compile),
                        generic: rules.standard.is_generic(),
                    },
                )
            })
            .collect();
        Self { families }
    }

    pub fn knows(&self, family: &str) -> bool {
        self.families.contains_key(&family.to_uppercase())
    }

    /// Returns the CPU and RAM skus of `family`.
    ///
    /// An unknown family yields an empty list. A sku matching both rules is
    /// rejected with [`SizerError::AmbiguousSku`].
    pub fn classify<'a>(
        &self,
        family: &str,
        is_custom: bool,
        skus: &'a [BillingSku],
    ) -> Result<Vec<ClassifiedSku<'a>>> {
        let Some(compiled) = self.families.get(&family.to_uppercase()) else {
            tracing::warn!("No sku matching rules for family {}", family);
            return Ok(Vec::new());
        };

        let pair = if is_custom {
            compiled.custom.as_ref().unwrap_or(&compiled.standard)
        } else {
            &compiled.standard
        };

        let claimed_elsewhere = |sku: &BillingSku| {
            compiled.generic
                && self
                    .families
                    .values()
                    .any(|other| !other.generic && other.claims(&sku.description))
        };

        let mut matched = Vec::new();
        for sku in skus {
            if sku.category != ProductCategory::ComputeInstance || claimed_elsewhere(sku) {
                continue;
            }
            let is_cpu = pair.cpu.is_match(&sku.description);
            let is_ram = pair.ram.is_match(&sku.description);
            match (is_cpu, is_ram) {
                (true, true) => {
                    return Err(SizerError::AmbiguousSku {
                        sku: sku.id.clone(),
                        description: sku.description.clone(),
                    })
                }
                (true, false) => matched.push(ClassifiedSku { sku, role: SkuRole::Cpu }),
                (false, true) => matched.push(ClassifiedSku { sku, role: SkuRole::Ram }),
                (false, false) => {}
            }
        }

        tracing::debug!(
            "Classified {} of {} skus for family {} (custom: {})",
            matched.len(),
            skus.len(),
            family,
            is_custom
        );
        Ok(matched)
    }
}
