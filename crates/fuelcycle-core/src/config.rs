//! Reactor configuration.
//!
//! Per-region parameters are given as parallel vectors, one entry per region.
//! The number of regions is the length of `in_commodities`. Every other
//! per-region vector must match it, except `fresh_capacity` and
//! `spent_capacity`, which may be left empty to take their defaults.

use crate::fixed::{f64_to_fixed64, Fixed64, Ticks};
use crate::id::{Commodity, RegionId};
use crate::region::RegionSpec;
use crate::registry::Registry;
use serde::{Deserialize, Serialize};

/// Spent capacity used when none is configured: effectively unbounded.
pub const UNBOUNDED_SPENT_ASSEMBLIES: usize = 1_000_000_000;

fn default_cycle_length() -> Ticks {
    18
}

fn default_refuel_length() -> Ticks {
    1
}

fn default_power_name() -> String {
    "power".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactorConfig {
    pub in_commodities: Vec<Commodity>,
    /// Recipe names, resolved through the registry.
    pub in_recipes: Vec<String>,
    pub out_commodities: Vec<Commodity>,
    pub out_recipes: Vec<String>,
    /// Mass of one assembly, per region.
    pub assem_size: Vec<f64>,
    pub batch_size: Vec<usize>,
    /// Assemblies in a full core, per region.
    pub core_size: Vec<usize>,
    #[serde(default)]
    pub fresh_capacity: Vec<usize>,
    #[serde(default)]
    pub spent_capacity: Vec<usize>,

    #[serde(default = "default_cycle_length")]
    pub cycle_length: Ticks,
    #[serde(default = "default_refuel_length")]
    pub refuel_length: Ticks,

    #[serde(default)]
    pub power_capacity: f64,
    #[serde(default = "default_power_name")]
    pub power_name: String,

    /// Keep package labels on received fuel.
    #[serde(default = "default_true")]
    pub keep_packaging: bool,
    /// Burn every assembly at decommissioning instead of half.
    #[serde(default)]
    pub transmute_all: bool,
    /// Last step the reactor operates. `None` means it never retires.
    #[serde(default)]
    pub exit_time: Option<Ticks>,
}

impl ReactorConfig {
    pub fn region_count(&self) -> usize {
        self.in_commodities.len()
    }

    /// Check vector lengths and scalar parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = self.region_count();
        if n == 0 {
            return Err(ConfigError::NoRegions);
        }

        let required = [
            ("in_recipes", self.in_recipes.len()),
            ("out_commodities", self.out_commodities.len()),
            ("out_recipes", self.out_recipes.len()),
            ("assem_size", self.assem_size.len()),
            ("batch_size", self.batch_size.len()),
            ("core_size", self.core_size.len()),
        ];
        let optional = [
            ("fresh_capacity", self.fresh_capacity.len()),
            ("spent_capacity", self.spent_capacity.len()),
        ];
        for (field, actual) in required {
            if actual != n {
                return Err(ConfigError::LengthMismatch {
                    field,
                    expected: n,
                    actual,
                });
            }
        }
        for (field, actual) in optional {
            if actual != 0 && actual != n {
                return Err(ConfigError::LengthMismatch {
                    field,
                    expected: n,
                    actual,
                });
            }
        }

        if self.cycle_length == 0 {
            return Err(ConfigError::ZeroCycleLength);
        }
        if let Some(region) = self.assem_size.iter().position(|s| !s.is_finite() || *s <= 0.0) {
            return Err(ConfigError::BadAssemblySize {
                region: RegionId(region as u32),
            });
        }
        if let Some(region) = self.batch_size.iter().position(|b| *b == 0) {
            return Err(ConfigError::ZeroBatchSize {
                region: RegionId(region as u32),
            });
        }
        Ok(())
    }

    /// Validate, then resolve recipe names into per-region specs.
    pub fn region_specs(&self, registry: &Registry) -> Result<Vec<RegionSpec>, ConfigError> {
        self.validate()?;

        let recipe = |name: &String| {
            registry
                .recipe_id(name)
                .ok_or_else(|| ConfigError::UnknownRecipe(name.clone()))
        };

        (0..self.region_count())
            .map(|i| {
                Ok(RegionSpec {
                    in_commodity: self.in_commodities[i].clone(),
                    in_recipe: recipe(&self.in_recipes[i])?,
                    out_commodity: self.out_commodities[i].clone(),
                    out_recipe: recipe(&self.out_recipes[i])?,
                    assem_size: f64_to_fixed64(self.assem_size[i]),
                    batch_size: self.batch_size[i],
                    core_capacity: self.core_size[i],
                    fresh_capacity: self.fresh_capacity.get(i).copied().unwrap_or(0),
                    spent_capacity: self
                        .spent_capacity
                        .get(i)
                        .copied()
                        .unwrap_or(UNBOUNDED_SPENT_ASSEMBLIES),
                })
            })
            .collect()
    }

    pub fn power_capacity(&self) -> Fixed64 {
        f64_to_fixed64(self.power_capacity)
    }
}

/// Errors raised while turning a configuration into a reactor.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("reactor has no regions")]
    NoRegions,
    #[error("{field} has {actual} entries, expected {expected} (one per region)")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("cycle length must be at least one step")]
    ZeroCycleLength,
    #[error("assembly size of {region} must be positive")]
    BadAssemblySize { region: RegionId },
    #[error("batch size of {region} must be at least one assembly")]
    ZeroBatchSize { region: RegionId },
    #[error("unknown recipe: {0}")]
    UnknownRecipe(String),
}
