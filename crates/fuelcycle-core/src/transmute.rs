//! Static transmutation table.
//!
//! Burnup is not modeled physically. A unit received on region `r`'s input
//! commodity becomes region `r`'s output recipe when it is burnt.

use crate::id::{Commodity, RecipeId, RegionId};
use crate::region::RegionSpec;
use std::collections::BTreeMap;

/// Maps (region, received commodity) to the burnt recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransmutationTable {
    burnt: BTreeMap<(RegionId, Commodity), RecipeId>,
}

impl TransmutationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// One entry per region: its input commodity burns into its output recipe.
    pub fn from_regions<'a, I>(specs: I) -> Self
    where
        I: IntoIterator<Item = (RegionId, &'a RegionSpec)>,
    {
        let mut table = Self::new();
        for (region, spec) in specs {
            table.insert(region, spec.in_commodity.clone(), spec.out_recipe);
        }
        table
    }

    pub fn insert(&mut self, region: RegionId, commodity: Commodity, burnt: RecipeId) {
        self.burnt.insert((region, commodity), burnt);
    }

    /// The burnt recipe for fuel received by `region` on `commodity`.
    pub fn burnt(&self, region: RegionId, commodity: &Commodity) -> Option<RecipeId> {
        self.burnt.get(&(region, commodity.clone())).copied()
    }

    pub fn len(&self) -> usize {
        self.burnt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.burnt.is_empty()
    }
}
