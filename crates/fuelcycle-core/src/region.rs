//! A fuel region: one independently parameterized zone of the core.
//!
//! Each region owns three FIFO inventories. Fuel enters `fresh` or `core`
//! from the market, moves fresh -> core on load and core -> spent on
//! discharge, and leaves from `spent` when traded away.

use crate::fixed::{assemblies_mass, Fixed64};
use crate::id::{Commodity, RecipeId, RegionId};
use crate::index::FuelIndex;
use crate::inventory::Inventory;
use crate::reactor::ReactorError;
use crate::transmute::TransmutationTable;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Resolved per-region parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub in_commodity: Commodity,
    pub in_recipe: RecipeId,
    pub out_commodity: Commodity,
    pub out_recipe: RecipeId,
    /// Mass of one assembly.
    pub assem_size: Fixed64,
    /// Assemblies discharged and transmuted together at cycle end.
    pub batch_size: usize,
    /// Assemblies in a full core.
    pub core_capacity: usize,
    pub fresh_capacity: usize,
    pub spent_capacity: usize,
}

/// Result of a discharge attempt. A blocked discharge moves nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DischargeOutcome {
    Discharged(usize),
    Blocked { needed: usize, room: usize },
}

impl DischargeOutcome {
    pub fn succeeded(self) -> bool {
        matches!(self, DischargeOutcome::Discharged(_))
    }
}

// ---------------------------------------------------------------------------
// Region
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    id: RegionId,
    spec: RegionSpec,
    pub fresh: Inventory,
    pub core: Inventory,
    pub spent: Inventory,
}

impl Region {
    pub fn new(id: RegionId, spec: RegionSpec) -> Self {
        let fresh = Inventory::new(spec.fresh_capacity, spec.assem_size);
        let core = Inventory::new(spec.core_capacity, spec.assem_size);
        let spent = Inventory::new(spec.spent_capacity, spec.assem_size);
        Self {
            id,
            spec,
            fresh,
            core,
            spent,
        }
    }

    pub fn id(&self) -> RegionId {
        self.id
    }

    pub fn spec(&self) -> &RegionSpec {
        &self.spec
    }

    pub fn is_full(&self) -> bool {
        self.core.count() == self.spec.core_capacity
    }

    /// Move `min(core room, fresh count)` units fresh -> core, oldest first.
    /// Returns how many moved.
    pub fn load(&mut self) -> usize {
        self.fresh.transfer_to(&mut self.core, usize::MAX)
    }

    /// Move one batch core -> spent, all or nothing.
    pub fn discharge(&mut self) -> DischargeOutcome {
        let needed = self.spec.batch_size.min(self.core.count());
        let room = self.spent.space();
        if room < needed {
            return DischargeOutcome::Blocked { needed, room };
        }
        DischargeOutcome::Discharged(self.core.transfer_to(&mut self.spent, needed))
    }

    /// Burn up to `n` of the oldest core units in place. Each unit's new
    /// recipe comes from the table, keyed by the commodity it was received on.
    /// Burnt units stay at the front so discharge order is unchanged.
    pub fn transmute(
        &mut self,
        n: usize,
        index: &FuelIndex,
        table: &TransmutationTable,
    ) -> Result<usize, ReactorError> {
        let n = n.min(self.core.count());
        for unit in self.core.iter_mut().take(n) {
            let entry = index.lookup(unit.id)?;
            unit.recipe = table.burnt(entry.region, &entry.commodity).ok_or_else(|| {
                ReactorError::MissingTransmutation {
                    region: entry.region,
                    commodity: entry.commodity.clone(),
                }
            })?;
        }
        Ok(n)
    }

    /// Move fresh units straight to spent while spent has room.
    pub fn drain_fresh_to_spent(&mut self) -> usize {
        self.fresh.transfer_to(&mut self.spent, usize::MAX)
    }

    /// Assemblies still wanted to fill core and fresh.
    pub fn unmet_need(&self) -> usize {
        self.core.space() + self.fresh.space()
    }

    /// Core capacity in mass.
    pub fn core_mass_capacity(&self) -> Fixed64 {
        assemblies_mass(self.spec.core_capacity, self.spec.assem_size)
    }

    pub fn is_empty(&self) -> bool {
        self.core.is_empty() && self.spent.is_empty()
    }
}
