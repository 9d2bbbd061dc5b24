use crate::composition::Composition;
use crate::fixed::{assemblies_mass, saturating_sum, Fixed64};
use crate::id::*;
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One fuel assembly. Moves whole between inventories; never split or merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuelUnit {
    pub id: FuelUnitId,
    pub mass: Fixed64,
    /// Current composition. Rewritten by transmutation.
    pub recipe: RecipeId,
    /// Optional packaging label carried over from the market.
    pub package: Option<String>,
}

impl FuelUnit {
    pub fn new(id: FuelUnitId, mass: Fixed64, recipe: RecipeId) -> Self {
        Self {
            id,
            mass,
            recipe,
            package: None,
        }
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn composition<'a>(&self, registry: &'a Registry) -> Option<&'a Composition> {
        registry.composition(self.recipe)
    }

    /// Mass of one nuclide in this unit, zero if the recipe is unknown.
    pub fn nuclide_mass(&self, registry: &Registry, nuclide: NuclideId) -> Fixed64 {
        self.composition(registry)
            .map(|c| c.nuclide_mass(nuclide, self.mass))
            .unwrap_or(Fixed64::ZERO)
    }
}

/// An ordered FIFO buffer of fuel units, bounded by a whole number of
/// assemblies. The front is the oldest unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    units: VecDeque<FuelUnit>,
    capacity: usize,
    unit_mass: Fixed64,
}

impl Inventory {
    /// An empty inventory holding at most `capacity` assemblies of `unit_mass`.
    pub fn new(capacity: usize, unit_mass: Fixed64) -> Self {
        Self {
            units: VecDeque::new(),
            capacity,
            unit_mass,
        }
    }

    pub fn count(&self) -> usize {
        self.units.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remaining room, in assemblies.
    pub fn space(&self) -> usize {
        self.capacity.saturating_sub(self.units.len())
    }

    /// Capacity expressed in mass (`capacity x assem_size`), saturating.
    pub fn capacity_mass(&self) -> Fixed64 {
        assemblies_mass(self.capacity, self.unit_mass)
    }

    /// Total mass currently held.
    pub fn quantity(&self) -> Fixed64 {
        saturating_sum(self.units.iter().map(|u| u.mass))
    }

    pub fn is_full(&self) -> bool {
        self.units.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Push a unit to the back. Hands the unit back if the inventory is full.
    pub fn push(&mut self, unit: FuelUnit) -> Result<(), FuelUnit> {
        if self.is_full() {
            return Err(unit);
        }
        self.units.push_back(unit);
        Ok(())
    }

    /// Remove the oldest unit.
    pub fn pop(&mut self) -> Option<FuelUnit> {
        self.units.pop_front()
    }

    /// Remove up to `n` oldest units, oldest first.
    pub fn pop_n(&mut self, n: usize) -> Vec<FuelUnit> {
        let n = n.min(self.units.len());
        self.units.drain(..n).collect()
    }

    /// Move up to `n` of the oldest units into the back of `to`, stopping
    /// when `to` is full. Returns how many moved.
    pub fn transfer_to(&mut self, to: &mut Inventory, n: usize) -> usize {
        let n = n.min(self.units.len()).min(to.space());
        to.units.extend(self.units.drain(..n));
        n
    }

    /// Remove every unit, oldest first.
    pub fn drain_all(&mut self) -> Vec<FuelUnit> {
        self.units.drain(..).collect()
    }

    /// Iterate from oldest to newest without removing anything.
    pub fn iter(&self) -> impl Iterator<Item = &FuelUnit> {
        self.units.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut FuelUnit> {
        self.units.iter_mut()
    }

    pub fn contains(&self, id: FuelUnitId) -> bool {
        self.units.iter().any(|u| u.id == id)
    }
}
