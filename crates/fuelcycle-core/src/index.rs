//! Fuel provenance index.
//!
//! Every unit a reactor holds is recorded here with the region and input
//! commodity it was received under. Units themselves stay plain owned values;
//! anything that needs to know where a unit came from (transmutation,
//! spent-fuel trading) asks the index instead of inspecting the unit.

use crate::id::{Commodity, FuelUnitId, RegionId};
use crate::reactor::ReactorError;
use crate::region::Region;
use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;

/// Where a unit came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub region: RegionId,
    pub commodity: Commodity,
}

/// Maps fuel unit ids to their receiving region and commodity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FuelIndex {
    entries: SecondaryMap<FuelUnitId, IndexEntry>,
}

impl FuelIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly accepted unit against the first region whose input
    /// commodity matches. Fails with [`ReactorError::UnsupportedCommodity`]
    /// if no region takes this commodity.
    pub fn index(
        &mut self,
        unit: FuelUnitId,
        commodity: &Commodity,
        regions: &[Region],
    ) -> Result<RegionId, ReactorError> {
        let region = Self::route(commodity, regions)?;
        self.entries.insert(
            unit,
            IndexEntry {
                region,
                commodity: commodity.clone(),
            },
        );
        Ok(region)
    }

    /// The region a delivery on `commodity` goes to, without recording
    /// anything.
    pub fn route(commodity: &Commodity, regions: &[Region]) -> Result<RegionId, ReactorError> {
        regions
            .iter()
            .find(|r| r.spec().in_commodity == *commodity)
            .map(|r| r.id())
            .ok_or_else(|| ReactorError::UnsupportedCommodity(commodity.clone()))
    }

    /// Provenance of a unit. An unindexed unit means the reactor's
    /// bookkeeping is broken.
    pub fn lookup(&self, unit: FuelUnitId) -> Result<&IndexEntry, ReactorError> {
        self.entries
            .get(unit)
            .ok_or(ReactorError::UnindexedFuel(unit))
    }

    pub fn region_of(&self, unit: FuelUnitId) -> Result<RegionId, ReactorError> {
        self.lookup(unit).map(|e| e.region)
    }

    /// Forget a unit that has left the reactor.
    pub fn remove(&mut self, unit: FuelUnitId) -> Option<IndexEntry> {
        self.entries.remove(unit)
    }

    pub fn contains(&self, unit: FuelUnitId) -> bool {
        self.entries.contains_key(unit)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FuelUnitId, &IndexEntry)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use slotmap::SlotMap;

    #[test]
    fn index_matches_region_by_commodity() {
        let regions = two_regions();
        let mut keys: SlotMap<FuelUnitId, ()> = SlotMap::with_key();
        let a = keys.insert(());
        let b = keys.insert(());

        let mut index = FuelIndex::new();
        assert_eq!(index.index(a, &"uox".into(), &regions).unwrap(), RegionId(0));
        assert_eq!(index.index(b, &"mox".into(), &regions).unwrap(), RegionId(1));
        assert_eq!(index.region_of(b).unwrap(), RegionId(1));
        assert_eq!(index.lookup(a).unwrap().commodity, Commodity::from("uox"));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn unknown_commodity_is_rejected_and_not_indexed() {
        let regions = two_regions();
        let mut keys: SlotMap<FuelUnitId, ()> = SlotMap::with_key();
        let a = keys.insert(());

        let mut index = FuelIndex::new();
        let err = index.index(a, &"thorium".into(), &regions).unwrap_err();
        assert!(matches!(err, ReactorError::UnsupportedCommodity(c) if c.as_str() == "thorium"));
        assert!(!index.contains(a));
    }

    #[test]
    fn lookup_after_remove_is_an_invariant_error() {
        let regions = two_regions();
        let mut keys: SlotMap<FuelUnitId, ()> = SlotMap::with_key();
        let a = keys.insert(());

        let mut index = FuelIndex::new();
        index.index(a, &"uox".into(), &regions).unwrap();
        assert!(index.remove(a).is_some());
        assert!(matches!(index.lookup(a), Err(ReactorError::UnindexedFuel(id)) if id == a));
        assert!(index.is_empty());
    }
}
