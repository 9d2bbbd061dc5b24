//! Nuclide compositions as normalized mass fractions.
//!
//! Compositions are built once at startup from relative masses (which need
//! not sum to one) and are immutable afterwards. Transmutation never edits a
//! composition; it swaps a fuel unit's recipe for a different one.

use crate::fixed::{f64_to_fixed64, Fixed64};
use crate::id::NuclideId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A normalized nuclide composition. Fractions sum to one (within fixed-point
/// rounding) unless the composition is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composition {
    fractions: BTreeMap<NuclideId, Fixed64>,
}

impl Composition {
    /// Build a composition from relative masses. Duplicate nuclides are
    /// summed; non-positive entries are dropped.
    pub fn from_mass<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (NuclideId, f64)>,
    {
        let mut masses: BTreeMap<NuclideId, f64> = BTreeMap::new();
        for (nuclide, mass) in entries {
            if mass > 0.0 {
                *masses.entry(nuclide).or_insert(0.0) += mass;
            }
        }

        let total: f64 = masses.values().sum();
        let fractions = if total > 0.0 {
            masses
                .into_iter()
                .map(|(nuclide, mass)| (nuclide, f64_to_fixed64(mass / total)))
                .collect()
        } else {
            BTreeMap::new()
        };

        Self { fractions }
    }

    /// Mass fraction of a nuclide, zero if absent.
    pub fn fraction(&self, nuclide: NuclideId) -> Fixed64 {
        self.fractions.get(&nuclide).copied().unwrap_or(Fixed64::ZERO)
    }

    /// Mass of `nuclide` in `total_mass` of this composition.
    pub fn nuclide_mass(&self, nuclide: NuclideId, total_mass: Fixed64) -> Fixed64 {
        total_mass.saturating_mul(self.fraction(nuclide))
    }

    pub fn nuclides(&self) -> impl Iterator<Item = (NuclideId, Fixed64)> + '_ {
        self.fractions.iter().map(|(n, f)| (*n, *f))
    }

    pub fn is_empty(&self) -> bool {
        self.fractions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fractions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::fixed64_to_f64;

    const U235: NuclideId = NuclideId(922350000);
    const U238: NuclideId = NuclideId(922380000);
    const PU239: NuclideId = NuclideId(942390000);

    #[test]
    fn fractions_are_normalized() {
        let c = Composition::from_mass([(U235, 0.04), (U238, 0.96)]);
        assert!((fixed64_to_f64(c.fraction(U235)) - 0.04).abs() < 1e-9);
        assert!((fixed64_to_f64(c.fraction(U238)) - 0.96).abs() < 1e-9);
    }

    #[test]
    fn relative_masses_need_not_sum_to_one() {
        let c = Composition::from_mass([(U235, 0.8), (U238, 100.0), (PU239, 1.0)]);
        let expected = 1.0 / 101.8;
        assert!((fixed64_to_f64(c.fraction(PU239)) - expected).abs() < 1e-9);
    }

    #[test]
    fn duplicates_are_summed_and_zeros_dropped() {
        let c = Composition::from_mass([(U235, 1.0), (U235, 1.0), (U238, 2.0), (PU239, 0.0)]);
        assert_eq!(c.len(), 2);
        assert_eq!(fixed64_to_f64(c.fraction(U235)), 0.5);
        assert_eq!(c.fraction(PU239), Fixed64::ZERO);
    }

    #[test]
    fn nuclide_mass_scales_by_total() {
        let c = Composition::from_mass([(U235, 1.0), (U238, 3.0)]);
        let m = c.nuclide_mass(U235, f64_to_fixed64(300.0));
        assert_eq!(fixed64_to_f64(m), 75.0);
    }

    #[test]
    fn empty_input_gives_empty_composition() {
        let c = Composition::from_mass(std::iter::empty());
        assert!(c.is_empty());
        assert_eq!(c.fraction(U235), Fixed64::ZERO);
    }
}
