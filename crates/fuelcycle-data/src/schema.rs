//! Serde data file structs for scenario content.
//!
//! Recipes are listed as named nuclide mass vectors. The reactor file is
//! deserialized straight into [`ReactorConfig`](fuelcycle_core::config::ReactorConfig),
//! so it has no struct of its own here.

use fuelcycle_core::composition::Composition;
use fuelcycle_core::id::NuclideId;
use serde::Deserialize;

// ===========================================================================
// Recipes
// ===========================================================================

/// One nuclide entry, in short tuple form or full form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NuclideData {
    /// Short form: `(922350000, 0.04)`.
    Short(u32, f64),
    /// Full form with explicit fields.
    Full { nuclide: u32, mass: f64 },
}

impl NuclideData {
    pub fn entry(&self) -> (NuclideId, f64) {
        match *self {
            NuclideData::Short(nuclide, mass) => (NuclideId(nuclide), mass),
            NuclideData::Full { nuclide, mass } => (NuclideId(nuclide), mass),
        }
    }
}

/// A recipe definition in a data file. Masses are relative.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    pub name: String,
    pub nuclides: Vec<NuclideData>,
}

impl RecipeData {
    pub fn composition(&self) -> Composition {
        Composition::from_mass(self.nuclides.iter().map(NuclideData::entry))
    }
}
