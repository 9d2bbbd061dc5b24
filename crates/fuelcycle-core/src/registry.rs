use crate::composition::Composition;
use crate::id::*;
use std::collections::HashMap;

/// A recipe definition: a named composition.
#[derive(Debug, Clone)]
pub struct RecipeDef {
    pub name: String,
    pub composition: Composition,
}

/// Builder for constructing an immutable Registry.
/// Two-phase lifecycle: registration -> finalization.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    recipes: Vec<RecipeDef>,
    recipe_name_to_id: HashMap<String, RecipeId>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: Register a recipe. Returns its ID. Registering a name twice
    /// is reported by [`build`](Self::build).
    pub fn register_recipe(&mut self, name: &str, composition: Composition) -> RecipeId {
        let id = RecipeId(self.recipes.len() as u32);
        self.recipes.push(RecipeDef {
            name: name.to_string(),
            composition,
        });
        self.recipe_name_to_id.entry(name.to_string()).or_insert(id);
        id
    }

    /// Lookup recipe ID by name.
    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipe_name_to_id.get(name).copied()
    }

    /// Phase 2: Finalize and build the immutable registry.
    pub fn build(self) -> Result<Registry, RegistryError> {
        if self.recipe_name_to_id.len() != self.recipes.len() {
            let mut seen = HashMap::new();
            for recipe in &self.recipes {
                if seen.insert(recipe.name.as_str(), ()).is_some() {
                    return Err(RegistryError::DuplicateRecipe(recipe.name.clone()));
                }
            }
        }
        if let Some(empty) = self.recipes.iter().find(|r| r.composition.is_empty()) {
            return Err(RegistryError::EmptyComposition(empty.name.clone()));
        }

        Ok(Registry {
            recipes: self.recipes,
            recipe_name_to_id: self.recipe_name_to_id,
        })
    }
}

/// Immutable registry. Frozen after build(). Thread-safe to share.
#[derive(Debug)]
pub struct Registry {
    recipes: Vec<RecipeDef>,
    recipe_name_to_id: HashMap<String, RecipeId>,
}

impl Registry {
    pub fn get_recipe(&self, id: RecipeId) -> Option<&RecipeDef> {
        self.recipes.get(id.0 as usize)
    }

    pub fn composition(&self, id: RecipeId) -> Option<&Composition> {
        self.get_recipe(id).map(|r| &r.composition)
    }

    pub fn recipe_id(&self, name: &str) -> Option<RecipeId> {
        self.recipe_name_to_id.get(name).copied()
    }

    /// Resolve a recipe name, failing with [`RegistryError::NotFound`].
    pub fn require_recipe(&self, name: &str) -> Result<RecipeId, RegistryError> {
        self.recipe_id(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("recipe not found: {0}")]
    NotFound(String),
    #[error("recipe registered twice: {0}")]
    DuplicateRecipe(String),
    #[error("recipe '{0}' has an empty composition")]
    EmptyComposition(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_builder() -> RegistryBuilder {
        let mut b = RegistryBuilder::new();
        b.register_recipe(
            "uox",
            Composition::from_mass([(NuclideId(922350000), 0.04), (NuclideId(922380000), 0.96)]),
        );
        b.register_recipe(
            "spentuox",
            Composition::from_mass([
                (NuclideId(922350000), 0.8),
                (NuclideId(922380000), 100.0),
                (NuclideId(942390000), 1.0),
            ]),
        );
        b
    }

    #[test]
    fn register_and_build() {
        let reg = setup_builder().build().unwrap();
        assert_eq!(reg.recipe_count(), 2);
    }

    #[test]
    fn lookup_by_name() {
        let reg = setup_builder().build().unwrap();
        let uox = reg.recipe_id("uox").unwrap();
        assert_eq!(reg.get_recipe(uox).unwrap().name, "uox");
        assert!(reg.recipe_id("nonexistent").is_none());
        assert!(matches!(
            reg.require_recipe("nonexistent"),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn builder_lookup_before_build() {
        let b = setup_builder();
        assert_eq!(b.recipe_id("spentuox"), Some(RecipeId(1)));
    }

    #[test]
    fn duplicate_recipe_fails() {
        let mut b = setup_builder();
        b.register_recipe("uox", Composition::from_mass([(NuclideId(922380000), 1.0)]));
        assert!(matches!(b.build(), Err(RegistryError::DuplicateRecipe(name)) if name == "uox"));
    }

    #[test]
    fn empty_composition_fails() {
        let mut b = RegistryBuilder::new();
        b.register_recipe("void", Composition::default());
        assert!(matches!(b.build(), Err(RegistryError::EmptyComposition(_))));
    }
}
