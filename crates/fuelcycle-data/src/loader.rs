//! Loading pipeline: finds scenario files, deserializes them, checks
//! recipe references, and builds the recipe registry.
//!
//! Every file may be RON, TOML, or JSON; the format is chosen by extension.
//! A directory holding the same base name in two formats is an error.

use crate::schema::RecipeData;
use fuelcycle_core::config::{ConfigError, ReactorConfig};
use fuelcycle_core::reactor::Reactor;
use fuelcycle_core::registry::{Registry, RegistryBuilder, RegistryError};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Base name of the recipe list.
pub const RECIPES_FILE: &str = "recipes";
/// Base name of the reactor configuration.
pub const REACTOR_FILE: &str = "reactor";

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required scenario file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: &'static str, dir: PathBuf },

    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A recipe name used by the reactor is not in the recipe list.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    #[error("invalid recipe in {file}: {source}")]
    InvalidRecipe {
        file: PathBuf,
        #[source]
        source: RegistryError,
    },

    #[error("invalid reactor configuration in {file}: {source}")]
    InvalidConfig {
        file: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Look for `{base_name}.ron`, `.toml` or `.json` in `dir`. At most one may
/// exist.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if !candidate.exists() {
            continue;
        }
        if let Some(existing) = found {
            return Err(DataLoadError::ConflictingFormats {
                a: existing,
                b: candidate,
            });
        }
        found = Some(candidate);
    }

    Ok(found)
}

pub fn require_data_file(dir: &Path, base_name: &'static str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name,
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its extension.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list. TOML has no top-level arrays, so for TOML files the
/// list is read from the array at `toml_key`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return deserialize_file(path);
    }

    let content = std::fs::read_to_string(path)?;
    let table: toml::Value = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
    let array = table
        .get(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
        .clone();
    array
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

// ===========================================================================
// Scenario loading
// ===========================================================================

/// A loaded scenario: the recipe registry and a reactor configuration whose
/// recipe references all resolve against it.
#[derive(Debug)]
pub struct Scenario {
    pub registry: Registry,
    pub config: ReactorConfig,
}

impl Scenario {
    pub fn build_reactor(&self) -> Result<Reactor, ConfigError> {
        Reactor::new(&self.config, &self.registry)
    }
}

/// Load `recipes.*` and `reactor.*` from `dir`.
pub fn load_scenario(dir: &Path) -> Result<Scenario, DataLoadError> {
    let recipes_path = require_data_file(dir, RECIPES_FILE)?;
    let reactor_path = require_data_file(dir, REACTOR_FILE)?;

    let recipes: Vec<RecipeData> = deserialize_list(&recipes_path, "recipes")?;
    let mut builder = RegistryBuilder::new();
    let mut names: HashMap<String, ()> = HashMap::new();
    for recipe in &recipes {
        check_duplicate(&names, &recipe.name, &recipes_path)?;
        names.insert(recipe.name.clone(), ());
        builder.register_recipe(&recipe.name, recipe.composition());
    }
    let registry = builder.build().map_err(|source| DataLoadError::InvalidRecipe {
        file: recipes_path.clone(),
        source,
    })?;
    debug!(recipes = registry.recipe_count(), file = %recipes_path.display(), "recipes loaded");

    let config: ReactorConfig = deserialize_file(&reactor_path)?;
    config
        .validate()
        .map_err(|source| DataLoadError::InvalidConfig {
            file: reactor_path.clone(),
            source,
        })?;
    for name in config.in_recipes.iter().chain(&config.out_recipes) {
        resolve_name(&names, name, &reactor_path, "recipe")?;
    }

    info!(
        dir = %dir.display(),
        regions = config.region_count(),
        recipes = registry.recipe_count(),
        "scenario loaded"
    );
    Ok(Scenario { registry, config })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use fuelcycle_core::test_utils::fixed;
    use std::fs;

    /// Create a temporary directory with a unique name for test isolation.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "fuelcycle_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    const RECIPES_RON: &str = r#"[
        (name: "uox", nuclides: [(922350000, 0.04), (922380000, 0.96)]),
        (name: "spentuox", nuclides: [(922350000, 0.8), (922380000, 100.0), (942390000, 1.0)]),
    ]"#;

    const REACTOR_RON: &str = r#"(
        in_commodities: ["uox"],
        in_recipes: ["uox"],
        out_commodities: ["waste"],
        out_recipes: ["spentuox"],
        assem_size: [300.0],
        batch_size: [1],
        core_size: [3],
        cycle_length: 7,
        power_capacity: 1000.0,
        exit_time: Some(35),
    )"#;

    const RECIPES_TOML: &str = r#"
        [[recipes]]
        name = "uox"
        nuclides = [[922350000, 0.04], [922380000, 0.96]]

        [[recipes]]
        name = "spentuox"
        nuclides = [{ nuclide = 922350000, mass = 0.8 }, { nuclide = 942390000, mass = 1.0 }]
    "#;

    const REACTOR_JSON: &str = r#"{
        "in_commodities": ["uox"],
        "in_recipes": ["uox"],
        "out_commodities": ["waste"],
        "out_recipes": ["spentuox"],
        "assem_size": [300.0],
        "batch_size": [1],
        "core_size": [3],
        "fresh_capacity": [2],
        "spent_capacity": [10]
    }"#;

    // -----------------------------------------------------------------------
    // detect_format
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("recipes.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("recipes.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("reactor.json")).unwrap(), Format::Json);
    }

    #[test]
    fn detect_format_unsupported() {
        assert!(matches!(
            detect_format(Path::new("reactor.yaml")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            detect_format(Path::new("reactor")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // find_data_file
    // -----------------------------------------------------------------------

    #[test]
    fn find_data_file_found_and_missing() {
        let dir = make_test_dir("find");
        fs::write(dir.join("recipes.toml"), "").unwrap();

        assert_eq!(
            find_data_file(&dir, "recipes").unwrap(),
            Some(dir.join("recipes.toml"))
        );
        assert_eq!(find_data_file(&dir, "reactor").unwrap(), None);
        assert!(matches!(
            require_data_file(&dir, REACTOR_FILE),
            Err(DataLoadError::MissingRequired { file: "reactor", .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn find_data_file_conflict() {
        let dir = make_test_dir("conflict");
        fs::write(dir.join("recipes.ron"), "[]").unwrap();
        fs::write(dir.join("recipes.json"), "[]").unwrap();

        assert!(matches!(
            find_data_file(&dir, "recipes"),
            Err(DataLoadError::ConflictingFormats { .. })
        ));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // deserialize_list
    // -----------------------------------------------------------------------

    #[test]
    fn deserialize_list_toml_reads_key() {
        let dir = make_test_dir("list_toml");
        let path = dir.join("recipes.toml");
        fs::write(&path, RECIPES_TOML).unwrap();

        let recipes: Vec<RecipeData> = deserialize_list(&path, "recipes").unwrap();
        assert_eq!(recipes.len(), 2);
        assert_eq!(recipes[1].name, "spentuox");

        assert!(matches!(
            deserialize_list::<RecipeData>(&path, "materials"),
            Err(DataLoadError::Parse { .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn deserialize_file_parse_error() {
        let dir = make_test_dir("parse_err");
        let path = dir.join("reactor.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            deserialize_file::<ReactorConfig>(&path),
            Err(DataLoadError::Parse { .. })
        ));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Name helpers
    // -----------------------------------------------------------------------

    #[test]
    fn resolve_and_duplicate_helpers() {
        let mut map = HashMap::new();
        map.insert("uox".to_string(), ());
        let file = Path::new("reactor.ron");

        assert!(resolve_name(&map, "uox", file, "recipe").is_ok());
        assert!(matches!(
            resolve_name(&map, "mox", file, "recipe"),
            Err(DataLoadError::UnresolvedRef { expected_kind: "recipe", .. })
        ));
        assert!(check_duplicate(&map, "mox", file).is_ok());
        assert!(matches!(
            check_duplicate(&map, "uox", file),
            Err(DataLoadError::DuplicateName { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // load_scenario
    // -----------------------------------------------------------------------

    #[test]
    fn load_ron_scenario() {
        let dir = make_test_dir("scenario_ron");
        fs::write(dir.join("recipes.ron"), RECIPES_RON).unwrap();
        fs::write(dir.join("reactor.ron"), REACTOR_RON).unwrap();

        let scenario = load_scenario(&dir).unwrap();
        assert_eq!(scenario.registry.recipe_count(), 2);
        assert_eq!(scenario.config.exit_time, Some(35));
        assert_eq!(scenario.config.refuel_length, 1);

        let reactor = scenario.build_reactor().unwrap();
        assert_eq!(reactor.regions().len(), 1);
        assert_eq!(reactor.regions()[0].spec().assem_size, fixed(300.0));

        cleanup(&dir);
    }

    #[test]
    fn load_mixed_format_scenario() {
        let dir = make_test_dir("scenario_mixed");
        fs::write(dir.join("recipes.toml"), RECIPES_TOML).unwrap();
        fs::write(dir.join("reactor.json"), REACTOR_JSON).unwrap();

        let scenario = load_scenario(&dir).unwrap();
        assert_eq!(scenario.config.spent_capacity, vec![10]);
        assert_eq!(scenario.config.exit_time, None);
        let reactor = scenario.build_reactor().unwrap();
        assert_eq!(reactor.regions()[0].spent.capacity(), 10);

        cleanup(&dir);
    }

    #[test]
    fn unknown_recipe_reference_names_the_file() {
        let dir = make_test_dir("scenario_unresolved");
        fs::write(dir.join("recipes.ron"), RECIPES_RON).unwrap();
        fs::write(
            dir.join("reactor.ron"),
            REACTOR_RON.replace(r#"out_recipes: ["spentuox"]"#, r#"out_recipes: ["spentmox"]"#),
        )
        .unwrap();

        match load_scenario(&dir) {
            Err(DataLoadError::UnresolvedRef { file, name, .. }) => {
                assert_eq!(file, dir.join("reactor.ron"));
                assert_eq!(name, "spentmox");
            }
            other => panic!("expected UnresolvedRef, got {other:?}"),
        }

        cleanup(&dir);
    }

    #[test]
    fn duplicate_recipe_is_rejected() {
        let dir = make_test_dir("scenario_dup");
        fs::write(
            dir.join("recipes.ron"),
            r#"[(name: "uox", nuclides: [(922350000, 1.0)]), (name: "uox", nuclides: [(922380000, 1.0)])]"#,
        )
        .unwrap();
        fs::write(dir.join("reactor.ron"), REACTOR_RON).unwrap();

        assert!(matches!(
            load_scenario(&dir),
            Err(DataLoadError::DuplicateName { .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn empty_recipe_is_rejected() {
        let dir = make_test_dir("scenario_empty_recipe");
        fs::write(
            dir.join("recipes.ron"),
            r#"[(name: "uox", nuclides: []), (name: "spentuox", nuclides: [(922380000, 1.0)])]"#,
        )
        .unwrap();
        fs::write(dir.join("reactor.ron"), REACTOR_RON).unwrap();

        assert!(matches!(
            load_scenario(&dir),
            Err(DataLoadError::InvalidRecipe {
                source: RegistryError::EmptyComposition(_),
                ..
            })
        ));

        cleanup(&dir);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let dir = make_test_dir("scenario_bad_config");
        fs::write(dir.join("recipes.ron"), RECIPES_RON).unwrap();
        fs::write(
            dir.join("reactor.ron"),
            REACTOR_RON.replace("batch_size: [1]", "batch_size: [1, 1]"),
        )
        .unwrap();

        assert!(matches!(
            load_scenario(&dir),
            Err(DataLoadError::InvalidConfig {
                source: ConfigError::LengthMismatch { field: "batch_size", .. },
                ..
            })
        ));

        cleanup(&dir);
    }

    #[test]
    fn missing_reactor_file() {
        let dir = make_test_dir("scenario_missing");
        fs::write(dir.join("recipes.ron"), RECIPES_RON).unwrap();

        assert!(matches!(
            load_scenario(&dir),
            Err(DataLoadError::MissingRequired { file: "reactor", .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn error_display_messages() {
        let err = DataLoadError::UnresolvedRef {
            file: PathBuf::from("reactor.ron"),
            name: "spentmox".to_string(),
            expected_kind: "recipe",
        };
        assert_eq!(
            err.to_string(),
            "unresolved recipe reference 'spentmox' in reactor.ron"
        );

        let err = DataLoadError::MissingRequired {
            file: "recipes",
            dir: PathBuf::from("/data"),
        };
        assert_eq!(err.to_string(), "required file 'recipes' not found in /data");
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: DataLoadError = io_err.into();
        assert!(matches!(err, DataLoadError::Io(_)));
    }
}
