//! Scenario files for the reactor engine.
//!
//! A scenario directory holds a recipe list and a reactor configuration, each
//! in RON, TOML, or JSON. [`load_scenario`] reads both, checks every recipe
//! reference, and returns a [`Scenario`] ready to build a reactor from.

pub mod loader;
pub mod schema;

pub use loader::{load_scenario, DataLoadError, Scenario};
