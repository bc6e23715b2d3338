use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    factory::{create_selector_type, SelectorDescription},
    Selector, TerrainError, TerrainSelectorParameters,
};

const BUILTIN_SELECTORS: &str = include_str!("../assets/terrain.json");

/// Registry of named selector descriptions.
#[derive(Clone, Debug, Default)]
pub struct TerrainDatabase {
    named: BTreeMap<String, SelectorDescription>,
}

/// Persisted form of a selector.
#[derive(Serialize, Deserialize)]
struct StoredSelector {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    config: Value,
    parameters: TerrainSelectorParameters,
}

impl TerrainDatabase {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the built-in named selectors.
    pub fn builtin() -> Result<Self, TerrainError> {
        Self::from_json(BUILTIN_SELECTORS)
    }

    /// Parses a `{ name: { "type", "config" } }` table.
    pub fn from_json(text: &str) -> Result<Self, TerrainError> {
        let named: BTreeMap<String, SelectorDescription> = serde_json::from_str(text)
            .map_err(|error| TerrainError::bad_config("database", error))?;
        log::debug!("loaded {} named selectors", named.len());
        Ok(Self { named })
    }

    /// Registers or replaces a named selector.
    pub fn register(&mut self, name: &str, description: SelectorDescription) {
        let _ = self.named.insert(name.to_owned(), description);
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.named.keys().map(String::as_str)
    }

    /// Description registered under `name`.
    #[must_use]
    pub fn description(&self, name: &str) -> Option<&SelectorDescription> {
        self.named.get(name)
    }

    /// Builds the selector registered under `name`.
    pub fn create_named_selector(
        &self,
        name: &str,
        parameters: TerrainSelectorParameters,
    ) -> Result<Selector, TerrainError> {
        let description = self
            .named
            .get(name)
            .ok_or_else(|| TerrainError::UnknownNamedSelector(name.to_owned()))?;
        description.build(parameters)
    }

    /// Builds a selector of kind `kind` from its JSON config.
    pub fn create_selector_type(
        &self,
        kind: &str,
        config: &Value,
        parameters: TerrainSelectorParameters,
    ) -> Result<Selector, TerrainError> {
        create_selector_type(kind, config, parameters)
    }

    /// Persists a selector as `{ "type", "config", "parameters" }`.
    #[must_use]
    pub fn store(&self, selector: &Selector) -> Value {
        let stored = StoredSelector {
            kind: selector.kind().to_owned(),
            config: selector.config().clone(),
            parameters: *selector.parameters(),
        };
        serde_json::to_value(stored).unwrap_or(Value::Null)
    }

    /// Rebuilds a selector from its persisted form.
    pub fn load(&self, stored: &Value) -> Result<Selector, TerrainError> {
        let stored: StoredSelector = serde_json::from_value(stored.clone())
            .map_err(|error| TerrainError::bad_config("stored selector", error))?;
        create_selector_type(&stored.kind, &stored.config, stored.parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_builds_every_entry() {
        let database = TerrainDatabase::builtin().expect("built-in table parses");
        let parameters = TerrainSelectorParameters::new(512, 200.0, 3);
        for name in database.names() {
            let selector = database
                .create_named_selector(name, parameters)
                .unwrap_or_else(|error| panic!("{name} failed to build: {error}"));
            assert!(selector.get(10, 190).is_finite(), "{name} sampled a non-finite value");
        }
    }

    #[test]
    fn unknown_names_and_kinds_are_reported() {
        let database = TerrainDatabase::builtin().expect("built-in table parses");
        let parameters = TerrainSelectorParameters::new(64, 0.0, 0);
        assert!(matches!(
            database.create_named_selector("nope", parameters),
            Err(TerrainError::UnknownNamedSelector(_))
        ));
        assert!(matches!(
            database.create_selector_type("nope", &Value::Null, parameters),
            Err(TerrainError::UnknownSelector(_))
        ));
    }

    #[test]
    fn malformed_config_is_reported() {
        let database = TerrainDatabase::new();
        let parameters = TerrainSelectorParameters::new(64, 0.0, 0);
        let result = database.create_selector_type(
            "constant",
            &serde_json::json!({ "value": "high" }),
            parameters,
        );
        assert!(matches!(result, Err(TerrainError::BadSelectorConfig { .. })));
        let result = database.create_selector_type(
            "min",
            &serde_json::json!({ "sources": [] }),
            parameters,
        );
        assert!(matches!(result, Err(TerrainError::BadSelectorConfig { .. })));
    }

    #[test]
    fn stored_form_carries_parameters() {
        let database = TerrainDatabase::new();
        let parameters = TerrainSelectorParameters::new(200, 50.0, 7).with_commonality(0.5);
        let selector = database
            .create_selector_type("constant", &serde_json::json!({ "value": 2.5 }), parameters)
            .expect("constant builds");
        let stored = database.store(&selector);
        assert_eq!(stored["type"], "constant");
        assert_eq!(stored["parameters"]["worldWidth"], 200);
        assert_eq!(stored["parameters"]["seed"], 7);
        let loaded = database.load(&stored).expect("stored selector loads");
        assert_eq!(loaded.get(-5, 9), 2.5);
        assert_eq!(loaded.parameters(), &parameters);
    }
}
