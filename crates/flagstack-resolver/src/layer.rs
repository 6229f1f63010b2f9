//! Override layers and the priority-ordered layer set.

use crate::error::FlagError;
use crate::resolve::DEFAULT_SOURCE;
use crate::state::FlagState;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One flag assertion from a layer source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    pub flag_name: String,
    pub state: FlagState,
}

impl Assertion {
    pub fn new(flag_name: impl Into<String>, state: FlagState) -> Self {
        Self {
            flag_name: flag_name.into(),
            state,
        }
    }

    pub fn enable(flag_name: impl Into<String>) -> Self {
        Self::new(flag_name, FlagState::Enabled)
    }

    pub fn disable(flag_name: impl Into<String>) -> Self {
        Self::new(flag_name, FlagState::Disabled)
    }
}

/// A valued constant carried alongside the boolean flags (e.g. `MAX_MODULES 16`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub name: String,
    pub value: String,
}

impl Setting {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A partial set of overrides with a priority. Higher priority wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layer {
    identifier: String,
    priority: i64,
    assertions: Vec<Assertion>,
    settings: Vec<Setting>,
}

impl Layer {
    /// Build a layer from its assertions.
    ///
    /// Repeating an assertion with the same state is accepted once; repeating
    /// it with the opposite state is an error. The identifier must be
    /// non-empty and cannot be `"default"`.
    pub fn new(
        identifier: impl Into<String>,
        priority: i64,
        assertions: impl IntoIterator<Item = Assertion>,
    ) -> Result<Self, FlagError> {
        let identifier = identifier.into();
        if identifier.trim().is_empty() || identifier == DEFAULT_SOURCE {
            return Err(FlagError::InvalidLayerIdentifier { layer: identifier });
        }
        let mut unique: Vec<Assertion> = Vec::new();

        for assertion in assertions {
            match unique.iter().find(|a| a.flag_name == assertion.flag_name) {
                Some(existing) if existing.state == assertion.state => continue,
                Some(_) => {
                    return Err(FlagError::DuplicateAssertionInLayer {
                        layer: identifier,
                        flag: assertion.flag_name,
                    });
                }
                None => unique.push(assertion),
            }
        }

        Ok(Self {
            identifier,
            priority,
            assertions: unique,
            settings: Vec::new(),
        })
    }

    /// Attach valued settings. Same duplicate rule as assertions.
    pub fn with_settings(
        mut self,
        settings: impl IntoIterator<Item = Setting>,
    ) -> Result<Self, FlagError> {
        for setting in settings {
            match self.settings.iter().find(|s| s.name == setting.name) {
                Some(existing) if existing.value == setting.value => continue,
                Some(_) => {
                    return Err(FlagError::DuplicateAssertionInLayer {
                        layer: self.identifier,
                        flag: setting.name,
                    });
                }
                None => self.settings.push(setting),
            }
        }
        Ok(self)
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn priority(&self) -> i64 {
        self.priority
    }

    pub fn assertions(&self) -> &[Assertion] {
        &self.assertions
    }

    pub fn settings(&self) -> &[Setting] {
        &self.settings
    }

    /// The state this layer asserts for a flag, if any.
    pub fn state_of(&self, flag_name: &str) -> Option<FlagState> {
        self.assertions
            .iter()
            .find(|a| a.flag_name == flag_name)
            .map(|a| a.state)
    }
}

/// Layers sorted by ascending priority, with unique priorities and identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerSet {
    layers: Vec<Layer>,
}

impl LayerSet {
    /// Build a layer set from layers in any order.
    pub fn new(mut layers: Vec<Layer>) -> Result<Self, FlagError> {
        let mut seen = HashSet::new();
        for layer in &layers {
            if !seen.insert(layer.identifier.as_str()) {
                return Err(FlagError::DuplicateLayerIdentifier {
                    layer: layer.identifier.clone(),
                });
            }
        }

        layers.sort_by_key(|layer| layer.priority);

        for pair in layers.windows(2) {
            if pair[0].priority == pair[1].priority {
                return Err(FlagError::DuplicatePriority {
                    priority: pair[0].priority,
                    first: pair[0].identifier.clone(),
                    second: pair[1].identifier.clone(),
                });
            }
        }

        Ok(Self { layers })
    }

    /// Layers in ascending priority.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn get(&self, identifier: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.identifier == identifier)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_idempotent_duplicate() {
        let layer = Layer::new(
            "common",
            0,
            vec![Assertion::enable("PING_CMD"), Assertion::enable("PING_CMD")],
        )
        .unwrap();
        assert_eq!(layer.assertions().len(), 1);
        assert_eq!(layer.state_of("PING_CMD"), Some(FlagState::Enabled));
    }

    #[test]
    fn test_layer_conflicting_duplicate() {
        let result = Layer::new(
            "common",
            0,
            vec![Assertion::enable("PING_CMD"), Assertion::disable("PING_CMD")],
        );
        assert_eq!(
            result.unwrap_err(),
            FlagError::DuplicateAssertionInLayer {
                layer: "common".to_string(),
                flag: "PING_CMD".to_string(),
            }
        );
    }

    #[test]
    fn test_layer_conflicting_setting() {
        let result = Layer::new("common", 0, vec![]).unwrap().with_settings(vec![
            Setting::new("MAX_MODULES", "16"),
            Setting::new("MAX_MODULES", "8"),
        ]);
        assert!(matches!(
            result,
            Err(FlagError::DuplicateAssertionInLayer { ref flag, .. }) if flag == "MAX_MODULES"
        ));
    }

    #[test]
    fn test_layer_set_sorted_by_priority() {
        let set = LayerSet::new(vec![
            Layer::new("device", 10, vec![]).unwrap(),
            Layer::new("common", 0, vec![]).unwrap(),
            Layer::new("local", 5, vec![]).unwrap(),
        ])
        .unwrap();

        let ids: Vec<&str> = set.layers().iter().map(|l| l.identifier()).collect();
        assert_eq!(ids, vec!["common", "local", "device"]);
    }

    #[test]
    fn test_layer_set_duplicate_priority() {
        let result = LayerSet::new(vec![
            Layer::new("common", 0, vec![]).unwrap(),
            Layer::new("device", 0, vec![]).unwrap(),
        ]);
        assert!(matches!(
            result,
            Err(FlagError::DuplicatePriority { priority: 0, .. })
        ));
    }

    #[test]
    fn test_layer_identifier_reserved_or_empty() {
        for identifier in ["default", "", "  "] {
            assert_eq!(
                Layer::new(identifier, 0, vec![]).unwrap_err(),
                FlagError::InvalidLayerIdentifier {
                    layer: identifier.to_string(),
                }
            );
        }
    }

    #[test]
    fn test_layer_set_duplicate_identifier() {
        let result = LayerSet::new(vec![
            Layer::new("device", 0, vec![Assertion::enable("PING_CMD")]).unwrap(),
            Layer::new("device", 10, vec![Assertion::disable("PING_CMD")]).unwrap(),
        ]);
        assert_eq!(
            result.unwrap_err(),
            FlagError::DuplicateLayerIdentifier {
                layer: "device".to_string(),
            }
        );
    }

    #[test]
    fn test_negative_priorities_allowed() {
        let set = LayerSet::new(vec![
            Layer::new("base", -5, vec![]).unwrap(),
            Layer::new("top", 3, vec![]).unwrap(),
        ])
        .unwrap();
        assert_eq!(set.layers()[0].identifier(), "base");
    }
}
