//! Flag registry: the catalog of known flags, their defaults and constraints.

use crate::error::FlagError;
use crate::state::FlagState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A constraint declared on a flag, referencing another registered flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Both flags enabled at once is a violation. Symmetric.
    Excludes(String),
    /// This flag enabled while the other is disabled is a violation.
    Requires(String),
}

impl Constraint {
    /// The flag on the other end of the constraint.
    pub fn target(&self) -> &str {
        match self {
            Constraint::Excludes(other) | Constraint::Requires(other) => other,
        }
    }
}

/// Definition of one build flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagDefinition {
    /// Flag name, case-sensitive.
    pub name: String,

    /// State used when no layer asserts the flag.
    pub default_state: FlagState,

    /// Free text, carried into annotated output only.
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl FlagDefinition {
    pub fn new(name: impl Into<String>, default_state: FlagState) -> Self {
        Self {
            name: name.into(),
            default_state,
            description: String::new(),
            constraints: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn excludes(mut self, other: impl Into<String>) -> Self {
        self.constraints.push(Constraint::Excludes(other.into()));
        self
    }

    pub fn requires(mut self, other: impl Into<String>) -> Self {
        self.constraints.push(Constraint::Requires(other.into()));
        self
    }
}

/// Immutable catalog of flag definitions in definition order.
///
/// Built once and only read afterwards, so a single registry can be shared
/// across concurrent resolutions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagRegistry {
    definitions: Vec<FlagDefinition>,
    index: HashMap<String, usize>,
}

impl FlagRegistry {
    /// Build a registry, rejecting duplicate names and constraints that
    /// reference unregistered flags or the flag itself.
    pub fn new(definitions: Vec<FlagDefinition>) -> Result<Self, FlagError> {
        let mut index = HashMap::with_capacity(definitions.len());
        for (position, definition) in definitions.iter().enumerate() {
            if index.insert(definition.name.clone(), position).is_some() {
                return Err(FlagError::DuplicateFlagDefinition {
                    name: definition.name.clone(),
                });
            }
        }

        for definition in &definitions {
            for constraint in &definition.constraints {
                let target = constraint.target();
                if target == definition.name {
                    return Err(FlagError::SelfReferentialConstraint {
                        flag: definition.name.clone(),
                    });
                }
                if !index.contains_key(target) {
                    return Err(FlagError::DanglingConstraint {
                        flag: definition.name.clone(),
                        target: target.to_string(),
                    });
                }
            }
        }

        Ok(Self { definitions, index })
    }

    /// Look up a flag definition by name.
    pub fn lookup(&self, name: &str) -> Result<&FlagDefinition, FlagError> {
        self.get(name).ok_or_else(|| FlagError::UnknownFlag {
            name: name.to_string(),
            layer: None,
        })
    }

    pub fn get(&self, name: &str) -> Option<&FlagDefinition> {
        self.index.get(name).map(|&i| &self.definitions[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All flag names in registry order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.name.as_str())
    }

    /// All definitions in registry order.
    pub fn definitions(&self) -> &[FlagDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }
}
