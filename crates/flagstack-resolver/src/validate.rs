//! Constraint validation over a resolved configuration.

use crate::error::FlagError;
use crate::registry::{Constraint, FlagRegistry};
use crate::resolve::ResolvedConfiguration;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;
use tracing::warn;

/// Which rule a violation broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintKind {
    Excludes,
    Requires,
}

/// A broken constraint, with the layers that decided both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Flag that declares the constraint.
    pub flag: String,
    pub kind: ConstraintKind,
    pub other_flag: String,
    /// Layer (or `"default"`) that decided `flag`.
    pub flag_source: String,
    /// Layer (or `"default"`) that decided `other_flag`.
    pub other_source: String,
}

impl Violation {
    /// Machine-readable form, e.g. `EXCLUDES:A,B`.
    pub fn to_code(&self) -> String {
        match self.kind {
            ConstraintKind::Excludes => format!("EXCLUDES:{},{}", self.flag, self.other_flag),
            ConstraintKind::Requires => format!("REQUIRES:{},{}", self.flag, self.other_flag),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ConstraintKind::Excludes => write!(
                f,
                "{} (enabled by {}) excludes {} (enabled by {})",
                self.flag, self.flag_source, self.other_flag, self.other_source
            ),
            ConstraintKind::Requires => write!(
                f,
                "{} (enabled by {}) requires {} (disabled by {})",
                self.flag, self.flag_source, self.other_flag, self.other_source
            ),
        }
    }
}

/// Check every declared constraint and return all violations.
///
/// Violations are ordered by the registry position of the declaring flag,
/// then by declaration order. An `Excludes` pair declared on both flags is
/// reported once. The configuration is only read.
pub fn validate(configuration: &ResolvedConfiguration, registry: &FlagRegistry) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut reported_exclusions: HashSet<(&str, &str)> = HashSet::new();

    for definition in registry.definitions() {
        let Some(entry) = configuration.get(&definition.name) else {
            warn!(flag = %definition.name, "flag missing from configuration, skipping its constraints");
            continue;
        };
        if !entry.final_state.is_enabled() {
            continue;
        }

        for constraint in &definition.constraints {
            let Some(other) = configuration.get(constraint.target()) else {
                warn!(flag = %definition.name, other = constraint.target(), "constraint target missing from configuration");
                continue;
            };

            let kind = match constraint {
                Constraint::Excludes(_) if other.final_state.is_enabled() => {
                    let pair = if entry.flag_name <= other.flag_name {
                        (entry.flag_name.as_str(), other.flag_name.as_str())
                    } else {
                        (other.flag_name.as_str(), entry.flag_name.as_str())
                    };
                    if !reported_exclusions.insert(pair) {
                        continue;
                    }
                    ConstraintKind::Excludes
                }
                Constraint::Requires(_) if !other.final_state.is_enabled() => ConstraintKind::Requires,
                _ => continue,
            };

            let violation = Violation {
                flag: entry.flag_name.clone(),
                kind,
                other_flag: other.flag_name.clone(),
                flag_source: entry.source.clone(),
                other_source: other.source.clone(),
            };
            warn!(violation = %violation, "constraint violated");
            violations.push(violation);
        }
    }

    violations
}

/// A resolved configuration that passed validation.
///
/// Only [`ValidatedConfiguration::new`] builds one, so emitters can never
/// receive a configuration with outstanding violations. The configuration
/// must have been resolved from the registry it is validated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfiguration {
    configuration: ResolvedConfiguration,
}

impl ValidatedConfiguration {
    pub fn new(
        configuration: ResolvedConfiguration,
        registry: &FlagRegistry,
    ) -> Result<Self, FlagError> {
        check_registry(&configuration, registry)?;
        let violations = validate(&configuration, registry);
        if !violations.is_empty() {
            return Err(FlagError::ConstraintViolation(violations));
        }
        Ok(Self { configuration })
    }
}

/// Entries must name exactly the registry's flags, in registry order.
fn check_registry(
    configuration: &ResolvedConfiguration,
    registry: &FlagRegistry,
) -> Result<(), FlagError> {
    let mut definitions = registry.definitions().iter();
    for entry in configuration.entries() {
        match definitions.next() {
            Some(definition) if definition.name == entry.flag_name => {}
            _ => {
                return Err(FlagError::RegistryMismatch {
                    flag: entry.flag_name.clone(),
                })
            }
        }
    }
    match definitions.next() {
        Some(missing) => Err(FlagError::RegistryMismatch {
            flag: missing.name.clone(),
        }),
        None => Ok(()),
    }
}

impl Deref for ValidatedConfiguration {
    type Target = ResolvedConfiguration;

    fn deref(&self) -> &Self::Target {
        &self.configuration
    }
}
