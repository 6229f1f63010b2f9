//! Layered resolution of flag states with provenance.

use crate::error::FlagError;
use crate::layer::LayerSet;
use crate::registry::FlagRegistry;
use crate::state::FlagState;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, trace};

/// Provenance recorded for flags no layer asserted.
pub const DEFAULT_SOURCE: &str = "default";

/// Final state of one flag and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEntry {
    pub flag_name: String,
    pub final_state: FlagState,

    /// Identifier of the deciding layer, or `"default"`.
    pub source: String,

    /// Lower-priority layers whose assertions for this flag were superseded,
    /// in ascending priority.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub overridden: Vec<String>,
}

impl ResolvedEntry {
    pub fn is_default(&self) -> bool {
        self.overridden.is_empty() && self.source == DEFAULT_SOURCE
    }
}

/// Final value of a valued setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSetting {
    pub name: String,
    pub value: String,
    pub source: String,
}

/// Every registered flag with exactly one final state, in registry order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfiguration {
    entries: Vec<ResolvedEntry>,
    settings: Vec<ResolvedSetting>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl ResolvedConfiguration {
    /// Entries in registry order.
    pub fn entries(&self) -> &[ResolvedEntry] {
        &self.entries
    }

    /// Settings sorted by name.
    pub fn settings(&self) -> &[ResolvedSetting] {
        &self.settings
    }

    pub fn get(&self, flag_name: &str) -> Option<&ResolvedEntry> {
        self.index.get(flag_name).map(|&i| &self.entries[i])
    }

    pub fn state_of(&self, flag_name: &str) -> Option<FlagState> {
        self.get(flag_name).map(|e| e.final_state)
    }

    /// Names of enabled flags in registry order.
    pub fn enabled(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| e.final_state.is_enabled())
            .map(|e| e.flag_name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Merge a layer set over the registry defaults.
///
/// Every flag starts at its default with source `"default"`; layers are then
/// applied in ascending priority so the highest-priority assertion for a flag
/// decides its state. An assertion naming an unregistered flag aborts the
/// whole resolution.
pub fn resolve(
    registry: &FlagRegistry,
    layer_set: &LayerSet,
) -> Result<ResolvedConfiguration, FlagError> {
    let mut entries: Vec<ResolvedEntry> = registry
        .definitions()
        .iter()
        .map(|definition| ResolvedEntry {
            flag_name: definition.name.clone(),
            final_state: definition.default_state,
            source: DEFAULT_SOURCE.to_string(),
            overridden: Vec::new(),
        })
        .collect();
    let mut asserted = vec![false; entries.len()];
    let mut settings: BTreeMap<String, ResolvedSetting> = BTreeMap::new();

    for layer in layer_set.layers() {
        debug!(
            layer = layer.identifier(),
            priority = layer.priority(),
            assertions = layer.assertions().len(),
            settings = layer.settings().len(),
            "applying layer"
        );

        for assertion in layer.assertions() {
            let position = registry.position(&assertion.flag_name).ok_or_else(|| {
                FlagError::UnknownFlag {
                    name: assertion.flag_name.clone(),
                    layer: Some(layer.identifier().to_string()),
                }
            })?;

            let entry = &mut entries[position];
            let source = layer.identifier().to_string();
            if asserted[position] {
                trace!(
                    flag = %entry.flag_name,
                    previous = %entry.source,
                    layer = layer.identifier(),
                    "assertion overridden"
                );
                let previous = std::mem::replace(&mut entry.source, source);
                entry.overridden.push(previous);
            } else {
                entry.source = source;
                asserted[position] = true;
            }
            entry.final_state = assertion.state;
        }

        for setting in layer.settings() {
            if registry.contains(&setting.name) {
                return Err(FlagError::SettingNamesFlag {
                    layer: layer.identifier().to_string(),
                    name: setting.name.clone(),
                });
            }
            settings.insert(
                setting.name.clone(),
                ResolvedSetting {
                    name: setting.name.clone(),
                    value: setting.value.clone(),
                    source: layer.identifier().to_string(),
                },
            );
        }
    }

    let index = entries
        .iter()
        .enumerate()
        .map(|(i, e)| (e.flag_name.clone(), i))
        .collect();

    info!(
        flags = entries.len(),
        layers = layer_set.len(),
        enabled = entries.iter().filter(|e| e.final_state.is_enabled()).count(),
        "resolution complete"
    );

    Ok(ResolvedConfiguration {
        entries,
        settings: settings.into_values().collect(),
        index,
    })
}
