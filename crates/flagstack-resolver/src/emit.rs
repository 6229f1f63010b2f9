//! Output emitters for validated configurations.

use crate::registry::FlagRegistry;
use crate::state::FlagState;
use crate::validate::ValidatedConfiguration;
use serde::Serialize;
use std::fmt::Write;

/// Serializes a validated configuration for the downstream build step.
pub trait ConfigurationEmitter {
    type Error: std::error::Error;

    /// Produce the artifact. Declarations follow registry order and cover
    /// every registered flag.
    fn emit(&self, configuration: &ValidatedConfiguration) -> Result<String, Self::Error>;
}

/// C preprocessor output: `#define NAME` for enabled flags, `#undef NAME`
/// for disabled ones, then `#define NAME VALUE` per setting.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderEmitter<'a> {
    registry: Option<&'a FlagRegistry>,
}

const NAME_COLUMN: usize = 22;

impl<'a> HeaderEmitter<'a> {
    pub fn new() -> Self {
        Self { registry: None }
    }

    /// Annotate each line with the flag description and deciding layer.
    pub fn annotated(registry: &'a FlagRegistry) -> Self {
        Self {
            registry: Some(registry),
        }
    }
}

impl ConfigurationEmitter for HeaderEmitter<'_> {
    type Error = std::fmt::Error;

    fn emit(&self, configuration: &ValidatedConfiguration) -> Result<String, Self::Error> {
        let mut out = String::new();

        if self.registry.is_some() {
            writeln!(out, "/* Generated by flagstack. Do not edit. */")?;
            writeln!(out)?;
        }

        for entry in configuration.entries() {
            let directive = match entry.final_state {
                FlagState::Enabled => "#define",
                FlagState::Disabled => "#undef ",
            };

            match self.registry {
                Some(registry) => {
                    let description = registry
                        .get(&entry.flag_name)
                        .map(|d| d.description.as_str())
                        .unwrap_or_default();
                    let note = if description.is_empty() {
                        format!("[{}]", entry.source)
                    } else {
                        format!("{} [{}]", description, entry.source)
                    };
                    writeln!(
                        out,
                        "{} {:<width$} /* {} */",
                        directive,
                        entry.flag_name,
                        note,
                        width = NAME_COLUMN
                    )?;
                }
                None => writeln!(out, "{} {}", directive, entry.flag_name)?,
            }
        }

        if !configuration.settings().is_empty() {
            writeln!(out)?;
            for setting in configuration.settings() {
                writeln!(out, "#define {} {}", setting.name, setting.value)?;
            }
        }

        Ok(out)
    }
}

/// JSON output with flags as an ordered list.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEmitter;

#[derive(Serialize)]
struct JsonFlag<'a> {
    name: &'a str,
    state: FlagState,
    source: &'a str,
}

#[derive(Serialize)]
struct JsonSetting<'a> {
    name: &'a str,
    value: &'a str,
    source: &'a str,
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    flags: Vec<JsonFlag<'a>>,
    settings: Vec<JsonSetting<'a>>,
}

impl ConfigurationEmitter for JsonEmitter {
    type Error = serde_json::Error;

    fn emit(&self, configuration: &ValidatedConfiguration) -> Result<String, Self::Error> {
        let document = JsonDocument {
            flags: configuration
                .entries()
                .iter()
                .map(|e| JsonFlag {
                    name: &e.flag_name,
                    state: e.final_state,
                    source: &e.source,
                })
                .collect(),
            settings: configuration
                .settings()
                .iter()
                .map(|s| JsonSetting {
                    name: &s.name,
                    value: &s.value,
                    source: &s.source,
                })
                .collect(),
        };
        serde_json::to_string_pretty(&document)
    }
}
