//! Resolution report with full provenance.
//!
//! Captures the resolved flags and settings, the layer sources that produced
//! them, and any constraint violations. Used by `explain` and `validate --json`.

use chrono::{DateTime, Utc};
use flagstack_resolver::{ResolvedConfiguration, ResolvedEntry, ResolvedSetting, Violation, DEFAULT_SOURCE};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::StackError;
use crate::source::LayerSource;

/// Schema version for the report
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "flagstack/resolution@1";

#[derive(Debug, Clone, Serialize)]
pub struct ResolutionReport {
    pub schema_version: u32,
    pub schema_id: String,
    pub created_at: DateTime<Utc>,

    /// SHA-256 over the canonical JSON of the resolved configuration.
    pub fingerprint: String,

    /// Layers in ascending priority.
    pub sources: Vec<LayerSource>,

    pub entries: Vec<ResolvedEntry>,
    pub settings: Vec<ResolvedSetting>,
    pub violations: Vec<Violation>,
    pub valid: bool,
}

/// Deterministic digest of a resolved configuration (JCS, then SHA-256).
pub fn fingerprint(configuration: &ResolvedConfiguration) -> Result<String, StackError> {
    let jcs_bytes = serde_json_canonicalizer::to_vec(configuration)
        .map_err(|e| StackError::Serialize(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(&jcs_bytes);
    Ok(hex::encode(hasher.finalize()))
}

impl ResolutionReport {
    pub fn build(
        configuration: &ResolvedConfiguration,
        violations: &[Violation],
        sources: &[LayerSource],
    ) -> Result<Self, StackError> {
        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            fingerprint: fingerprint(configuration)?,
            sources: sources.to_vec(),
            entries: configuration.entries().to_vec(),
            settings: configuration.settings().to_vec(),
            violations: violations.to_vec(),
            valid: violations.is_empty(),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable explanation, one line per flag.
    pub fn to_human(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Fingerprint: {}", self.fingerprint));
        lines.push(String::new());

        lines.push("Layers (lowest priority first):".to_string());
        if self.sources.is_empty() {
            lines.push("  (none)".to_string());
        }
        for source in &self.sources {
            lines.push(format!(
                "  {:>6}  {}  {} ({} assertions, {} settings)",
                source.priority, source.id, source.path, source.assertions, source.settings
            ));
        }
        lines.push(String::new());

        let width = self
            .entries
            .iter()
            .map(|e| e.flag_name.len())
            .max()
            .unwrap_or(0);

        lines.push("Flags:".to_string());
        for entry in &self.entries {
            let mut line = format!(
                "  {:<width$}  {:<8}  {}",
                entry.flag_name,
                entry.final_state.as_str(),
                entry.source,
                width = width
            );
            if !entry.overridden.is_empty() {
                line.push_str(&format!(" (overrides {})", entry.overridden.join(", ")));
            }
            lines.push(line);
        }

        if !self.settings.is_empty() {
            lines.push(String::new());
            lines.push("Settings:".to_string());
            for setting in &self.settings {
                lines.push(format!("  {} = {}  {}", setting.name, setting.value, setting.source));
            }
        }

        lines.push(String::new());
        if self.valid {
            lines.push("Result: VALID".to_string());
        } else {
            lines.push(format!("Result: INVALID ({} violation(s))", self.violations.len()));
            for violation in &self.violations {
                lines.push(format!("  - {}", violation));
            }
        }

        let defaulted = self
            .entries
            .iter()
            .filter(|e| e.source == DEFAULT_SOURCE)
            .count();
        lines.push(format!(
            "{} flags, {} from layers, {} defaults",
            self.entries.len(),
            self.entries.len() - defaulted,
            defaulted
        ));

        lines.join("\n")
    }
}
