//! Pipeline orchestration: load a stack, resolve it, validate, emit.
//!
//! - Load the catalog into a registry
//! - Load every layer source, in any order, into a priority-ordered set
//! - Resolve the set over the registry defaults
//! - Validate constraints and gate emission on the result

use flagstack_resolver::{
    resolve, validate, ConfigurationEmitter, FlagError, FlagRegistry, HeaderEmitter, JsonEmitter,
    LayerSet, ResolvedConfiguration, ValidatedConfiguration, Violation,
};
use std::path::Path;
use tracing::{info, warn};

use crate::catalog::load_catalog;
use crate::error::StackError;
use crate::manifest::{validate_layer_entries, LayerEntry, StackManifest};
use crate::report::{fingerprint, ResolutionReport};
use crate::source::{load_layer, LayerSource};

/// Output syntax for `emit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Header,
    Json,
}

/// A loaded registry and layer set, ready to resolve.
#[derive(Debug, Clone)]
pub struct Stack {
    registry: FlagRegistry,
    layers: LayerSet,
    sources: Vec<LayerSource>,
}

impl Stack {
    /// Load the catalog and layers named by a manifest file.
    pub fn load(manifest_path: &Path) -> Result<Self, StackError> {
        let manifest = StackManifest::from_file(manifest_path)?;
        info!(
            manifest = %manifest_path.display(),
            layers = manifest.layers.len(),
            "loading stack"
        );
        Self::from_parts(&manifest.catalog, &manifest.layers)
    }

    /// Load a catalog and an explicit list of layers.
    pub fn from_parts(catalog: &Path, entries: &[LayerEntry]) -> Result<Self, StackError> {
        validate_layer_entries(entries)?;
        let registry = load_catalog(catalog)?;

        let mut layers = Vec::with_capacity(entries.len());
        let mut sources = Vec::with_capacity(entries.len());
        for entry in entries {
            let loaded = load_layer(&entry.id, entry.priority, &entry.path)?;
            layers.push(loaded.layer);
            sources.push(loaded.source);
        }

        let layers = LayerSet::new(layers)?;
        sources.sort_by_key(|s| s.priority);

        Ok(Self {
            registry,
            layers,
            sources,
        })
    }

    /// Assemble a stack from already-built parts.
    pub fn new(registry: FlagRegistry, layers: LayerSet) -> Self {
        Self {
            registry,
            layers,
            sources: Vec::new(),
        }
    }

    pub fn registry(&self) -> &FlagRegistry {
        &self.registry
    }

    pub fn layers(&self) -> &LayerSet {
        &self.layers
    }

    pub fn sources(&self) -> &[LayerSource] {
        &self.sources
    }

    /// Resolve and validate. Violations are returned, not raised.
    pub fn resolve(&self) -> Result<Resolution, StackError> {
        let configuration = resolve(&self.registry, &self.layers)?;
        let violations = validate(&configuration, &self.registry);

        if violations.is_empty() {
            info!(fingerprint = %fingerprint(&configuration)?, "configuration valid");
        } else {
            warn!(violations = violations.len(), "configuration has constraint violations");
        }

        Ok(Resolution {
            configuration,
            violations,
        })
    }

    /// Build the provenance report for a resolution of this stack.
    pub fn report(&self, resolution: &Resolution) -> Result<ResolutionReport, StackError> {
        ResolutionReport::build(&resolution.configuration, &resolution.violations, &self.sources)
    }

    /// Resolve, validate and emit in one step. Fails with
    /// `ConstraintViolation` carrying every violation when invalid.
    pub fn emit(&self, format: OutputFormat, annotate: bool) -> Result<String, StackError> {
        let validated = self.resolve()?.into_validated(&self.registry)?;
        emit(&validated, &self.registry, format, annotate)
    }
}

/// Outcome of resolving a stack.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub configuration: ResolvedConfiguration,
    pub violations: Vec<Violation>,
}

impl Resolution {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn into_validated(self, registry: &FlagRegistry) -> Result<ValidatedConfiguration, FlagError> {
        if !self.violations.is_empty() {
            return Err(FlagError::ConstraintViolation(self.violations));
        }
        ValidatedConfiguration::new(self.configuration, registry)
    }
}

/// Render a validated configuration in the requested format.
pub fn emit(
    configuration: &ValidatedConfiguration,
    registry: &FlagRegistry,
    format: OutputFormat,
    annotate: bool,
) -> Result<String, StackError> {
    match format {
        OutputFormat::Header => {
            let emitter = if annotate {
                HeaderEmitter::annotated(registry)
            } else {
                HeaderEmitter::new()
            };
            emitter
                .emit(configuration)
                .map_err(|e| StackError::Serialize(e.to_string()))
        }
        OutputFormat::Json => JsonEmitter
            .emit(configuration)
            .map_err(|e| StackError::Serialize(e.to_string())),
    }
}
