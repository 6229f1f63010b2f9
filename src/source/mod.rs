//! Layer sources: reading override files into resolver layers.

mod parser;

pub use parser::{is_valid_name, parse_layer_source, Directive, ParsedSource, SourceError, SourceLine};

use flagstack_resolver::Layer;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::StackError;

/// Provenance of one loaded layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSource {
    pub id: String,
    pub priority: i64,

    /// File the layer was read from.
    pub path: String,

    /// SHA-256 of the raw file bytes.
    pub digest: String,

    /// Number of flag assertions after deduplication.
    pub assertions: usize,

    /// Number of valued settings.
    pub settings: usize,
}

/// A layer together with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedLayer {
    pub layer: Layer,
    pub source: LayerSource,
}

impl ParsedSource {
    /// Build a resolver layer from the parsed directives.
    pub fn into_layer(self, id: &str, priority: i64) -> Result<Layer, StackError> {
        let layer = Layer::new(id, priority, self.assertions().cloned())?
            .with_settings(self.settings().cloned())?;
        Ok(layer)
    }
}

/// Read, digest and parse one layer source file.
pub fn load_layer(id: &str, priority: i64, path: &Path) -> Result<LoadedLayer, StackError> {
    let bytes = fs::read(path).map_err(|source| StackError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let text = String::from_utf8(bytes).map_err(|e| {
        let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
        let line = valid.iter().filter(|&&b| b == b'\n').count() + 1;
        StackError::Source {
            path: path.to_path_buf(),
            source: SourceError::Encoding { line },
        }
    })?;

    let parsed = parse_layer_source(&text).map_err(|source| StackError::Source {
        path: path.to_path_buf(),
        source,
    })?;
    let layer = parsed.into_layer(id, priority)?;

    debug!(
        layer = id,
        priority,
        path = %path.display(),
        assertions = layer.assertions().len(),
        settings = layer.settings().len(),
        "loaded layer source"
    );

    Ok(LoadedLayer {
        source: LayerSource {
            id: id.to_string(),
            priority,
            path: path.to_string_lossy().to_string(),
            digest,
            assertions: layer.assertions().len(),
            settings: layer.settings().len(),
        },
        layer,
    })
}
