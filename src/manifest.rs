//! Stack manifest (TOML): the catalog plus an explicit list of layers.
//!
//! ```toml
//! catalog = "catalog.toml"
//!
//! [[layer]]
//! id = "common"
//! priority = 0
//! path = "layers/common.h"
//!
//! [[layer]]
//! id = "hua"
//! priority = 10
//! path = "layers/general.hua.h"
//! ```
//!
//! Relative paths are resolved against the manifest's directory.

use flagstack_resolver::DEFAULT_SOURCE;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::StackError;

/// One `[[layer]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerEntry {
    pub id: String,
    pub priority: i64,
    pub path: PathBuf,
}

/// Parses the CLI form `ID:PRIORITY:PATH`.
impl FromStr for LayerEntry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (Some(id), Some(priority), Some(path)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(format!("expected ID:PRIORITY:PATH, got '{}'", s));
        };
        let priority = priority
            .parse::<i64>()
            .map_err(|e| format!("invalid priority '{}': {}", priority, e))?;
        Ok(Self {
            id: id.to_string(),
            priority,
            path: PathBuf::from(path),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackManifest {
    pub catalog: PathBuf,

    #[serde(rename = "layer", default)]
    pub layers: Vec<LayerEntry>,
}

impl StackManifest {
    /// Load a manifest and resolve its relative paths.
    pub fn from_file(path: &Path) -> Result<Self, StackError> {
        let contents = fs::read_to_string(path).map_err(|source| StackError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut manifest = Self::from_str(&contents).map_err(|source| StackError::Toml {
            path: path.to_path_buf(),
            source,
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        manifest.rebase(base);
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn from_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    fn rebase(&mut self, base: &Path) {
        if self.catalog.is_relative() {
            self.catalog = base.join(&self.catalog);
        }
        for layer in &mut self.layers {
            if layer.path.is_relative() {
                layer.path = base.join(&layer.path);
            }
        }
    }

    /// Layer ids must be non-empty, unique and distinct from `"default"`.
    pub fn validate(&self) -> Result<(), StackError> {
        validate_layer_entries(&self.layers)
    }
}

pub fn validate_layer_entries(entries: &[LayerEntry]) -> Result<(), StackError> {
    let mut seen = HashSet::new();
    for entry in entries {
        if entry.id.trim().is_empty() {
            return Err(StackError::Manifest("layer id cannot be empty".to_string()));
        }
        if entry.id == DEFAULT_SOURCE {
            return Err(StackError::Manifest(format!(
                "layer id '{}' is reserved",
                DEFAULT_SOURCE
            )));
        }
        if !seen.insert(entry.id.as_str()) {
            return Err(StackError::Manifest(format!(
                "layer id '{}' is used more than once",
                entry.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_layer_entry_from_cli() {
        let entry: LayerEntry = "hua:10:layers/general.hua.h".parse().unwrap();
        assert_eq!(entry.id, "hua");
        assert_eq!(entry.priority, 10);
        assert_eq!(entry.path, PathBuf::from("layers/general.hua.h"));

        let entry: LayerEntry = "base:-1:C:/layers/base.h".parse().unwrap();
        assert_eq!(entry.priority, -1);
        assert_eq!(entry.path, PathBuf::from("C:/layers/base.h"));

        assert!("hua:ten:path".parse::<LayerEntry>().is_err());
        assert!("hua:10".parse::<LayerEntry>().is_err());
    }

    #[test]
    fn test_manifest_paths_rebased() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stack.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "catalog = \"catalog.toml\"").unwrap();
        writeln!(file, "[[layer]]").unwrap();
        writeln!(file, "id = \"common\"").unwrap();
        writeln!(file, "priority = 0").unwrap();
        writeln!(file, "path = \"layers/common.h\"").unwrap();

        let manifest = StackManifest::from_file(&path).unwrap();
        assert_eq!(manifest.catalog, dir.path().join("catalog.toml"));
        assert_eq!(manifest.layers[0].path, dir.path().join("layers/common.h"));
    }

    #[test]
    fn test_manifest_duplicate_ids() {
        let manifest = StackManifest::from_str(
            r#"
catalog = "c.toml"
[[layer]]
id = "a"
priority = 0
path = "a.h"
[[layer]]
id = "a"
priority = 1
path = "b.h"
"#,
        )
        .unwrap();
        assert!(matches!(manifest.validate(), Err(StackError::Manifest(_))));
    }

    #[test]
    fn test_manifest_reserved_id() {
        let entries = vec![LayerEntry {
            id: "default".to_string(),
            priority: 0,
            path: PathBuf::from("x.h"),
        }];
        let err = validate_layer_entries(&entries).unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }
}
