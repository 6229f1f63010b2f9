//! Flag catalog file (TOML) describing the registry.
//!
//! ```toml
//! [[flag]]
//! name = "SANBOOT_PROTO_ISCSI"
//! default = "enabled"
//! description = "iSCSI protocol"
//! excludes = ["SANBOOT_PROTO_AOE"]
//! requires = []
//! ```

use flagstack_resolver::{Constraint, FlagDefinition, FlagRegistry, FlagState};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::StackError;
use crate::source::is_valid_name;

/// One `[[flag]]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFlag {
    pub name: String,
    pub default: FlagState,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default)]
    pub requires: Vec<String>,
}

impl From<CatalogFlag> for FlagDefinition {
    fn from(flag: CatalogFlag) -> Self {
        let constraints = flag
            .excludes
            .into_iter()
            .map(Constraint::Excludes)
            .chain(flag.requires.into_iter().map(Constraint::Requires))
            .collect();
        FlagDefinition {
            name: flag.name,
            default_state: flag.default,
            description: flag.description,
            constraints,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    #[serde(rename = "flag", default)]
    pub flags: Vec<CatalogFlag>,
}

impl CatalogFile {
    pub fn from_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Check names and build the registry.
    pub fn into_registry(self) -> Result<FlagRegistry, StackError> {
        if self.flags.is_empty() {
            return Err(StackError::Catalog("catalog defines no flags".to_string()));
        }
        for flag in &self.flags {
            if !is_valid_name(&flag.name) {
                return Err(StackError::Catalog(format!(
                    "invalid flag name '{}'",
                    flag.name
                )));
            }
        }

        let registry = FlagRegistry::new(self.flags.into_iter().map(FlagDefinition::from).collect())?;
        Ok(registry)
    }
}

/// Load a flag registry from a catalog file.
pub fn load_catalog(path: &Path) -> Result<FlagRegistry, StackError> {
    let contents = fs::read_to_string(path).map_err(|source| StackError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let catalog = CatalogFile::from_str(&contents).map_err(|source| StackError::Toml {
        path: path.to_path_buf(),
        source,
    })?;
    let registry = catalog.into_registry()?;
    debug!(path = %path.display(), flags = registry.len(), "loaded catalog");
    Ok(registry)
}
