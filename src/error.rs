//! Error type for loading and resolving a flag stack.

use flagstack_resolver::FlagError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::source::SourceError;

#[derive(Debug, Error)]
pub enum StackError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", .path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: SourceError,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid catalog: {0}")]
    Catalog(String),

    #[error("invalid manifest: {0}")]
    Manifest(String),

    #[error(transparent)]
    Flag(#[from] FlagError),

    #[error("serialization failed: {0}")]
    Serialize(String),
}

impl StackError {
    /// Process exit code for the CLI: 2 for constraint violations, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            StackError::Flag(FlagError::ConstraintViolation(_)) => 2,
            _ => 1,
        }
    }
}
