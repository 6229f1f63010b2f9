//! flagstack - layered build-flag resolution
//!
//! Reads a flag catalog and a stack of override layers (`ENABLE`/`DISABLE`
//! lines or C preprocessor `#define`/`#undef` overrides), resolves them by
//! priority with full provenance, validates mutual-exclusion and dependency
//! constraints, and emits the final configuration for the build.

pub mod catalog;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod report;
pub mod source;

pub use flagstack_resolver as resolver;

pub use error::StackError;
pub use manifest::{LayerEntry, StackManifest};
pub use pipeline::{OutputFormat, Resolution, Stack};
pub use report::ResolutionReport;
