//! Layered build-flag resolution.
//!
//! Merges an ordered stack of partial override layers over a registry of
//! flag defaults, producing one fully resolved configuration with
//! provenance, then checks it against mutual-exclusion and dependency
//! constraints. Only a configuration that passed validation can be emitted.
//!
//! ```
//! use flagstack_resolver::{
//!     resolve, validate, Assertion, FlagDefinition, FlagRegistry, FlagState, Layer, LayerSet,
//! };
//!
//! let registry = FlagRegistry::new(vec![
//!     FlagDefinition::new("A", FlagState::Disabled).excludes("B"),
//!     FlagDefinition::new("B", FlagState::Disabled),
//! ])
//! .unwrap();
//! let layers = LayerSet::new(vec![
//!     Layer::new("base", 0, vec![Assertion::enable("A")]).unwrap(),
//!     Layer::new("override", 10, vec![Assertion::disable("A")]).unwrap(),
//! ])
//! .unwrap();
//!
//! let config = resolve(&registry, &layers).unwrap();
//! assert_eq!(config.get("A").unwrap().source, "override");
//! assert!(validate(&config, &registry).is_empty());
//! ```

mod emit;
mod error;
mod layer;
mod registry;
mod resolve;
mod state;
mod validate;

pub use emit::{ConfigurationEmitter, HeaderEmitter, JsonEmitter};
pub use error::FlagError;
pub use layer::{Assertion, Layer, LayerSet, Setting};
pub use registry::{Constraint, FlagDefinition, FlagRegistry};
pub use resolve::{resolve, ResolvedConfiguration, ResolvedEntry, ResolvedSetting, DEFAULT_SOURCE};
pub use state::FlagState;
pub use validate::{validate, ConstraintKind, ValidatedConfiguration, Violation};
