//! Resolution error types.

use crate::validate::Violation;
use thiserror::Error;

/// Errors raised while building a registry or layer set, resolving, or
/// validating a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagError {
    /// An assertion or lookup named a flag the registry does not define.
    #[error("unknown flag '{name}'{}", asserted_by(.layer))]
    UnknownFlag { name: String, layer: Option<String> },

    #[error("flag '{name}' is defined more than once")]
    DuplicateFlagDefinition { name: String },

    #[error("flag '{flag}' has a constraint on unregistered flag '{target}'")]
    DanglingConstraint { flag: String, target: String },

    #[error("flag '{flag}' has a constraint on itself")]
    SelfReferentialConstraint { flag: String },

    #[error("layers '{first}' and '{second}' share priority {priority}")]
    DuplicatePriority {
        priority: i64,
        first: String,
        second: String,
    },

    /// Layer identifiers must be non-empty and distinct from `"default"`.
    #[error("layer identifier '{layer}' is empty or reserved")]
    InvalidLayerIdentifier { layer: String },

    #[error("layer identifier '{layer}' is used more than once")]
    DuplicateLayerIdentifier { layer: String },

    #[error("layer '{layer}' asserts '{flag}' with conflicting values")]
    DuplicateAssertionInLayer { layer: String, flag: String },

    /// A valued setting used the name of a registered boolean flag.
    #[error("layer '{layer}' assigns a value to registered flag '{name}'")]
    SettingNamesFlag { layer: String, name: String },

    /// A configuration was checked against a registry it was not resolved from.
    #[error("configuration does not match the registry at flag '{flag}'")]
    RegistryMismatch { flag: String },

    #[error("{} constraint violation(s)", .0.len())]
    ConstraintViolation(Vec<Violation>),
}

fn asserted_by(layer: &Option<String>) -> String {
    match layer {
        Some(layer) => format!(" asserted by layer '{}'", layer),
        None => String::new(),
    }
}

impl FlagError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            FlagError::UnknownFlag { .. } => "UNKNOWN_FLAG",
            FlagError::DuplicateFlagDefinition { .. } => "DUPLICATE_FLAG_DEFINITION",
            FlagError::DanglingConstraint { .. } => "DANGLING_CONSTRAINT",
            FlagError::SelfReferentialConstraint { .. } => "SELF_REFERENTIAL_CONSTRAINT",
            FlagError::DuplicatePriority { .. } => "DUPLICATE_PRIORITY",
            FlagError::InvalidLayerIdentifier { .. } => "INVALID_LAYER_IDENTIFIER",
            FlagError::DuplicateLayerIdentifier { .. } => "DUPLICATE_LAYER_IDENTIFIER",
            FlagError::DuplicateAssertionInLayer { .. } => "DUPLICATE_ASSERTION_IN_LAYER",
            FlagError::SettingNamesFlag { .. } => "SETTING_NAMES_FLAG",
            FlagError::RegistryMismatch { .. } => "REGISTRY_MISMATCH",
            FlagError::ConstraintViolation(_) => "CONSTRAINT_VIOLATION",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_flag_message() {
        let err = FlagError::UnknownFlag {
            name: "NET_PROTO_FOO".to_string(),
            layer: Some("profile".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "unknown flag 'NET_PROTO_FOO' asserted by layer 'profile'"
        );

        let err = FlagError::UnknownFlag {
            name: "NET_PROTO_FOO".to_string(),
            layer: None,
        };
        assert_eq!(err.to_string(), "unknown flag 'NET_PROTO_FOO'");
        assert_eq!(err.code(), "UNKNOWN_FLAG");
    }

    #[test]
    fn test_duplicate_priority_message() {
        let err = FlagError::DuplicatePriority {
            priority: 10,
            first: "common".to_string(),
            second: "device".to_string(),
        };
        assert!(err.to_string().contains("priority 10"));
    }
}
