//! Flag state type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Final or asserted state of a boolean build flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagState {
    Enabled,
    Disabled,
}

impl FlagState {
    pub fn is_enabled(self) -> bool {
        matches!(self, FlagState::Enabled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FlagState::Enabled => "enabled",
            FlagState::Disabled => "disabled",
        }
    }
}

impl fmt::Display for FlagState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlagState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enabled" => Ok(FlagState::Enabled),
            "disabled" => Ok(FlagState::Disabled),
            other => Err(format!("invalid flag state '{}': expected enabled or disabled", other)),
        }
    }
}
