//! Validation policy carried by every node a factory creates.

use serde::{Deserialize, Serialize};

use crate::Result;

/// How undeclared names are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Undeclared field, attribute or child names fail with `UnknownField`.
    #[default]
    Strict,
    /// Undeclared names are accepted, logged and recorded on the node as
    /// extensions. Declared names are still fully checked.
    Open,
}

/// Model configuration.
///
/// ```json
/// { "validation": "open", "enforce_units": false }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub validation: ValidationMode,
    /// When false the unit-category check is skipped entirely.
    pub enforce_units: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self { validation: ValidationMode::Strict, enforce_units: true }
    }
}

impl ModelConfig {
    /// Open validation, units enforced.
    pub fn open() -> Self {
        Self { validation: ValidationMode::Open, ..Self::default() }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_strict(&self) -> bool {
        self.validation == ValidationMode::Strict
    }
}
