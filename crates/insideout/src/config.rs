//! Configuration for a registry

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Scan every namespace when an instance's own namespace is unknown
    #[serde(default = "default_true")]
    pub fallback_scan: bool,

    /// Accept a second declaration of an existing attribute name.
    ///
    /// When set, the later accessor replaces the earlier one in the
    /// namespace's accessor table and the name is listed twice.
    #[serde(default)]
    pub allow_redeclare: bool,

    /// Wire end-of-life cleanup for newly created namespaces
    #[serde(default = "default_true")]
    pub auto_cleanup: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            fallback_scan: true,
            allow_redeclare: false,
            auto_cleanup: true,
        }
    }
}

impl RegistryConfig {
    /// Parse a JSON configuration document; missing fields take defaults.
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Configuration for the strict profile: no fallback scan.
    pub fn strict() -> Self {
        Self {
            fallback_scan: false,
            ..Self::default()
        }
    }
}

fn default_true() -> bool {
    true
}
