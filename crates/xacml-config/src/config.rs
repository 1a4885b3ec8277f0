//! Configuration file structures
//!
//! ```toml
//! default_pdp = "main"
//!
//! [registry]
//! use_standard_functions = true
//!
//! [[pdp.main.policy_finder]]
//! kind = "directory"
//! path = "policies"
//!
//! [[pdp.main.resource_finder]]
//! kind = "hierarchy"
//! children = { "docs" = ["docs/a", "docs/b"] }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level configuration from a PDP config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// PDP used when none is named explicitly.
    #[serde(default)]
    pub default_pdp: Option<String>,

    /// Named PDP definitions.
    #[serde(default)]
    pub pdp: BTreeMap<String, PdpSection>,

    /// Which built-in tables the shared registry starts from.
    #[serde(default)]
    pub registry: RegistrySection,
}

/// One `[pdp.<name>]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdpSection {
    #[serde(default)]
    pub policy_finder: Vec<ModuleEntry>,

    #[serde(default)]
    pub attribute_finder: Vec<ModuleEntry>,

    #[serde(default)]
    pub resource_finder: Vec<ModuleEntry>,
}

/// A finder module: its registered kind plus whatever settings that kind reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub kind: String,

    #[serde(flatten)]
    pub settings: toml::Table,
}

impl ModuleEntry {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            settings: toml::Table::new(),
        }
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }
}

/// `[registry]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySection {
    /// Start from the standard XACML datatypes.
    #[serde(default = "default_true")]
    pub use_standard_datatypes: bool,

    /// Start from the standard XACML function library.
    #[serde(default = "default_true")]
    pub use_standard_functions: bool,

    /// Start from the standard combining algorithms.
    #[serde(default = "default_true")]
    pub use_standard_algorithms: bool,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            use_standard_datatypes: true,
            use_standard_functions: true,
            use_standard_algorithms: true,
        }
    }
}

fn default_true() -> bool {
    true
}
