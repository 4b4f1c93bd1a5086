//! Serializer configuration
//!
//! Loaded from defaults, then an optional TOML file, then `CLASSKIT_*`
//! environment variables.

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "CLASSKIT_";

/// Serialization settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializeConfig {
    /// Leave editor-only properties out of envelopes (player builds)
    pub strip_editor_only: bool,
    /// Pretty-print JSON text output
    pub pretty: bool,
}

impl SerializeConfig {
    /// Settings for shipping builds: editor data stripped, compact output
    pub fn player() -> Self {
        Self {
            strip_editor_only: true,
            pretty: false,
        }
    }

    /// Load configuration, layering an optional TOML file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX)).extract()
    }
}
