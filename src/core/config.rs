//! Purpose: Environment-level configuration for library and provider discovery.
//! Exports: `EngineConfig`, env var names, default provider name.
//! Role: Single source for override values consumed by resolver and context.
//! Invariants: Unset values mean "let the platform/provider discover it".
//! Invariants: A set-but-empty plugin path is passed through unchanged.
use std::env;
use std::ffi::OsString;

/// Names the native library file, or a directory to search instead of the platform list.
pub const LIBRARY_PATH_ENV: &str = "CONFIUM_LIBRARY_PATH";
/// Provider plugin file for the default provider.
pub const PLUGIN_PATH_ENV: &str = "CFM_HASH_BOTAN_PLUGIN_PATH";
pub const DEFAULT_PLUGIN: &str = "botan";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    plugin_name: String,
    plugin_path: Option<OsString>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            plugin_name: DEFAULT_PLUGIN.to_string(),
            plugin_path: None,
        }
    }

    pub fn from_env() -> Self {
        Self {
            plugin_name: DEFAULT_PLUGIN.to_string(),
            plugin_path: env::var_os(PLUGIN_PATH_ENV),
        }
    }

    pub fn with_plugin_name(mut self, name: impl Into<String>) -> Self {
        self.plugin_name = name.into();
        self
    }

    pub fn with_plugin_path(mut self, path: impl Into<OsString>) -> Self {
        self.plugin_path = Some(path.into());
        self
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    pub fn plugin_path(&self) -> Option<&OsString> {
        self.plugin_path.as_ref()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
