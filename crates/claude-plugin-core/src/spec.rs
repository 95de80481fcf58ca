//! `plugin@marketplace` identifiers.
//!
//! Claude Code keys both `installed_plugins.json` and `enabledPlugins` by a
//! composite string so that two plugins with the same name in different
//! marketplaces stay distinct.

use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::str::FromStr;

/// A plugin qualified by the marketplace that publishes it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PluginSpec {
    plugin: String,
    marketplace: String,
}

impl PluginSpec {
    pub fn new(plugin: impl Into<String>, marketplace: impl Into<String>) -> CoreResult<Self> {
        let plugin = plugin.into();
        let marketplace = marketplace.into();
        if plugin.trim().is_empty() || marketplace.trim().is_empty() {
            return Err(CoreError::InvalidPluginSpec(format!("{plugin}@{marketplace}")));
        }
        Ok(Self {
            plugin,
            marketplace,
        })
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn marketplace(&self) -> &str {
        &self.marketplace
    }

    /// The composite key used in both registry and settings documents.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl FromStr for PluginSpec {
    type Err = CoreError;

    /// Splits on the first `@`; both halves must be non-empty.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('@') {
            Some((plugin, marketplace)) if !plugin.is_empty() && !marketplace.is_empty() => {
                Ok(Self {
                    plugin: plugin.to_string(),
                    marketplace: marketplace.to_string(),
                })
            }
            _ => Err(CoreError::InvalidPluginSpec(s.to_string())),
        }
    }
}

impl fmt::Display for PluginSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.plugin, self.marketplace)
    }
}
