//! `enabledPlugins` in a Claude Code settings file.

use crate::document;
use crate::error::{CoreError, CoreResult};
use crate::spec::PluginSpec;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

const ENABLED_PLUGINS: &str = "enabledPlugins";

/// What [`enable_plugin`] found and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsChange {
    /// The settings file did not exist and was created.
    pub created: bool,
    /// The key was already mapped to `true`.
    pub already_enabled: bool,
}

/// Set `enabledPlugins[<plugin@marketplace>] = true`, creating the file and
/// its parent directory when needed. Every other key is left alone.
pub fn enable_plugin(path: &Path, spec: &PluginSpec) -> CoreResult<SettingsChange> {
    let created = !path.exists();

    let mut doc = if created {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CoreError::io("create directory", parent, e))?;
        }
        Map::new()
    } else {
        document::read_object(path)?
    };

    let enabled = doc
        .entry(ENABLED_PLUGINS)
        .or_insert_with(|| Value::Object(Map::new()));
    let enabled = match enabled {
        Value::Object(map) => map,
        other => {
            return Err(CoreError::shape(
                path,
                format!(
                    "\"{ENABLED_PLUGINS}\" is {}, expected an object",
                    document::kind(other)
                ),
            ))
        }
    };

    let already_enabled = enabled.get(&spec.key()) == Some(&Value::Bool(true));
    enabled.insert(spec.key(), Value::Bool(true));

    let doc = Value::Object(doc);
    tracing::debug!(settings = %doc, "settings after update");
    document::write(path, &doc, true)?;

    Ok(SettingsChange {
        created,
        already_enabled,
    })
}

/// Whether `path` currently enables `spec`.
pub fn is_enabled(path: &Path, spec: &PluginSpec) -> bool {
    document::read(path)
        .ok()
        .and_then(|doc| doc.get(ENABLED_PLUGINS)?.get(spec.key())?.as_bool())
        .unwrap_or(false)
}
