//! `installed_plugins.json`: inspection and append-only edits.

use crate::document;
use crate::error::{CoreError, CoreResult};
use crate::paths::{ClaudePaths, Scope};
use crate::spec::PluginSpec;
use chrono::{DateTime, Local, SecondsFormat};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use std::time::SystemTime;

/// Version recorded when the plugin cache has no version directories.
pub const UNKNOWN_VERSION: &str = "unknown";

/// A registry entry as written by this tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallRecord {
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,
    pub install_path: String,
    pub version: String,
    pub installed_at: String,
    pub last_updated: String,
}

impl InstallRecord {
    pub fn new(paths: &ClaudePaths, scope: Scope, version: &str, now: DateTime<Local>) -> Self {
        let timestamp = now.to_rfc3339_opts(SecondsFormat::Micros, false);
        Self {
            scope: scope.record_scope().to_string(),
            project_path: (!scope.is_global()).then(|| paths.project_path.display().to_string()),
            install_path: paths.plugin_cache.join(version).display().to_string(),
            version: version.to_string(),
            installed_at: timestamp.clone(),
            last_updated: timestamp,
        }
    }
}

/// What the registry already says about this plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    NotInstalled,
    /// A `user`-scope record exists.
    Global,
    /// A record exists whose `projectPath` is this project.
    ThisProject,
}

impl InstallState {
    pub fn is_installed(self) -> bool {
        self != InstallState::NotInstalled
    }
}

/// Scan existing records for `spec`. First match wins.
///
/// A registry that cannot be read is reported as not installed; the write
/// step surfaces the real error.
pub fn installation_state(paths: &ClaudePaths, spec: &PluginSpec) -> InstallState {
    let doc = match document::read(&paths.installed_plugins) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!(error = %e, "could not inspect installed_plugins.json");
            return InstallState::NotInstalled;
        }
    };

    let Some(records) = doc
        .get("plugins")
        .and_then(|p| p.get(spec.key()))
        .and_then(Value::as_array)
    else {
        return InstallState::NotInstalled;
    };

    let project = paths.project_path.display().to_string();
    for record in records {
        if record.get("scope").and_then(Value::as_str) == Some("user") {
            return InstallState::Global;
        }
        if record.get("projectPath").and_then(Value::as_str) == Some(project.as_str()) {
            return InstallState::ThisProject;
        }
    }

    InstallState::NotInstalled
}

/// Append `record` under `spec`'s key and rewrite the document.
///
/// Existing records are never touched. Returns how many records the key
/// holds afterwards.
pub fn append_record(path: &Path, spec: &PluginSpec, record: &InstallRecord) -> CoreResult<usize> {
    let mut doc = document::read_object(path)?;

    let plugins = doc
        .entry("plugins")
        .or_insert_with(|| Value::Object(Map::new()));
    let plugins = match plugins {
        Value::Object(map) => map,
        other => {
            return Err(CoreError::shape(
                path,
                format!("\"plugins\" is {}, expected an object", document::kind(other)),
            ))
        }
    };

    let entries = plugins
        .entry(spec.key())
        .or_insert_with(|| Value::Array(Vec::new()));
    let entries = match entries {
        Value::Array(list) => list,
        other => {
            return Err(CoreError::shape(
                path,
                format!("\"{}\" is {}, expected an array", spec.key(), document::kind(other)),
            ))
        }
    };

    let value = serde_json::to_value(record).map_err(|source| CoreError::MalformedJson {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(entry = %value, "appending registry entry");
    entries.push(value);
    let count = entries.len();

    document::write(path, &Value::Object(doc), false)?;
    Ok(count)
}

/// Subdirectory names of the plugin cache, most recently modified first.
pub fn cached_versions(cache: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(cache) else {
        return Vec::new();
    };

    let mut versions: Vec<(SystemTime, String)> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| {
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, entry.file_name().to_string_lossy().into_owned())
        })
        .collect();

    versions.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    versions.into_iter().map(|(_, name)| name).collect()
}

/// Newest cached version, or [`UNKNOWN_VERSION`].
pub fn latest_cached_version(cache: &Path) -> String {
    cached_versions(cache)
        .into_iter()
        .next()
        .unwrap_or_else(|| UNKNOWN_VERSION.to_string())
}

/// Number of records currently stored under `spec`, for before/after reporting.
pub fn record_count(path: &Path, spec: &PluginSpec) -> usize {
    document::read(path)
        .ok()
        .and_then(|doc| {
            doc.get("plugins")
                .and_then(|p| p.get(spec.key()))
                .and_then(Value::as_array)
                .map(Vec::len)
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    fn setup(scope: Scope) -> (TempDir, ClaudePaths, PluginSpec) {
        let dir = tempfile::tempdir().unwrap();
        let spec: PluginSpec = "superpowers@superpowers-marketplace".parse().unwrap();
        let paths = ClaudePaths::resolve(
            &dir.path().join("home"),
            &dir.path().join("project"),
            scope,
            &spec,
        );
        fs::create_dir_all(&paths.plugin_cache).unwrap();
        (dir, paths, spec)
    }

    fn write_registry(paths: &ClaudePaths, value: Value) {
        fs::write(&paths.installed_plugins, value.to_string()).unwrap();
    }

    fn read_registry(paths: &ClaudePaths) -> Value {
        serde_json::from_str(&fs::read_to_string(&paths.installed_plugins).unwrap()).unwrap()
    }

    #[test]
    fn test_local_record_shape() {
        let (_dir, paths, _) = setup(Scope::ProjectLocal);
        let record = InstallRecord::new(&paths, Scope::ProjectLocal, "4.0.3", Local::now());
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["scope"], "local");
        assert_eq!(value["projectPath"], paths.project_path.display().to_string());
        assert_eq!(value["version"], "4.0.3");
        assert_eq!(
            value["installPath"],
            paths.plugin_cache.join("4.0.3").display().to_string()
        );
        assert_eq!(value["installedAt"], value["lastUpdated"]);
    }

    #[test]
    fn test_user_record_has_no_project_path() {
        let (_dir, paths, _) = setup(Scope::User);
        let record = InstallRecord::new(&paths, Scope::User, "1.0.0", Local::now());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["scope"], "user");
        assert!(value.get("projectPath").is_none());
    }

    #[test]
    fn test_append_preserves_existing_records_and_keys() {
        let (_dir, paths, spec) = setup(Scope::ProjectLocal);
        let existing = json!({"scope": "local", "projectPath": "/elsewhere", "custom": 7});
        write_registry(
            &paths,
            json!({"version": 2, "plugins": {spec.key(): [existing.clone()], "other@m": []}}),
        );

        let record = InstallRecord::new(&paths, Scope::ProjectLocal, "4.0.3", Local::now());
        let count = append_record(&paths.installed_plugins, &spec, &record).unwrap();
        assert_eq!(count, 2);

        let doc = read_registry(&paths);
        assert_eq!(doc["version"], 2);
        assert_eq!(doc["plugins"][spec.key()][0], existing);
        assert_eq!(doc["plugins"][spec.key()][1]["version"], "4.0.3");
        assert!(doc["plugins"]["other@m"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_append_creates_missing_containers() {
        let (_dir, paths, spec) = setup(Scope::ProjectLocal);
        write_registry(&paths, json!({}));

        let record = InstallRecord::new(&paths, Scope::ProjectLocal, "unknown", Local::now());
        assert_eq!(append_record(&paths.installed_plugins, &spec, &record).unwrap(), 1);
        assert_eq!(record_count(&paths.installed_plugins, &spec), 1);
    }

    #[test]
    fn test_append_twice_duplicates() {
        let (_dir, paths, spec) = setup(Scope::ProjectLocal);
        write_registry(&paths, json!({"plugins": {}}));
        let record = InstallRecord::new(&paths, Scope::ProjectLocal, "1.0.0", Local::now());
        append_record(&paths.installed_plugins, &spec, &record).unwrap();
        append_record(&paths.installed_plugins, &spec, &record).unwrap();
        assert_eq!(record_count(&paths.installed_plugins, &spec), 2);
    }

    #[test]
    fn test_append_rejects_malformed_and_wrong_shape() {
        let (_dir, paths, spec) = setup(Scope::ProjectLocal);
        let record = InstallRecord::new(&paths, Scope::ProjectLocal, "1.0.0", Local::now());

        fs::write(&paths.installed_plugins, "not json").unwrap();
        assert!(matches!(
            append_record(&paths.installed_plugins, &spec, &record),
            Err(CoreError::MalformedJson { .. })
        ));

        write_registry(&paths, json!({"plugins": {spec.key(): "oops"}}));
        assert!(matches!(
            append_record(&paths.installed_plugins, &spec, &record),
            Err(CoreError::UnexpectedShape { .. })
        ));
        // Nothing was rewritten on failure.
        assert_eq!(read_registry(&paths)["plugins"][spec.key()], "oops");
    }

    #[test]
    fn test_installation_state() {
        let (_dir, paths, spec) = setup(Scope::ProjectLocal);
        let project = paths.project_path.display().to_string();

        assert_eq!(installation_state(&paths, &spec), InstallState::NotInstalled);

        write_registry(&paths, json!({"plugins": {"superpowers@other": [{"scope": "user"}]}}));
        assert_eq!(installation_state(&paths, &spec), InstallState::NotInstalled);

        write_registry(
            &paths,
            json!({"plugins": {spec.key(): [{"scope": "local", "projectPath": "/else"}]}}),
        );
        assert_eq!(installation_state(&paths, &spec), InstallState::NotInstalled);

        write_registry(
            &paths,
            json!({"plugins": {spec.key(): [{"scope": "local", "projectPath": project}]}}),
        );
        assert_eq!(installation_state(&paths, &spec), InstallState::ThisProject);

        write_registry(
            &paths,
            json!({"plugins": {spec.key(): [{"scope": "user"}, {"scope": "local", "projectPath": project}]}}),
        );
        assert_eq!(installation_state(&paths, &spec), InstallState::Global);

        fs::write(&paths.installed_plugins, "garbage").unwrap();
        assert_eq!(installation_state(&paths, &spec), InstallState::NotInstalled);
    }

    #[cfg(unix)]
    #[test]
    fn test_latest_cached_version_by_mtime() {
        let (_dir, paths, _) = setup(Scope::ProjectLocal);
        assert_eq!(latest_cached_version(&paths.plugin_cache), UNKNOWN_VERSION);

        let old = paths.plugin_cache.join("4.1.0");
        let new = paths.plugin_cache.join("3.9.0");
        fs::create_dir(&old).unwrap();
        fs::create_dir(&new).unwrap();
        fs::write(paths.plugin_cache.join("README.md"), "not a version").unwrap();

        let base = SystemTime::now();
        File::open(&old)
            .unwrap()
            .set_modified(base - Duration::from_secs(3600))
            .unwrap();
        File::open(&new).unwrap().set_modified(base).unwrap();

        assert_eq!(latest_cached_version(&paths.plugin_cache), "3.9.0");
        assert_eq!(
            cached_versions(&paths.plugin_cache),
            vec!["3.9.0".to_string(), "4.1.0".to_string()]
        );
        assert_eq!(
            latest_cached_version(&paths.claude_home.join("absent")),
            UNKNOWN_VERSION
        );
    }
}
