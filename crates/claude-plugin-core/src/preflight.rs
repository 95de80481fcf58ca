//! Precondition checks run before anything is modified.
//!
//! Every check runs even when an earlier one fails, so the operator sees the
//! whole list of problems at once.

use crate::document;
use crate::error::CoreError;
use crate::paths::ClaudePaths;
use crate::registry;
use crate::spec::PluginSpec;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// One failed precondition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreflightIssue {
    RegistryMissing(PathBuf),
    MarketplacesMissing(PathBuf),
    MarketplacesMalformed(String),
    MarketplaceNotRegistered {
        marketplace: String,
        known: Vec<String>,
    },
    CacheMissing {
        path: PathBuf,
        marketplace: String,
    },
}

impl fmt::Display for PreflightIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreflightIssue::RegistryMissing(path) => {
                write!(f, "installed_plugins.json not found at: {}", path.display())
            }
            PreflightIssue::MarketplacesMissing(path) => {
                write!(f, "known_marketplaces.json not found at: {}", path.display())
            }
            PreflightIssue::MarketplacesMalformed(detail) => {
                write!(f, "Invalid JSON in known_marketplaces.json: {detail}")
            }
            PreflightIssue::MarketplaceNotRegistered { marketplace, known } => {
                write!(
                    f,
                    "Marketplace '{marketplace}' not found in known_marketplaces.json. \
                     Register it first with: /plugin marketplace add <owner>/<repo> \
                     (available marketplaces: {}). \
                     If this marketplace should work as-is, please open an issue or feature request.",
                    list_or_none(known)
                )
            }
            PreflightIssue::CacheMissing { path, marketplace } => {
                write!(
                    f,
                    "Plugin cache not found at: {}. The marketplace may not have been synced. \
                     Try: /plugin marketplace update {marketplace}",
                    path.display()
                )
            }
        }
    }
}

/// Outcome of [`verify`].
#[derive(Debug, Clone, Default)]
pub struct Preflight {
    pub issues: Vec<PreflightIssue>,
    /// Registration entry of the target marketplace, when found.
    pub marketplace_entry: Option<Value>,
    /// Subdirectory names under the plugin cache, newest first.
    pub cached_versions: Vec<String>,
}

impl Preflight {
    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

/// Check registry files, marketplace registration and plugin cache.
pub fn verify(paths: &ClaudePaths, spec: &PluginSpec) -> Preflight {
    let mut report = Preflight::default();

    if paths.installed_plugins.is_file() {
        tracing::debug!(path = %paths.installed_plugins.display(), "found installed_plugins.json");
    } else {
        report
            .issues
            .push(PreflightIssue::RegistryMissing(paths.installed_plugins.clone()));
    }

    if !paths.known_marketplaces.is_file() {
        report
            .issues
            .push(PreflightIssue::MarketplacesMissing(paths.known_marketplaces.clone()));
    } else {
        match document::read_object(&paths.known_marketplaces) {
            Ok(marketplaces) => match marketplaces.get(spec.marketplace()) {
                Some(entry) => {
                    tracing::debug!(
                        marketplace = spec.marketplace(),
                        config = %entry,
                        "marketplace is registered"
                    );
                    report.marketplace_entry = Some(entry.clone());
                }
                None => report.issues.push(PreflightIssue::MarketplaceNotRegistered {
                    marketplace: spec.marketplace().to_string(),
                    known: marketplaces.keys().cloned().collect(),
                }),
            },
            Err(CoreError::MalformedJson { source, .. }) => report
                .issues
                .push(PreflightIssue::MarketplacesMalformed(source.to_string())),
            Err(other) => report
                .issues
                .push(PreflightIssue::MarketplacesMalformed(other.to_string())),
        }
    }

    if paths.plugin_cache.is_dir() {
        report.cached_versions = registry::cached_versions(&paths.plugin_cache);
        tracing::debug!(versions = ?report.cached_versions, "found plugin cache");
    } else {
        report.issues.push(PreflightIssue::CacheMissing {
            path: paths.plugin_cache.clone(),
            marketplace: spec.marketplace().to_string(),
        });
    }

    report
}

/// Names registered in `known_marketplaces.json`, in file order.
///
/// Used for hints, so any failure degrades to an empty list.
pub fn known_marketplaces(path: &Path) -> Vec<String> {
    match document::read_object(path) {
        Ok(map) => map.keys().cloned().collect(),
        Err(e) => {
            tracing::debug!(error = %e, "could not list known marketplaces");
            Vec::new()
        }
    }
}

fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::Scope;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ClaudePaths, PluginSpec) {
        let dir = tempfile::tempdir().unwrap();
        let spec: PluginSpec = "superpowers@superpowers-marketplace".parse().unwrap();
        let home = dir.path().join("home");
        let project = dir.path().join("project");
        let paths = ClaudePaths::resolve(&home, &project, Scope::ProjectLocal, &spec);
        (dir, paths, spec)
    }

    fn populate(paths: &ClaudePaths) {
        fs::create_dir_all(paths.plugin_cache.join("4.0.3")).unwrap();
        fs::write(&paths.installed_plugins, r#"{"version": 2, "plugins": {}}"#).unwrap();
        fs::write(
            &paths.known_marketplaces,
            r#"{"superpowers-marketplace": {"source": {"source": "github", "repo": "obra/superpowers-marketplace"}}}"#,
        )
        .unwrap();
    }

    #[test]
    fn test_everything_present_passes() {
        let (_dir, paths, spec) = setup();
        populate(&paths);

        let report = verify(&paths, &spec);
        assert!(report.passed(), "{:?}", report.issues);
        assert_eq!(report.cached_versions, vec!["4.0.3".to_string()]);
        assert!(report.marketplace_entry.is_some());
    }

    #[test]
    fn test_empty_home_collects_all_errors() {
        let (_dir, paths, spec) = setup();

        let report = verify(&paths, &spec);
        assert!(!report.passed());
        assert_eq!(report.issues.len(), 3);
        assert!(matches!(report.issues[0], PreflightIssue::RegistryMissing(_)));
        assert!(matches!(report.issues[1], PreflightIssue::MarketplacesMissing(_)));
        assert!(matches!(report.issues[2], PreflightIssue::CacheMissing { .. }));
    }

    #[test]
    fn test_malformed_marketplaces_reported_not_fatal() {
        let (_dir, paths, spec) = setup();
        populate(&paths);
        fs::write(&paths.known_marketplaces, "{ broken").unwrap();

        let report = verify(&paths, &spec);
        assert_eq!(report.issues.len(), 1);
        assert!(matches!(
            report.issues[0],
            PreflightIssue::MarketplacesMalformed(_)
        ));
        assert!(report.messages()[0].starts_with("Invalid JSON in known_marketplaces.json"));
    }

    #[test]
    fn test_unknown_marketplace_message() {
        let (_dir, paths, _) = setup();
        populate(&paths);
        let other: PluginSpec = "plugin@nonexistent-marketplace".parse().unwrap();
        let paths = ClaudePaths::resolve(
            &paths.claude_home,
            &paths.project_path,
            Scope::ProjectLocal,
            &other,
        );

        let report = verify(&paths, &other);
        let text = report.messages().join("\n").to_lowercase();
        assert!(text.contains("not found"));
        assert!(text.contains("marketplace add"));
        assert!(text.contains("feature request"));
        assert!(text.contains("superpowers-marketplace"));
    }

    #[test]
    fn test_known_marketplaces_in_file_order() {
        let (_dir, paths, _) = setup();
        fs::create_dir_all(paths.known_marketplaces.parent().unwrap()).unwrap();
        fs::write(&paths.known_marketplaces, r#"{"zeta": {}, "alpha": {}}"#).unwrap();
        assert_eq!(
            known_marketplaces(&paths.known_marketplaces),
            vec!["zeta".to_string(), "alpha".to_string()]
        );
        assert!(known_marketplaces(&paths.claude_home.join("missing.json")).is_empty());
    }
}
