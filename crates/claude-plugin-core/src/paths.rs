//! File locations touched by an install.

use crate::spec::PluginSpec;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Where the plugin gets enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scope {
    /// This user, this project only (`.claude/settings.local.json`, gitignored).
    #[default]
    ProjectLocal,
    /// Everyone working on this project (`.claude/settings.json`, committed).
    ProjectShared,
    /// This user, every project (`~/.claude/settings.json`).
    User,
}

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::ProjectLocal, Scope::ProjectShared, Scope::User];

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::ProjectLocal => "project-local",
            Scope::ProjectShared => "project-shared",
            Scope::User => "user",
        }
    }

    /// Value written to the `scope` field of a registry record.
    pub fn record_scope(self) -> &'static str {
        match self {
            Scope::User => "user",
            Scope::ProjectLocal | Scope::ProjectShared => "local",
        }
    }

    pub fn is_global(self) -> bool {
        self == Scope::User
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "project-local" => Ok(Scope::ProjectLocal),
            "project-shared" => Ok(Scope::ProjectShared),
            "user" => Ok(Scope::User),
            other => Err(format!(
                "invalid scope '{other}'; expected project-local, project-shared or user"
            )),
        }
    }
}

/// Resolved locations for one install.
///
/// Nothing here touches the filesystem. The Claude home directory is passed
/// in so the whole layout can be pointed at a temporary directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaudePaths {
    pub claude_home: PathBuf,
    pub project_path: PathBuf,
    pub installed_plugins: PathBuf,
    pub known_marketplaces: PathBuf,
    pub plugin_cache: PathBuf,
    pub settings: PathBuf,
    pub project_claude_dir: PathBuf,
}

impl ClaudePaths {
    pub fn resolve(claude_home: &Path, project_path: &Path, scope: Scope, spec: &PluginSpec) -> Self {
        let plugins_dir = claude_home.join("plugins");
        let project_claude_dir = project_path.join(".claude");

        let settings = match scope {
            Scope::User => claude_home.join("settings.json"),
            Scope::ProjectShared => project_claude_dir.join("settings.json"),
            Scope::ProjectLocal => project_claude_dir.join("settings.local.json"),
        };

        Self {
            claude_home: claude_home.to_path_buf(),
            project_path: project_path.to_path_buf(),
            installed_plugins: plugins_dir.join("installed_plugins.json"),
            known_marketplaces: plugins_dir.join("known_marketplaces.json"),
            plugin_cache: plugins_dir
                .join("cache")
                .join(spec.marketplace())
                .join(spec.plugin()),
            settings,
            project_claude_dir,
        }
    }

    /// Files rewritten by a real run, in the order they are modified.
    pub fn targets(&self) -> [&Path; 2] {
        [&self.installed_plugins, &self.settings]
    }

    /// Logical name / path pairs, for plans and debug reports.
    pub fn entries(&self) -> Vec<(&'static str, &Path)> {
        vec![
            ("installed_plugins", self.installed_plugins.as_path()),
            ("known_marketplaces", self.known_marketplaces.as_path()),
            ("plugin_cache", self.plugin_cache.as_path()),
            ("settings", self.settings.as_path()),
            ("project_claude_dir", self.project_claude_dir.as_path()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> PluginSpec {
        "superpowers@superpowers-marketplace".parse().unwrap()
    }

    #[test]
    fn test_registry_paths_under_home() {
        let paths = ClaudePaths::resolve(
            Path::new("/home/u/.claude"),
            Path::new("/work/proj"),
            Scope::ProjectLocal,
            &spec(),
        );
        assert_eq!(
            paths.installed_plugins,
            PathBuf::from("/home/u/.claude/plugins/installed_plugins.json")
        );
        assert_eq!(
            paths.known_marketplaces,
            PathBuf::from("/home/u/.claude/plugins/known_marketplaces.json")
        );
        assert_eq!(
            paths.plugin_cache,
            PathBuf::from("/home/u/.claude/plugins/cache/superpowers-marketplace/superpowers")
        );
        assert_eq!(paths.project_claude_dir, PathBuf::from("/work/proj/.claude"));
    }

    #[test]
    fn test_settings_path_per_scope() {
        let home = Path::new("/home/u/.claude");
        let project = Path::new("/work/proj");
        let settings = |scope| ClaudePaths::resolve(home, project, scope, &spec()).settings;

        assert_eq!(
            settings(Scope::ProjectLocal),
            PathBuf::from("/work/proj/.claude/settings.local.json")
        );
        assert_eq!(
            settings(Scope::ProjectShared),
            PathBuf::from("/work/proj/.claude/settings.json")
        );
        assert_eq!(
            settings(Scope::User),
            PathBuf::from("/home/u/.claude/settings.json")
        );
    }

    #[test]
    fn test_scope_round_trip_and_default() {
        for scope in Scope::ALL {
            assert_eq!(scope.as_str().parse::<Scope>(), Ok(scope));
        }
        assert_eq!(Scope::default(), Scope::ProjectLocal);
        assert!("global".parse::<Scope>().is_err());
    }

    #[test]
    fn test_record_scope() {
        assert_eq!(Scope::User.record_scope(), "user");
        assert_eq!(Scope::ProjectLocal.record_scope(), "local");
        assert_eq!(Scope::ProjectShared.record_scope(), "local");
    }
}
