use anyhow::{Context, Result};
use claude_plugin_core::Scope;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable Claude Code itself reads to relocate `~/.claude`.
pub const CLAUDE_HOME_ENV: &str = "CLAUDE_CONFIG_DIR";

/// Optional settings for claude-plugin-install
///
/// Read from `config.toml` in the platform config directory. Every field is
/// optional; command-line flags take precedence over anything set here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Location overrides
    #[serde(default)]
    pub paths: PathsConfig,
    /// Defaults for flags that were not given
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    pub claude_home: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    pub scope: Option<String>,
}

impl Config {
    /// Load `explicit` if given (it must exist), otherwise the default
    /// location. A missing default file yields the defaults; nothing is
    /// written back.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (config_path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => (Self::config_path()?, false),
        };

        if !config_path.exists() {
            if required {
                anyhow::bail!("Config file not found: {:?}", config_path);
            }
            tracing::debug!("No config file at {:?}, using defaults", config_path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {:?}", config_path))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", config_path))?;
        tracing::debug!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to find config directory")?;

        Ok(config_dir.join("claude-plugin-install").join("config.toml"))
    }

    /// Claude home: flag, then `CLAUDE_CONFIG_DIR`, then config file, then
    /// `~/.claude`.
    pub fn claude_home(&self, from_cli: Option<&Path>) -> Result<PathBuf> {
        self.resolve_claude_home(from_cli, std::env::var_os(CLAUDE_HOME_ENV))
    }

    fn resolve_claude_home(
        &self,
        from_cli: Option<&Path>,
        from_env: Option<OsString>,
    ) -> Result<PathBuf> {
        if let Some(path) = from_cli {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = from_env.filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        if let Some(ref path) = self.paths.claude_home {
            return Ok(path.clone());
        }
        let home = dirs::home_dir().context("Failed to find home directory")?;
        Ok(home.join(".claude"))
    }

    /// Scope to use when `--scope` was not given.
    pub fn default_scope(&self) -> Result<Scope> {
        match self.defaults.scope.as_deref() {
            Some(value) => value
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context("Invalid defaults.scope in config"),
            None => Ok(Scope::default()),
        }
    }
}
