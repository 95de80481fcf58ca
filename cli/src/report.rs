use crate::console;
use crate::platform::Platform;
use chrono::Local;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Tracking issue for the plugin name-collision workaround.
pub const ISSUE_URL: &str = "https://github.com/obra/superpowers-marketplace/issues/11";

/// Everything a maintainer needs to reproduce a failed run.
#[derive(Debug, Serialize)]
pub struct DebugReport {
    timestamp: String,
    tool_version: &'static str,
    platform: Value,
    cwd: Option<PathBuf>,
    claude_home: Option<PathBuf>,
    error_context: String,
    relevant_state: Map<String, Value>,
}

impl DebugReport {
    pub fn new(error_context: impl Into<String>, claude_home: Option<&Path>) -> Self {
        Self {
            timestamp: Local::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION"),
            platform: Platform::detect().summary(),
            cwd: std::env::current_dir().ok(),
            claude_home: claude_home.map(Path::to_path_buf),
            error_context: error_context.into(),
            relevant_state: Map::new(),
        }
    }

    /// Adds one entry to `relevant_state`. Values that fail to serialize are
    /// recorded as their error text.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or_else(|e| Value::String(e.to_string()));
        self.relevant_state.insert(key.to_string(), value);
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }

    /// Banner, fenced JSON and the issue link, all on stderr.
    pub fn print(&self) {
        console::failure_banner();
        eprintln!();
        eprintln!("```json");
        eprintln!("{}", self.to_json());
        eprintln!("```");
        eprintln!();
        eprintln!("Please report at: {ISSUE_URL}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_fields() {
        let report = DebugReport::new("Assumption verification failed", Some(Path::new("/h/.claude")))
            .with("scope", "project-local")
            .with("errors", vec!["a", "b"]);

        let value: Value = serde_json::from_str(&report.to_json()).unwrap();
        for key in [
            "timestamp",
            "tool_version",
            "platform",
            "cwd",
            "claude_home",
            "error_context",
            "relevant_state",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["claude_home"], "/h/.claude");
        assert_eq!(value["error_context"], "Assumption verification failed");
        assert_eq!(
            value["relevant_state"],
            json!({"scope": "project-local", "errors": ["a", "b"]})
        );
        assert_eq!(value["platform"]["os"], std::env::consts::OS);
    }

    #[test]
    fn test_state_keeps_insertion_order() {
        let report = DebugReport::new("x", None).with("zeta", 1).with("alpha", 2);
        let keys: Vec<&String> = report.relevant_state.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }
}
