//! The individual checks and their registry.
//!
//! Subprocess checks run the installer against the test directory and then
//! inspect the files it should (or should not) have touched. The UI check
//! drives Claude Code itself through tmux.

use crate::console;
use crate::context::Context;
use crate::tmux::{pause, MIN_HEIGHT, MIN_WIDTH};
use anyhow::Result;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::time::{Duration, SystemTime};

/// Backups older than this do not count as made by this run.
const BACKUP_FRESHNESS: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass(String),
    Fail(String),
    Skip(String),
}

fn pass(msg: impl Into<String>) -> Result<Verdict> {
    Ok(Verdict::Pass(msg.into()))
}

fn fail(msg: impl Into<String>) -> Result<Verdict> {
    Ok(Verdict::Fail(msg.into()))
}

#[derive(Debug)]
pub struct Check {
    pub name: &'static str,
    pub description: &'static str,
    /// Retried up to `--tui-retries` times.
    pub flaky: bool,
    pub needs_tui: bool,
    pub run: fn(&mut Context) -> Result<Verdict>,
}

/// Every check, in the order a full run executes them.
pub const CHECKS: &[Check] = &[
    Check {
        name: "test_script_help",
        description: "Verify --help works and shows correct syntax",
        flaky: false,
        needs_tui: false,
        run: script_help,
    },
    Check {
        name: "test_invalid_format",
        description: "Test error when missing @marketplace",
        flaky: false,
        needs_tui: false,
        run: invalid_format,
    },
    Check {
        name: "test_unknown_marketplace",
        description: "Test error for unknown marketplace",
        flaky: false,
        needs_tui: false,
        run: unknown_marketplace,
    },
    Check {
        name: "test_dry_run",
        description: "Test dry-run mode doesn't modify files",
        flaky: false,
        needs_tui: false,
        run: dry_run,
    },
    Check {
        name: "test_real_install",
        description: "Test actual installation",
        flaky: false,
        needs_tui: false,
        run: real_install,
    },
    Check {
        name: "test_backup_created",
        description: "Verify backup files created",
        flaky: false,
        needs_tui: false,
        run: backup_created,
    },
    Check {
        name: "test_claude_verify",
        description: "Verify plugin in Claude Code TUI (experimental)",
        flaky: true,
        needs_tui: true,
        run: claude_verify,
    },
    Check {
        name: "test_idempotent",
        description: "Test running twice doesn't break",
        flaky: false,
        needs_tui: false,
        run: idempotent,
    },
    Check {
        name: "test_verbosity_levels",
        description: "Test that -v/-vv/-vvv produce different output",
        flaky: false,
        needs_tui: false,
        run: verbosity_levels,
    },
];

pub fn find(name: &str) -> Option<&'static Check> {
    CHECKS.iter().find(|c| c.name == name)
}

/// Run `check`, retrying flaky ones with a shell reset between attempts.
/// An error on the last attempt is returned as-is.
pub fn run_with_retries(check: &Check, ctx: &mut Context, attempts: u32) -> Result<Verdict> {
    let attempts = if check.flaky { attempts.max(1) } else { 1 };
    let mut last = Verdict::Fail("not run".to_string());

    for attempt in 1..=attempts {
        if attempt > 1 {
            console::info(format!("Retry {attempt}/{attempts}..."));
            if !ctx.ensure_shell_ready()? {
                tracing::debug!("Shell prompt not seen after reset");
            }
            pause(1000);
        }

        match (check.run)(ctx) {
            Ok(Verdict::Fail(reason)) => {
                if attempt < attempts {
                    tracing::debug!("Check failed, will retry ({attempt}/{attempts}): {reason}");
                }
                last = Verdict::Fail(reason);
            }
            Ok(verdict) => return Ok(verdict),
            Err(e) if attempt < attempts => {
                tracing::debug!("Check raised an error, will retry: {e:#}");
                last = Verdict::Fail(format!("{e:#}"));
            }
            Err(e) => return Err(e),
        }
    }

    Ok(last)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn read_json(path: &Path) -> Result<Value> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

fn is_enabled(settings: &Value, key: &str) -> bool {
    settings
        .get("enabledPlugins")
        .and_then(|e| e.get(key))
        .and_then(Value::as_bool)
        == Some(true)
}

fn script_help(ctx: &mut Context) -> Result<Verdict> {
    let output = ctx.run_installer(["--help"])?;
    if !output.status.success() {
        return fail(format!("--help returned non-zero: {}", output.status));
    }

    let text = stdout(&output);
    if !text.contains("PLUGIN@MARKETPLACE") {
        return fail("--help missing PLUGIN@MARKETPLACE syntax");
    }
    if text.contains("-m,") || text.contains("--marketplace") {
        return fail("--help still shows a separate -m/--marketplace option");
    }
    pass("--help works correctly with plugin@marketplace syntax")
}

fn invalid_format(ctx: &mut Context) -> Result<Verdict> {
    let output = ctx.run_installer(["-p", ctx.spec.plugin(), "-y"])?;
    if output.status.success() {
        return fail("Should have failed for missing @marketplace");
    }

    let err = stderr(&output).to_lowercase();
    if !err.contains("plugin@marketplace") && !err.contains("invalid") {
        return fail("Error message should mention plugin@marketplace format");
    }
    if !err.contains("available marketplaces") {
        return fail("Error should list available marketplaces");
    }
    pass("Correctly errors on missing @marketplace")
}

fn unknown_marketplace(ctx: &mut Context) -> Result<Verdict> {
    let output = ctx.run_installer(["-p", "plugin@nonexistent-marketplace", "-y"])?;
    if output.status.success() {
        return fail("Should have failed for unknown marketplace");
    }

    let err = stderr(&output).to_lowercase();
    if !err.contains("not found") {
        return fail("Error should say marketplace not found");
    }
    if !err.contains("marketplace add") {
        return fail("Error should provide guidance to add marketplace");
    }
    if !err.contains("feature request") && !err.contains("issue") {
        return fail("Error should mention filing an issue or feature request");
    }
    pass("Correctly errors on unknown marketplace with guidance")
}

fn dry_run(ctx: &mut Context) -> Result<Verdict> {
    let before = mtime(ctx.registry_file());

    let mut args = ctx.target_args();
    args.push("--dry-run".into());
    args.push("-y".into());
    let output = ctx.run_installer(args)?;

    if !output.status.success() {
        return fail(format!("dry-run returned non-zero: {}", output.status));
    }
    if !stdout(&output).contains("DRY RUN") {
        return fail("dry-run output missing 'DRY RUN' indicator");
    }
    if mtime(ctx.registry_file()) != before {
        return fail("dry-run modified installed_plugins.json!");
    }
    if ctx.settings_file().exists() {
        return fail("dry-run created settings file!");
    }
    pass("dry-run works correctly (no files modified)")
}

fn install(ctx: &Context) -> Result<Output> {
    let mut args = ctx.target_args();
    args.push("-y".into());
    ctx.run_installer(args)
}

fn real_install(ctx: &mut Context) -> Result<Verdict> {
    let output = install(ctx)?;
    if !output.status.success() {
        return fail(format!("install returned non-zero: {}", output.status));
    }
    if !stdout(&output).contains("SUCCESS") {
        return fail("install output missing 'SUCCESS' indicator");
    }

    let key = ctx.spec.key();
    if !ctx.settings_file().exists() {
        return fail(format!(
            "settings file not created: {}",
            ctx.settings_file().display()
        ));
    }
    let settings = read_json(ctx.settings_file())?;
    if !is_enabled(&settings, &key) {
        return fail(format!("plugin not in enabledPlugins: {settings}"));
    }

    let registry = read_json(ctx.registry_file())?;
    let Some(records) = registry["plugins"][&key].as_array() else {
        return fail("plugin not in installed_plugins.json");
    };
    let project = ctx.test_dir.display().to_string();
    if !records
        .iter()
        .any(|r| r["projectPath"].as_str() == Some(project.as_str()))
    {
        return fail("project path not found in plugin entries");
    }
    pass("real install works correctly")
}

fn backup_created(ctx: &mut Context) -> Result<Verdict> {
    let Some(dir) = ctx.registry_file().parent() else {
        return fail("registry file has no parent directory");
    };
    let now = SystemTime::now();

    let mut found_any = false;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry
            .file_name()
            .to_string_lossy()
            .starts_with("installed_plugins.json.bak.")
        {
            continue;
        }
        found_any = true;
        let age = entry
            .metadata()?
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();
        if age < BACKUP_FRESHNESS {
            tracing::debug!("Found recent backup: {}", entry.path().display());
            return pass("backup files created correctly");
        }
    }

    if found_any {
        fail("no recent backup found (within 5 minutes)")
    } else {
        fail("no backup files found")
    }
}

fn idempotent(ctx: &mut Context) -> Result<Verdict> {
    let output = install(ctx)?;
    if !output.status.success() {
        return fail(format!("second run returned non-zero: {}", output.status));
    }

    match read_json(ctx.settings_file()) {
        Ok(settings) if is_enabled(&settings, &ctx.spec.key()) => {
            pass("installer is idempotent (safe to run multiple times)")
        }
        Ok(_) => fail("plugin missing from settings after second run"),
        Err(e) => fail(format!("settings file corrupted after second run: {e:#}")),
    }
}

fn verbosity_levels(ctx: &mut Context) -> Result<Verdict> {
    for (flag, marker) in [("-v", "INFO:"), ("-vvv", "TRACE:")] {
        let mut args = ctx.target_args();
        args.push(flag.into());
        args.push("--dry-run".into());
        args.push("-y".into());
        let output = ctx.run_installer(args)?;
        if !stderr(&output).contains(marker) {
            return fail(format!("{flag} should produce {marker} on stderr"));
        }
    }
    pass("verbosity levels work correctly")
}

/// What the plugin screen showed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Sighting {
    pub plugin: bool,
    pub key: bool,
    pub enabled: bool,
    pub installed_tab: bool,
}

const ENABLED_INDICATORS: [&str; 5] = ["enabled", "✔", "✓", "installed", "active"];

pub fn inspect_plugin_screen(content: &str, plugin: &str, key: &str) -> Sighting {
    let lower = content.to_lowercase();
    Sighting {
        plugin: lower.contains(&plugin.to_lowercase()),
        key: lower.contains(&key.to_lowercase()),
        enabled: ENABLED_INDICATORS.iter().any(|i| lower.contains(i)),
        installed_tab: lower.contains("installed"),
    }
}

fn tool_available(program: &str, version_flag: &str) -> bool {
    Command::new(program)
        .arg(version_flag)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn claude_verify(ctx: &mut Context) -> Result<Verdict> {
    if !tool_available("tmux", "-V") {
        return Ok(Verdict::Skip("tmux is not installed".into()));
    }
    if !tool_available("claude", "--version") {
        return Ok(Verdict::Skip("claude is not on PATH".into()));
    }

    if !ctx.settings_file().exists() {
        tracing::debug!("Plugin not installed for test dir, running installation first...");
        let output = install(ctx)?;
        if !output.status.success() {
            return fail("Could not install plugin for TUI verification");
        }
    }

    let plugin = ctx.spec.plugin().to_string();
    let key = ctx.spec.key();
    let test_dir = ctx.test_dir.display().to_string();
    let tmux = ctx.tmux()?;

    if !tmux.ensure_min_size() {
        return fail(format!(
            "Pane too small for TUI test (need {MIN_WIDTH}x{MIN_HEIGHT})"
        ));
    }

    tmux.send_keys(&format!("cd '{test_dir}'"), true)?;
    pause(2000);

    tracing::debug!("Starting Claude Code...");
    tmux.send_keys("claude", true)?;
    pause(4000);

    let content = tmux.capture_pane();
    tracing::debug!("Initial screen:\n{content}");
    if content.to_lowercase().contains("trust") || content.contains("Yes, proceed") {
        tracing::debug!("Trust dialog detected, pressing Enter to confirm...");
        tmux.press("Enter")?;
        pause(5000);
    }

    let started = tmux.wait_until(Duration::from_secs(10), |c| {
        c.contains("Claude Code") || c.contains("Welcome")
    });
    if !started {
        tracing::debug!("Screen content:\n{}", tmux.capture_pane());
        tmux.press("C-c")?;
        pause(1000);
        return fail("Claude Code did not start properly");
    }

    tracing::debug!("Opening /plugin menu...");
    tmux.send_keys("/plugin", true)?;
    if !tmux.wait_for_text("Installed", Duration::from_secs(5)) {
        tracing::debug!("Plugin menu may not have opened, trying again...");
        tmux.press("Escape")?;
        pause(500);
        tmux.send_keys("/plugin", true)?;
        pause(5000);
    }

    tracing::debug!("Navigating to Installed tab...");
    tmux.press("Tab")?;
    pause(2000);
    let mut content = tmux.capture_pane();
    if !content.to_lowercase().contains("installed") {
        tmux.press("Right")?;
        pause(2000);
        content = tmux.capture_pane();
    }

    if !inspect_plugin_screen(&content, &plugin, &key).plugin {
        tracing::debug!("Plugin not visible, scrolling down...");
        for _ in 0..5 {
            tmux.press("Down")?;
            pause(500);
            content = tmux.capture_pane();
            if inspect_plugin_screen(&content, &plugin, &key).plugin {
                break;
            }
        }
    }
    tracing::debug!("Plugin screen:\n{content}");
    let seen = inspect_plugin_screen(&content, &plugin, &key);
    tracing::debug!("{seen:?}");

    tracing::debug!("Exiting Claude Code...");
    tmux.press("Escape")?;
    pause(1000);
    tmux.press("Escape")?;
    pause(1000);
    tmux.send_keys("/exit", true)?;
    pause(3000);
    if !tmux.wait_for_prompt(Duration::from_secs(10)) {
        tracing::debug!("Shell prompt not seen, sending Ctrl-C");
        tmux.press("C-c")?;
        pause(2000);
    }

    if !(seen.plugin || seen.key) {
        return fail(format!("Plugin '{plugin}' not found in TUI"));
    }
    if seen.enabled || seen.installed_tab {
        pass(format!("Plugin '{plugin}' verified in Claude Code TUI"))
    } else {
        pass(format!("Plugin '{plugin}' found in TUI (enabled status unclear)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_order_and_names() {
        let names: Vec<&str> = CHECKS.iter().map(|c| c.name).collect();
        assert_eq!(names.first(), Some(&"test_script_help"));
        assert_eq!(names.last(), Some(&"test_verbosity_levels"));
        assert_eq!(names.len(), names.iter().collect::<HashSet<_>>().len());

        let real = names.iter().position(|n| *n == "test_real_install").unwrap();
        let backup = names.iter().position(|n| *n == "test_backup_created").unwrap();
        let again = names.iter().position(|n| *n == "test_idempotent").unwrap();
        assert!(real < backup && backup < again);
    }

    #[test]
    fn test_only_ui_check_is_flaky() {
        let flaky: Vec<&str> = CHECKS.iter().filter(|c| c.flaky).map(|c| c.name).collect();
        assert_eq!(flaky, vec!["test_claude_verify"]);
        assert!(find("test_claude_verify").unwrap().needs_tui);
        assert!(find("test_dry_run").is_some());
        assert!(find("test_everything").is_none());
    }

    #[test]
    fn test_inspect_plugin_screen() {
        let screen = "  Browse   Installed\n  ❯ superpowers  superpowers-marketplace  ✔ enabled\n";
        let seen = inspect_plugin_screen(screen, "superpowers", "superpowers@superpowers-marketplace");
        assert!(seen.plugin);
        assert!(!seen.key);
        assert!(seen.enabled);
        assert!(seen.installed_tab);

        let seen = inspect_plugin_screen("Browse plugins\n", "superpowers", "x@y");
        assert_eq!(seen, Sighting::default());
    }

    #[test]
    fn test_settings_key_lookup() {
        let settings = serde_json::json!({"enabledPlugins": {"a@b": true}});
        assert!(is_enabled(&settings, "a@b"));
        assert!(!is_enabled(&settings, "a@c"));
        assert!(!is_enabled(&serde_json::json!({}), "a@b"));
    }

    #[test]
    fn test_settings_key_must_be_true() {
        let disabled = serde_json::json!({"enabledPlugins": {"a@b": false}});
        assert!(!is_enabled(&disabled, "a@b"));
        let stringly = serde_json::json!({"enabledPlugins": {"a@b": "true"}});
        assert!(!is_enabled(&stringly, "a@b"));
    }
}
