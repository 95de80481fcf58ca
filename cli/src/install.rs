//! The install sequence: plan, confirm, verify, back up, edit, report.
//!
//! Dry runs return before the final confirmation, so nothing below that point
//! can run without both a passed preflight and an explicit yes.

use crate::console;
use crate::error::InstallError;
use crate::prompt::Confirmer;
use crate::report::DebugReport;
use anyhow::Result;
use chrono::Local;
use claude_plugin_core::{
    backup, preflight, registry, settings, ClaudePaths, CoreError, InstallRecord, InstallState,
    PluginSpec, Scope,
};
use serde_json::{json, Map, Value};
use std::path::PathBuf;

pub const CLOSED_PROMPT: &str = "Have you closed Claude Code in this directory?";
pub const REINSTALL_PROMPT: &str = "Plugin appears to be already installed. Continue anyway?";
pub const PROCEED_PROMPT: &str = "Proceed with modifications?";

#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub spec: PluginSpec,
    pub scope: Scope,
    /// Already canonicalized.
    pub project_path: PathBuf,
    pub claude_home: PathBuf,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Installed { backups: Vec<PathBuf> },
    DryRun,
    /// The operator answered no to one of the prompts.
    Declined,
}

pub fn run(opts: &InstallOptions, confirmer: &mut dyn Confirmer) -> Result<Outcome> {
    let paths = ClaudePaths::resolve(&opts.claude_home, &opts.project_path, opts.scope, &opts.spec);
    let key = opts.spec.key();

    console::banner();
    console::info(format!("Plugin: {key}"));
    console::info(format!("Project path: {}", paths.project_path.display()));
    console::info(format!("Scope: {}", opts.scope));
    console::info(format!("Claude home: {}", paths.claude_home.display()));
    tracing::info!(plugin = %key, scope = %opts.scope, "starting install");
    for (name, path) in paths.entries() {
        tracing::trace!(name, path = %path.display(), "resolved path");
    }
    if opts.dry_run {
        console::warn("DRY RUN MODE - No changes will be made");
    }

    console::step("Pre-flight checks");
    console::close_host_warning();
    if !confirmer.confirm(CLOSED_PROMPT)? {
        console::info("Close Claude Code in this directory, then run this command again.");
        return Ok(Outcome::Declined);
    }

    console::step("Verifying assumptions");
    let checks = preflight::verify(&paths, &opts.spec);
    if !checks.passed() {
        let messages = checks.messages();
        for message in &messages {
            console::error(message);
        }
        state_report(&paths, opts, "Assumption verification failed")
            .with("errors", &messages)
            .print();
        return Err(InstallError::Preflight(messages.len()).into());
    }
    console::ok(format!("Found {}", paths.installed_plugins.display()));
    console::ok(format!(
        "Marketplace '{}' is registered",
        opts.spec.marketplace()
    ));
    console::ok(format!(
        "Plugin cache found with {} version(s)",
        checks.cached_versions.len()
    ));

    console::step("Checking current installation status");
    let state = registry::installation_state(&paths, &opts.spec);
    tracing::debug!(?state, "installation state");
    match state {
        InstallState::NotInstalled => console::ok("Not installed for this project yet"),
        InstallState::Global => console::warn(format!("{key} is already installed at user scope")),
        InstallState::ThisProject => console::warn(format!(
            "{key} is already installed for {}",
            paths.project_path.display()
        )),
    }
    if state.is_installed() && !confirmer.confirm(REINSTALL_PROMPT)? {
        console::info("Exiting without changes.");
        return Ok(Outcome::Declined);
    }

    console::step("Files to be modified");
    for target in paths.targets() {
        let status = if target.exists() {
            "exists"
        } else {
            "will be created"
        };
        println!("  - {} ({status})", target.display());
    }

    if opts.dry_run {
        println!();
        console::info("DRY RUN: Would modify the above files");
        return Ok(Outcome::DryRun);
    }

    if !confirmer.confirm(PROCEED_PROMPT)? {
        console::info("Exiting without changes.");
        return Ok(Outcome::Declined);
    }

    let now = Local::now();

    console::step("Creating backups");
    let stamp = backup::timestamp(now);
    let mut backups = Vec::new();
    for target in paths.targets() {
        let created = backup::backup_file(target, &stamp)
            .map_err(|e| abort(&paths, opts, "create a backup", e))?;
        match created {
            Some(path) => {
                console::ok(format!("Backed up to {}", path.display()));
                backups.push(path);
            }
            None => console::info(format!(
                "No backup needed for {} (does not exist yet)",
                target.display()
            )),
        }
    }

    console::step("Applying modifications");
    let version = registry::latest_cached_version(&paths.plugin_cache);
    let record = InstallRecord::new(&paths, opts.scope, &version, now);
    tracing::debug!(?record, "new registry record");
    let count = registry::append_record(&paths.installed_plugins, &opts.spec, &record)
        .map_err(|e| abort(&paths, opts, "update installed_plugins.json", e))?;
    console::ok(format!(
        "Recorded {key} version {version} in installed_plugins.json ({count} record(s))"
    ));

    let change = settings::enable_plugin(&paths.settings, &opts.spec)
        .map_err(|e| abort(&paths, opts, "update the settings file", e))?;
    let settings_file = paths.settings.display();
    if change.created {
        console::ok(format!("Created {settings_file} with {key} enabled"));
    } else if change.already_enabled {
        console::ok(format!("{key} was already enabled in {settings_file}"));
    } else {
        console::ok(format!("Enabled {key} in {settings_file}"));
    }

    console::success(&key, &backups);
    Ok(Outcome::Installed { backups })
}

/// Report a failed write and turn it into the error `main` maps to exit 1.
/// Earlier edits stay in place; the backups are the way back.
fn abort(
    paths: &ClaudePaths,
    opts: &InstallOptions,
    action: &'static str,
    source: CoreError,
) -> InstallError {
    console::error(format!("Failed to {action}: {source}"));
    state_report(paths, opts, format!("Failed to {action}"))
        .with("error", source.to_string())
        .print();
    InstallError::Write { action, source }
}

fn state_report(paths: &ClaudePaths, opts: &InstallOptions, context: impl Into<String>) -> DebugReport {
    let locations: Map<String, Value> = paths
        .entries()
        .into_iter()
        .map(|(name, path)| {
            (
                name.to_string(),
                json!({"path": path.display().to_string(), "exists": path.exists()}),
            )
        })
        .collect();

    DebugReport::new(context, Some(&paths.claude_home))
        .with("plugin", opts.spec.key())
        .with("scope", opts.scope.as_str())
        .with("project_path", &paths.project_path)
        .with("dry_run", opts.dry_run)
        .with("paths", locations)
}
