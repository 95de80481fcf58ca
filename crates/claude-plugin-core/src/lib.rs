//! # claude-plugin-core
//!
//! Building blocks for registering a Claude Code plugin by hand.
//!
//! Claude Code matches plugins by bare name when installing, so a plugin
//! published under the same name by two marketplaces can end up installed
//! from the wrong one, or reported as "already installed". This crate
//! performs the edits the install command would have made, keyed by the
//! full `plugin@marketplace` identifier.
//!
//! ## Overview
//!
//! - [`ClaudePaths`] - where the registry, marketplace list, plugin cache and
//!   settings file live for a given [`Scope`]
//! - [`preflight::verify`] - precondition checks that collect every problem
//! - [`registry`] - installation state and append-only record edits
//! - [`settings`] - `enabledPlugins` edits
//! - [`backup`] - timestamped, checksum-verified copies
//! - [`CoreError`] - error type for all of the above
//!
//! ## Example
//!
//! ```no_run
//! use claude_plugin_core::{backup, registry, settings, ClaudePaths, PluginSpec, Scope};
//! use std::path::Path;
//!
//! # fn main() -> claude_plugin_core::CoreResult<()> {
//! let spec: PluginSpec = "superpowers@superpowers-marketplace".parse()?;
//! let paths = ClaudePaths::resolve(
//!     Path::new("/home/me/.claude"),
//!     Path::new("/work/project"),
//!     Scope::ProjectLocal,
//!     &spec,
//! );
//!
//! let report = claude_plugin_core::preflight::verify(&paths, &spec);
//! if report.passed() {
//!     let now = chrono::Local::now();
//!     let stamp = backup::timestamp(now);
//!     for target in paths.targets() {
//!         backup::backup_file(target, &stamp)?;
//!     }
//!     let version = registry::latest_cached_version(&paths.plugin_cache);
//!     let record = registry::InstallRecord::new(&paths, Scope::ProjectLocal, &version, now);
//!     registry::append_record(&paths.installed_plugins, &spec, &record)?;
//!     settings::enable_plugin(&paths.settings, &spec)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod backup;
pub mod document;
pub mod error;
pub mod paths;
pub mod preflight;
pub mod registry;
pub mod settings;
pub mod spec;

pub use error::{CoreError, CoreResult};
pub use paths::{ClaudePaths, Scope};
pub use preflight::{Preflight, PreflightIssue};
pub use registry::{InstallRecord, InstallState};
pub use settings::SettingsChange;
pub use spec::PluginSpec;
