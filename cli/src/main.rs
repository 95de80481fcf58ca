mod config;
mod console;
mod error;
mod install;
mod logging;
mod platform;
mod prompt;
mod report;

use crate::config::Config;
use crate::error::{is_interrupted, InstallError};
use crate::install::{InstallOptions, Outcome};
use crate::prompt::{AutoConfirm, Confirmer, InteractiveConfirmer};
use crate::report::DebugReport;
use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use claude_plugin_core::{preflight, PluginSpec, Scope};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const AFTER_HELP: &str = "\
Scopes:
  project-local   <project>/.claude/settings.local.json (default, not committed)
  project-shared  <project>/.claude/settings.json (committed, shared with the team)
  user            <claude home>/settings.json (all projects)

Examples:
  claude-plugin-install -p superpowers@superpowers-marketplace
  claude-plugin-install -p superpowers@superpowers-marketplace --dry-run -vv
  claude-plugin-install -p superpowers@superpowers-marketplace --scope user -y

Related issues:
  https://github.com/anthropics/claude-code/issues/20593  (wrong marketplace matched)
  https://github.com/anthropics/claude-code/issues/14202  (projectPath scope issues)
  https://github.com/obra/superpowers-marketplace/issues/11  (workaround tracking)";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScopeArg {
    ProjectLocal,
    ProjectShared,
    User,
}

impl From<ScopeArg> for Scope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::ProjectLocal => Scope::ProjectLocal,
            ScopeArg::ProjectShared => Scope::ProjectShared,
            ScopeArg::User => Scope::User,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "claude-plugin-install",
    about = "Install a Claude Code plugin by its full plugin@marketplace name",
    long_about = "Registers a plugin in installed_plugins.json and enables it in a settings \
                  file, matching on the marketplace as well as the plugin name. Both files \
                  are backed up before they are changed.",
    version,
    author,
    after_help = AFTER_HELP
)]
struct Args {
    /// Plugin to install, qualified by its marketplace
    #[arg(short, long, value_name = "PLUGIN@MARKETPLACE")]
    plugin: String,

    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long = "yes", visible_alias = "non-interactive")]
    yes: bool,

    /// Diagnostics on stderr: -v info, -vv debug, -vvv trace
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Where to enable the plugin [default: project-local]
    #[arg(long, value_enum)]
    scope: Option<ScopeArg>,

    /// Show what would change without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Project directory [default: current directory]
    #[arg(short = 'd', long, value_name = "PATH")]
    project_path: Option<PathBuf>,

    /// Claude Code configuration directory [default: ~/.claude]
    #[arg(long, value_name = "PATH")]
    claude_home: Option<PathBuf>,

    /// Read settings from this file instead of the default config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = logging::init(args.verbose) {
        eprintln!("Warning: {e:#}");
    }

    match run(&args) {
        Ok(outcome) => {
            tracing::info!(?outcome, "finished");
            ExitCode::SUCCESS
        }
        Err(err) if is_interrupted(&err) => {
            eprintln!();
            console::error("Interrupted by user");
            ExitCode::from(130)
        }
        Err(err) => match err.downcast_ref::<InstallError>() {
            Some(install_err) => {
                tracing::debug!(error = %install_err, "install failed");
                ExitCode::from(install_err.exit_code())
            }
            None => {
                console::error(format!("Unexpected error: {err:#}"));
                DebugReport::new(format!("Unexpected error: {err:#}"), args.claude_home.as_deref())
                    .with("plugin", &args.plugin)
                    .with("dry_run", args.dry_run)
                    .print();
                ExitCode::FAILURE
            }
        },
    }
}

fn run(args: &Args) -> Result<Outcome> {
    let config = match (Config::load(args.config.as_deref()), &args.config) {
        (Ok(config), _) => config,
        (Err(e), Some(_)) => return Err(e),
        (Err(e), None) => {
            console::warn(format!("Failed to load configuration: {e:#}"));
            console::warn("Using default configuration...");
            Config::default()
        }
    };

    let claude_home = config.claude_home(args.claude_home.as_deref())?;
    let spec = parse_plugin(&args.plugin, &claude_home)?;
    let scope = match args.scope {
        Some(scope) => scope.into(),
        None => config.default_scope().unwrap_or_else(|e| {
            console::warn(format!("{e:#}, using {}", Scope::default()));
            Scope::default()
        }),
    };
    let project_path = resolve_project_path(args.project_path.as_deref())?;

    let opts = InstallOptions {
        spec,
        scope,
        project_path,
        claude_home,
        dry_run: args.dry_run,
    };

    let mut confirmer: Box<dyn Confirmer> = if args.yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(InteractiveConfirmer::default())
    };
    install::run(&opts, confirmer.as_mut())
}

/// Parse `-p`, listing the registered marketplaces when it is malformed.
fn parse_plugin(input: &str, claude_home: &Path) -> Result<PluginSpec> {
    input.parse::<PluginSpec>().or_else(|e| {
        tracing::debug!(error = %e, "rejected plugin argument");
        let known = preflight::known_marketplaces(
            &claude_home.join("plugins").join("known_marketplaces.json"),
        );
        let known = if known.is_empty() {
            "(none found)".to_string()
        } else {
            known.join(", ")
        };

        console::error(format!(
            "Invalid plugin '{input}': use the plugin@marketplace format"
        ));
        eprintln!("  Example: -p superpowers@superpowers-marketplace");
        eprintln!("  Available marketplaces: {known}");
        Err(InstallError::InvalidPlugin(input.to_string()).into())
    })
}

fn resolve_project_path(arg: Option<&Path>) -> Result<PathBuf> {
    let path = match arg {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    path.canonicalize()
        .or_else(|_| std::path::absolute(&path))
        .with_context(|| format!("Failed to resolve project path {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_verbosity_counts() {
        let args = Args::try_parse_from(["claude-plugin-install", "-p", "a@b", "-vvv"]).unwrap();
        assert_eq!(args.verbose, 3);
        assert!(!args.yes);
    }

    #[test]
    fn test_non_interactive_alias() {
        let args =
            Args::try_parse_from(["claude-plugin-install", "-p", "a@b", "--non-interactive"])
                .unwrap();
        assert!(args.yes);
    }

    #[test]
    fn test_scope_values() {
        let args = Args::try_parse_from([
            "claude-plugin-install",
            "-p",
            "a@b",
            "--scope",
            "project-shared",
        ])
        .unwrap();
        assert_eq!(Scope::from(args.scope.unwrap()), Scope::ProjectShared);
        assert!(Args::try_parse_from(["claude-plugin-install", "-p", "a@b", "--scope", "global"]).is_err());
    }

    #[test]
    fn test_plugin_is_required() {
        assert!(Args::try_parse_from(["claude-plugin-install", "-y"]).is_err());
    }

    #[test]
    fn test_parse_plugin_rejects_bare_name() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_plugin("superpowers", dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InstallError>(),
            Some(InstallError::InvalidPlugin(input)) if input == "superpowers"
        ));
        assert_eq!(
            parse_plugin("superpowers@superpowers-marketplace", dir.path())
                .unwrap()
                .key(),
            "superpowers@superpowers-marketplace"
        );
    }

    #[test]
    fn test_project_path_is_canonical() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a");
        std::fs::create_dir(&nested).unwrap();
        let resolved = resolve_project_path(Some(&nested.join("..").join("a"))).unwrap();
        assert_eq!(resolved, nested.canonicalize().unwrap());
    }
}
