mod checks;
mod console;
mod context;
mod tmux;

use crate::checks::{Check, Verdict};
use crate::console::Tally;
use crate::context::Context;
use anyhow::Result;
use clap::Parser;
use crossterm::style::Stylize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = "\
Examples:
  claude-plugin-harness --skip-tui
  claude-plugin-harness -t claudetesting:0
  claude-plugin-harness test_dry_run test_real_install
  claude-plugin-harness -p my-plugin@my-marketplace -v
  claude-plugin-harness -l";

#[derive(Parser, Debug)]
#[command(
    name = "claude-plugin-harness",
    about = "Test suite for claude-plugin-install",
    version,
    after_help = AFTER_HELP
)]
struct Args {
    /// Checks to run, in order [default: all]
    tests: Vec<String>,

    /// Plugin to install during the checks
    #[arg(
        short,
        long,
        value_name = "PLUGIN@MARKETPLACE",
        default_value = "superpowers@superpowers-marketplace"
    )]
    plugin: String,

    /// Project directory to install into [default: a new temp directory]
    #[arg(short, long, value_name = "DIR")]
    directory: Option<PathBuf>,

    /// Existing tmux window on the --socket server, e.g. claudetesting:0
    #[arg(short = 't', long, value_name = "TARGET")]
    tmux_target: Option<String>,

    /// tmux server socket, created under the temp directory
    #[arg(short = 'S', long, default_value = "claudetesting")]
    socket: String,

    /// Show debug output
    #[arg(short, long)]
    verbose: bool,

    /// List available checks and exit
    #[arg(short, long)]
    list: bool,

    /// Keep the temp test directory afterwards
    #[arg(long)]
    keep_temp: bool,

    /// Skip checks that drive Claude Code through tmux
    #[arg(long)]
    skip_tui: bool,

    /// Attempts for flaky UI checks
    #[arg(long, default_value_t = 3)]
    tui_retries: u32,

    /// Installer binary [default: claude-plugin-install next to this binary]
    #[arg(long, value_name = "PATH")]
    installer: Option<PathBuf>,

    /// Claude Code configuration directory, passed to the installer
    #[arg(long, value_name = "PATH")]
    claude_home: Option<PathBuf>,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::from_default_env().add_directive("claude_plugin_harness=debug".parse()?)
    } else {
        EnvFilter::from_default_env().add_directive("claude_plugin_harness=info".parse()?)
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if args.list {
        list_checks();
        return Ok(ExitCode::SUCCESS);
    }

    let mut selected = match select_checks(&args.tests) {
        Ok(selected) => selected,
        Err(name) => {
            console::error(format!("Unknown test '{name}'"));
            println!("Run with -l to see available tests");
            return Ok(ExitCode::FAILURE);
        }
    };
    if args.skip_tui {
        let before = selected.len();
        selected.retain(|c| !c.needs_tui);
        if selected.len() != before {
            console::info("Skipping TUI tests (--skip-tui)");
        }
    }

    console::banner();

    let mut ctx = match Context::new(&args) {
        Ok(ctx) => ctx,
        Err(e) => {
            console::error(format!("{e:#}"));
            return Ok(ExitCode::FAILURE);
        }
    };

    console::info(format!("Plugin: {}", ctx.spec));
    console::info(format!("Installer: {}", ctx.installer.display()));
    console::info(format!("Test directory: {}", ctx.test_dir.display()));
    console::info(format!("tmux socket: {}", args.socket));
    console::info(format!(
        "Tests to run: {}",
        selected.iter().map(|c| c.name).collect::<Vec<_>>().join(", ")
    ));

    let tally = run_checks(&selected, &mut ctx, args.verbose);
    ctx.cleanup();

    tally.print();
    Ok(if tally.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Checks named on the command line, or all of them. Returns the first
/// unknown name as the error.
fn select_checks(names: &[String]) -> Result<Vec<&'static Check>, String> {
    if names.is_empty() {
        return Ok(checks::CHECKS.iter().collect());
    }
    names
        .iter()
        .map(|name| checks::find(name).ok_or_else(|| name.clone()))
        .collect()
}

fn run_checks(selected: &[&Check], ctx: &mut Context, verbose: bool) -> Tally {
    let mut tally = Tally::default();

    for check in selected {
        console::check_header(check.name);
        let retries = ctx.tui_retries;
        if check.flaky {
            tracing::debug!("Flaky test, will retry up to {retries} times");
        }

        match checks::run_with_retries(check, ctx, retries) {
            Ok(Verdict::Pass(msg)) => {
                console::pass(msg);
                tally.passed += 1;
            }
            Ok(Verdict::Skip(msg)) => {
                console::skip(msg);
                tally.skipped += 1;
            }
            Ok(Verdict::Fail(msg)) => {
                console::fail(msg);
                tally.failed += 1;
            }
            Err(e) => {
                if verbose {
                    console::fail(format!("Exception in {}: {e:?}", check.name));
                } else {
                    console::fail(format!("Exception in {}: {e:#}", check.name));
                }
                tally.failed += 1;
            }
        }
    }

    tally
}

fn list_checks() {
    println!();
    println!("Available tests:");
    println!();
    for check in checks::CHECKS {
        println!("  {}", check.name.cyan());
        println!("    {}", check.description);
        println!();
    }
}
