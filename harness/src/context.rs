use crate::console;
use crate::tmux::{pause, Tmux};
use crate::Args;
use anyhow::{bail, Context as _, Result};
use claude_plugin_core::{ClaudePaths, PluginSpec, Scope};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Duration;
use tempfile::TempDir;

/// State shared by every check in one harness run.
pub struct Context {
    pub spec: PluginSpec,
    pub installer: PathBuf,
    /// Passed through to the installer when given on the command line.
    claude_home_arg: Option<PathBuf>,
    /// Where the files under test live, for project-local scope.
    pub paths: ClaudePaths,
    pub test_dir: PathBuf,
    temp_dir: Option<TempDir>,
    keep_temp: bool,
    pub tui_retries: u32,
    tmux_target: Option<String>,
    socket: String,
    tmux: Option<Tmux>,
}

impl Context {
    pub fn new(args: &Args) -> Result<Self> {
        let spec: PluginSpec = args
            .plugin
            .parse()
            .with_context(|| format!("Invalid --plugin '{}'", args.plugin))?;

        let installer = match &args.installer {
            Some(path) => path.clone(),
            None => default_installer()?,
        };
        if !installer.is_file() {
            bail!(
                "Installer not found: {} (build it first or pass --installer)",
                installer.display()
            );
        }

        let claude_home = match &args.claude_home {
            Some(path) => path.clone(),
            None => default_claude_home()?,
        };

        let (test_dir, temp_dir) = match &args.directory {
            Some(dir) => {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
                (dir.canonicalize()?, None)
            }
            None => {
                let parent = std::env::temp_dir().join("claude-tui");
                fs::create_dir_all(&parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
                let temp = tempfile::Builder::new()
                    .prefix("test-plugin-fix-")
                    .tempdir_in(&parent)
                    .context("Failed to create test directory")?;
                (temp.path().canonicalize()?, Some(temp))
            }
        };

        let paths = ClaudePaths::resolve(&claude_home, &test_dir, Scope::ProjectLocal, &spec);

        Ok(Self {
            spec,
            installer,
            claude_home_arg: args.claude_home.clone(),
            paths,
            test_dir,
            temp_dir,
            keep_temp: args.keep_temp,
            tui_retries: args.tui_retries.max(1),
            tmux_target: args.tmux_target.clone(),
            socket: args.socket.clone(),
            tmux: None,
        })
    }

    /// The installer with `--claude-home` already applied.
    pub fn installer(&self) -> Command {
        let mut cmd = Command::new(&self.installer);
        if let Some(home) = &self.claude_home_arg {
            cmd.arg("--claude-home").arg(home);
        }
        cmd
    }

    pub fn run_installer<I, S>(&self, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = self.installer();
        cmd.args(args);
        tracing::debug!("Running: {:?}", cmd);
        let output = cmd
            .output()
            .with_context(|| format!("Failed to run {}", self.installer.display()))?;
        tracing::debug!("stdout:\n{}", String::from_utf8_lossy(&output.stdout));
        tracing::debug!("stderr:\n{}", String::from_utf8_lossy(&output.stderr));
        Ok(output)
    }

    /// `-p <plugin@marketplace> -d <test dir>`
    pub fn target_args(&self) -> Vec<OsString> {
        vec![
            "-p".into(),
            self.spec.key().into(),
            "-d".into(),
            self.test_dir.clone().into_os_string(),
        ]
    }

    pub fn settings_file(&self) -> &Path {
        &self.paths.settings
    }

    pub fn registry_file(&self) -> &Path {
        &self.paths.installed_plugins
    }

    /// The tmux pane, created on first use so runs without UI checks never
    /// need tmux.
    pub fn tmux(&mut self) -> Result<&Tmux> {
        if self.tmux.is_none() {
            let tmux = match &self.tmux_target {
                Some(target) => Tmux::attach(target, &self.socket),
                None => Tmux::isolated(&self.socket)?,
            };
            console::info(format!("tmux target: {}", tmux.target()));
            self.tmux = Some(tmux);
        }
        self.tmux.as_ref().context("tmux session unavailable")
    }

    /// Leave Claude Code if it is still running and wait for the shell.
    pub fn ensure_shell_ready(&mut self) -> Result<bool> {
        let tmux = self.tmux()?;
        let content = tmux.capture_pane();

        if content.contains("Claude Code") || content.contains("Welcome") {
            tracing::debug!("Claude still running, exiting...");
            tmux.press("C-c")?;
            pause(1000);
            tmux.press("/exit")?;
            pause(1500);
            tmux.press("Enter")?;
            pause(2000);
        }

        tmux.press("C-c")?;
        pause(500);
        Ok(tmux.wait_for_prompt(Duration::from_secs(5)))
    }

    /// Kill the owned tmux session and remove the owned test directory,
    /// unless `--keep-temp` asked to keep it.
    pub fn cleanup(mut self) {
        self.tmux.take();
        if let Some(temp) = self.temp_dir.take() {
            if self.keep_temp {
                let kept = temp.keep();
                console::info(format!("Keeping test directory: {}", kept.display()));
            } else {
                tracing::debug!("Removing temp dir: {}", temp.path().display());
                if let Err(e) = temp.close() {
                    console::warn(format!("Failed to remove test directory: {e}"));
                }
            }
        }
    }
}

fn default_installer() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate the harness executable")?;
    let name = format!("claude-plugin-install{}", std::env::consts::EXE_SUFFIX);
    Ok(exe.with_file_name(name))
}

fn default_claude_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("CLAUDE_CONFIG_DIR").filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Failed to find home directory")?;
    Ok(home.join(".claude"))
}
