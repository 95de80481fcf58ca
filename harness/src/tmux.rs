//! Driving a shell inside a tmux pane.
//!
//! Keys are sent with fixed pauses and the screen is read back with
//! `capture-pane`; there is no way to know when the program in the pane has
//! finished redrawing, so waits are time based.

use anyhow::{bail, Context, Result};
use chrono::Local;
use std::ffi::OsString;
use std::process::{Command, Output};
use std::thread;
use std::time::{Duration, Instant};

/// Smallest pane the Claude Code plugin screen renders properly in.
pub const MIN_WIDTH: u16 = 90;
pub const MIN_HEIGHT: u16 = 25;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub fn pause(millis: u64) {
    thread::sleep(Duration::from_millis(millis));
}

pub struct Tmux {
    target: String,
    session: String,
    socket_args: Vec<OsString>,
    owns_session: bool,
}

impl Tmux {
    /// Use a window the operator already has open on the `socket` server.
    pub fn attach(target: &str, socket: &str) -> Self {
        let session = target.split(':').next().unwrap_or(target).to_string();
        Self {
            target: target.to_string(),
            session,
            socket_args: socket_args(socket),
            owns_session: false,
        }
    }

    /// Start a detached session on a private server socket. The session is
    /// killed when this value is dropped.
    pub fn isolated(socket: &str) -> Result<Self> {
        let session = format!("test-plugin-{}", Local::now().format("%H%M%S"));

        let mut tmux = Self {
            target: session.clone(),
            session,
            socket_args: socket_args(socket),
            owns_session: false,
        };
        tracing::debug!("Creating test session: {}", tmux.session);
        tmux.run_checked(&[
            "new-session",
            "-d",
            "-s",
            &tmux.session,
            "-x",
            "200",
            "-y",
            "50",
        ])?;
        tmux.owns_session = true;
        pause(500);

        Ok(tmux)
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        tracing::debug!("Running: tmux {:?} {}", self.socket_args, args.join(" "));
        Command::new("tmux")
            .args(&self.socket_args)
            .args(args)
            .output()
            .context("Failed to run tmux")
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            bail!(
                "tmux {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output)
    }

    /// Clear the input line, type `keys`, and optionally press Enter once the
    /// line editor has caught up.
    pub fn send_keys(&self, keys: &str, enter: bool) -> Result<()> {
        self.press("C-u")?;
        pause(200);
        self.run_checked(&["send-keys", "-t", &self.target, keys])?;
        if enter {
            pause(1500);
            self.press("C-m")?;
        }
        Ok(())
    }

    /// Send a single tmux key name such as `Escape`, `Tab` or `C-c`.
    pub fn press(&self, key: &str) -> Result<()> {
        self.run_checked(&["send-keys", "-t", &self.target, key])
            .map(|_| ())
    }

    /// Visible pane text; empty if tmux could not be asked.
    pub fn capture_pane(&self) -> String {
        match self.run(&["capture-pane", "-t", &self.target, "-p"]) {
            Ok(output) => String::from_utf8_lossy(&output.stdout).into_owned(),
            Err(e) => {
                tracing::debug!("capture-pane failed: {e:#}");
                String::new()
            }
        }
    }

    pub fn wait_until(&self, timeout: Duration, ready: impl Fn(&str) -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if ready(&self.capture_pane()) {
                return true;
            }
            thread::sleep(POLL_INTERVAL);
        }
        false
    }

    pub fn wait_for_prompt(&self, timeout: Duration) -> bool {
        self.wait_until(timeout, at_shell_prompt)
    }

    pub fn wait_for_text(&self, text: &str, timeout: Duration) -> bool {
        self.wait_until(timeout, |content| content.contains(text))
    }

    pub fn pane_size(&self) -> Option<(u16, u16)> {
        let output = self
            .run(&[
                "display-message",
                "-t",
                &self.target,
                "-p",
                "#{pane_width} #{pane_height}",
            ])
            .ok()?;
        parse_pane_size(&String::from_utf8_lossy(&output.stdout))
    }

    /// Resize the pane if it is below [`MIN_WIDTH`] x [`MIN_HEIGHT`].
    pub fn ensure_min_size(&self) -> bool {
        let (width, height) = self.pane_size().unwrap_or((0, 0));
        tracing::debug!("Pane size: {width}x{height}");
        if width >= MIN_WIDTH && height >= MIN_HEIGHT {
            return true;
        }

        tracing::debug!("Pane too small (need {MIN_WIDTH}x{MIN_HEIGHT}), attempting resize...");
        let _ = self.run(&[
            "resize-pane",
            "-t",
            &self.target,
            "-x",
            &MIN_WIDTH.to_string(),
            "-y",
            &MIN_HEIGHT.to_string(),
        ]);
        pause(500);

        let (width, height) = self.pane_size().unwrap_or((0, 0));
        tracing::debug!("New pane size: {width}x{height}");
        width >= MIN_WIDTH && height >= MIN_HEIGHT
    }
}

impl Drop for Tmux {
    fn drop(&mut self) {
        if self.owns_session {
            tracing::debug!("Killing test session: {}", self.session);
            let _ = self.run(&["kill-session", "-t", &self.session]);
        }
    }
}

/// `-S <tmp>/<socket>`, the private server both modes talk to.
fn socket_args(socket: &str) -> Vec<OsString> {
    vec!["-S".into(), std::env::temp_dir().join(socket).into_os_string()]
}

/// A shell waiting for input leaves `$` as the last visible character.
pub fn at_shell_prompt(content: &str) -> bool {
    content.trim_end().ends_with('$')
}

fn parse_pane_size(text: &str) -> Option<(u16, u16)> {
    let mut parts = text.split_whitespace();
    let width = parts.next()?.parse().ok()?;
    let height = parts.next()?.parse().ok()?;
    match parts.next() {
        Some(_) => None,
        None => Some((width, height)),
    }
}
