use crossterm::style::{Color, Stylize};
use std::fmt::Display;

pub fn info(msg: impl Display) {
    println!("{} {msg}", "[INFO]".blue());
}

pub fn pass(msg: impl Display) {
    println!("{} {msg}", "[PASS]".green());
}

pub fn fail(msg: impl Display) {
    println!("{} {msg}", "[FAIL]".red());
}

pub fn skip(msg: impl Display) {
    println!("{} {msg}", "[SKIP]".yellow());
}

pub fn warn(msg: impl Display) {
    println!("{} {msg}", "[WARN]".yellow());
}

pub fn error(msg: impl Display) {
    eprintln!("{}: {msg}", "ERROR".red());
}

pub fn check_header(name: &str) {
    println!();
    println!("{} {}", "▶".cyan(), format!("Running: {name}").bold());
}

/// Outcome counts for the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl Tally {
    pub fn total(&self) -> u32 {
        self.passed + self.failed + self.skipped
    }

    pub fn succeeded(&self) -> bool {
        self.failed == 0
    }

    pub fn render(&self) -> String {
        const WIDTH: usize = 40;
        let rule = "═".repeat(WIDTH);
        let row = |label: &str, value: u32| format!("║  {:<9}{:<width$}║", label, value, width = WIDTH - 11);
        [
            format!("╔{rule}╗"),
            format!("║{:^WIDTH$}║", "TEST SUMMARY"),
            format!("╠{rule}╣"),
            row("Passed:", self.passed),
            row("Failed:", self.failed),
            row("Skipped:", self.skipped),
            row("Total:", self.total()),
            format!("╚{rule}╝"),
        ]
        .join("\n")
    }

    pub fn print(&self) {
        let color = if self.succeeded() {
            Color::Green
        } else {
            Color::Red
        };
        println!();
        println!("{}", self.render().with(color));
    }
}

pub fn banner() {
    const WIDTH: usize = 40;
    let rule = "═".repeat(WIDTH);
    let text = format!(
        "╔{rule}╗\n║{:^WIDTH$}║\n╚{rule}╝",
        "claude-plugin-install TEST SUITE"
    );
    println!("{}", text.cyan());
}
