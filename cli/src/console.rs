//! Operator-facing output: tagged status lines, step headers and banners.
//!
//! Everything here goes to stdout except [`error`], which goes to stderr.
//! Diagnostics for `-v` go through `tracing` instead.

use crossterm::style::Stylize;
use std::fmt::Display;
use std::path::PathBuf;

const RULE_WIDTH: usize = 60;

pub fn info(msg: impl Display) {
    println!("{} {msg}", "[INFO]".blue());
}

pub fn ok(msg: impl Display) {
    println!("{} {msg}", "[OK]".green());
}

pub fn warn(msg: impl Display) {
    println!("{} {msg}", "[WARN]".yellow());
}

pub fn error(msg: impl Display) {
    eprintln!("{} {msg}", "[ERROR]".red());
}

pub fn step(msg: impl Display) {
    println!();
    println!("{} {}", "▶".cyan().bold(), msg.to_string().bold());
}

fn boxed(lines: &[&str]) -> String {
    let inner = lines
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .max(RULE_WIDTH - 4);
    let mut out = format!("╔{}╗\n", "═".repeat(inner + 2));
    for line in lines {
        let pad = inner - line.chars().count();
        out.push_str(&format!("║ {line}{} ║\n", " ".repeat(pad)));
    }
    out.push_str(&format!("╚{}╝", "═".repeat(inner + 2)));
    out
}

pub fn banner() {
    println!(
        "{}",
        boxed(&[
            "Claude Code plugin installer",
            "Registers plugin@marketplace without name collisions",
        ])
        .cyan()
    );
}

pub fn close_host_warning() {
    println!(
        "{}",
        boxed(&[
            "IMPORTANT: close Claude Code in this directory first.",
            "It rewrites these files while running and would",
            "overwrite the changes made here.",
        ])
        .yellow()
    );
}

pub fn success(plugin_key: &str, backups: &[PathBuf]) {
    println!();
    println!(
        "{}",
        boxed(&["✅ SUCCESS! Plugin installation workaround applied."]).green()
    );
    println!();
    println!("{}", "Next steps:".bold());
    println!("  1. Start Claude Code in this directory: claude");
    println!("  2. Run /plugin and open the Installed tab");
    println!("  3. Check that {plugin_key} is listed and enabled");

    if !backups.is_empty() {
        println!();
        println!("{}", "Backups created:".bold());
        for backup in backups {
            println!("  - {}", backup.display());
        }
    }
}

pub fn failure_banner() {
    eprintln!();
    eprintln!(
        "{}",
        boxed(&["❌ FAILED. Debug information for the bug report:"]).red()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_lines_are_equal_width() {
        let text = boxed(&["short", "a considerably longer line of banner text here!!"]);
        let widths: Vec<usize> = text.lines().map(|l| l.chars().count()).collect();
        assert_eq!(widths.len(), 4);
        assert!(widths.iter().all(|w| *w == widths[0]));
    }

    #[test]
    fn test_box_grows_for_long_lines() {
        let long = "x".repeat(RULE_WIDTH * 2);
        let text = boxed(&[&long]);
        assert!(text.lines().nth(1).unwrap().contains(&long));
    }
}
