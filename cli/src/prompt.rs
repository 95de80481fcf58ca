use crate::console;
use anyhow::{Context, Result};
use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;

/// Yes/no questions asked during an install.
pub trait Confirmer {
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Asks on the terminal; an empty answer means "no".
#[derive(Default)]
pub struct InteractiveConfirmer {
    theme: ColorfulTheme,
}

impl Confirmer for InteractiveConfirmer {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(false)
            .interact()
            .with_context(|| format!("Failed to read answer to '{prompt}'"))
    }
}

/// `--yes`: answers every question with yes and says so.
pub struct AutoConfirm;

impl Confirmer for AutoConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        console::info(format!("Non-interactive mode: auto-confirming '{prompt}'"));
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays fixed answers and records the questions asked.
    pub(crate) struct Scripted {
        answers: VecDeque<bool>,
        pub asked: Vec<String>,
    }

    impl Scripted {
        pub(crate) fn new(answers: &[bool]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                asked: Vec::new(),
            }
        }
    }

    impl Confirmer for Scripted {
        fn confirm(&mut self, prompt: &str) -> Result<bool> {
            self.asked.push(prompt.to_string());
            self.answers
                .pop_front()
                .with_context(|| format!("unexpected prompt: {prompt}"))
        }
    }

    #[test]
    fn test_auto_confirm_always_agrees() {
        let mut confirmer = AutoConfirm;
        assert!(confirmer.confirm("Proceed with modifications?").unwrap());
        assert!(confirmer.confirm("anything").unwrap());
    }

    #[test]
    fn test_scripted_runs_out() {
        let mut confirmer = Scripted::new(&[false]);
        assert!(!confirmer.confirm("first").unwrap());
        assert!(confirmer.confirm("second").is_err());
        assert_eq!(confirmer.asked, vec!["first", "second"]);
    }
}
