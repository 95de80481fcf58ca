use claude_plugin_core::CoreError;
use std::io;
use thiserror::Error;

/// Failures the install flow has already explained on the console.
///
/// `main` only maps these to an exit code; the details, and the debug report
/// where one applies, were printed where the failure happened.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("invalid plugin '{0}': expected PLUGIN@MARKETPLACE")]
    InvalidPlugin(String),
    #[error("assumption verification failed with {0} problem(s)")]
    Preflight(usize),
    #[error("failed to {action}: {source}")]
    Write {
        action: &'static str,
        #[source]
        source: CoreError,
    },
}

impl InstallError {
    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// Whether an interrupted read (Ctrl-C at a prompt) caused `err`.
pub fn is_interrupted(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return io_err.kind() == io::ErrorKind::Interrupted;
        }
        matches!(
            cause.downcast_ref::<dialoguer::Error>(),
            Some(dialoguer::Error::IO(e)) if e.kind() == io::ErrorKind::Interrupted
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_interrupted_detected_through_context() {
        let err: anyhow::Result<()> =
            Err(io::Error::new(io::ErrorKind::Interrupted, "read interrupted"))
                .context("Failed to read confirmation");
        assert!(is_interrupted(&err.unwrap_err()));
    }

    #[test]
    fn test_interrupted_inside_dialoguer_error() {
        let err = anyhow::Error::new(dialoguer::Error::IO(io::Error::new(
            io::ErrorKind::Interrupted,
            "read interrupted",
        )));
        assert!(is_interrupted(&err));
    }

    #[test]
    fn test_other_errors_are_not_interrupts() {
        let err = anyhow::Error::new(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(!is_interrupted(&err));
        assert_eq!(InstallError::Preflight(2).exit_code(), 1);
    }
}
