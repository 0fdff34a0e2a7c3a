//! Classified engine errors and exit codes.

use std::fmt;

use thiserror::Error;

use crate::kernel::KernelError;

/// A user error carrying its own process exit code.
///
/// Returned from actions or middleware (`Err(Failure::new(3, "...").into())`)
/// when an invocation should terminate with a specific code; the executor
/// downcasts it out of the `anyhow` chain.
#[derive(Debug)]
pub struct Failure {
    pub code: i32,
    pub message: String,
}

impl Failure {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Failure {}

/// Terminal classification of a failed invocation.
#[derive(Debug, Error)]
pub enum Error {
    /// Aggregate of all parse-phase problems; raised once after every
    /// issue has been printed.
    #[error("{}", .issues.join("; "))]
    Validation { issues: Vec<String> },

    /// The first positional named no subcommand and the matched command
    /// cannot run by itself.
    #[error("unknown command '{name}'{}", .suggestion.as_ref().map(|s| format!(" (did you mean '{s}'?)")).unwrap_or_default())]
    UnknownCommand {
        name: String,
        suggestion: Option<String>,
    },

    /// Registry or lifecycle failure inside the plugin kernel.
    #[error(transparent)]
    Kernel(#[from] KernelError),

    /// An event handler, middleware, or action returned an error.
    #[error("{0}")]
    Execution(anyhow::Error),
}

impl Error {
    /// Process exit code for this failure: a [`Failure`] in the execution
    /// chain declares its own, everything else exits 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Execution(err) => err
                .downcast_ref::<Failure>()
                .map(|f| f.code)
                .unwrap_or(1),
            _ => 1,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_exit_code_is_one() {
        let err = Error::Validation {
            issues: vec!["missing required argument '<input>'".into()],
        };
        assert_eq!(err.exit_code(), 1);

        let err = Error::Execution(anyhow::anyhow!("boom"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_failure_declares_exit_code() {
        let err = Error::Execution(Failure::new(3, "deploy rejected").into());
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.to_string(), "deploy rejected");
    }

    #[test]
    fn test_unknown_command_display_includes_suggestion() {
        let err = Error::UnknownCommand {
            name: "instll".into(),
            suggestion: Some("install".into()),
        };
        let shown = err.to_string();
        assert!(shown.contains("instll"));
        assert!(shown.contains("install"));

        let err = Error::UnknownCommand {
            name: "zzz".into(),
            suggestion: None,
        };
        assert_eq!(err.to_string(), "unknown command 'zzz'");
    }

    #[test]
    fn test_validation_display_joins_issues() {
        let err = Error::Validation {
            issues: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "a; b");
    }
}
