//! Engine events and their payloads.
//!
//! The event bus itself stores handlers by event name and never inspects
//! payload shapes; this module is the closed set of payload variants,
//! tagged by event name, that the executor emits. Plugins emit their own
//! events through [`AppEvent::Custom`] with an open JSON payload.

use crate::context::{CommandInfo, Context};

pub const COMMAND_BEFORE: &str = "command:before";
pub const COMMAND_AFTER: &str = "command:after";
pub const HELP: &str = "help";
pub const VERSION: &str = "version";
pub const ERROR: &str = "error";

/// One emitted event with its payload.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Emitted after validation, before the middleware chain runs. A
    /// handler error here aborts the invocation before the action.
    CommandBefore {
        command: CommandInfo,
        context: Context,
    },
    /// Emitted after the action completed without error.
    CommandAfter {
        command: CommandInfo,
        context: Context,
    },
    /// Emitted when help is requested (empty argv, `--help`, or a
    /// command without an action).
    Help { command: CommandInfo },
    /// Emitted when the version flag short-circuits the invocation.
    Version { name: String, version: String },
    /// Emitted once per failed invocation before the error is reported.
    Error { message: String, code: i32 },
    /// Plugin-defined event with an open payload.
    Custom {
        name: String,
        data: serde_json::Value,
    },
}

impl AppEvent {
    /// The event name handlers subscribe under.
    pub fn name(&self) -> &str {
        match self {
            AppEvent::CommandBefore { .. } => COMMAND_BEFORE,
            AppEvent::CommandAfter { .. } => COMMAND_AFTER,
            AppEvent::Help { .. } => HELP,
            AppEvent::Version { .. } => VERSION,
            AppEvent::Error { .. } => ERROR,
            AppEvent::Custom { name, .. } => name,
        }
    }

    /// Build a custom event.
    pub fn custom(name: impl Into<String>, data: serde_json::Value) -> Self {
        AppEvent::Custom {
            name: name.into(),
            data,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
