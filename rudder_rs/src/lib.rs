//! # rudder
//!
//! **Parsing-and-execution engine for command-line applications** - typed
//! options and arguments, a routed command tree with "did you mean"
//! suggestions, a middleware pipeline, and an async plugin kernel.
//!
//! ## Features
//!
//! - **Typed parsing** - string/number/boolean/array/object options with
//!   coercion, choices, and custom validation
//! - **Command tree** - nested subcommands with aliases, routed with
//!   options interleaved anywhere
//! - **Suggestions** - Levenshtein-based "did you mean" for unresolved
//!   command names
//! - **Middleware** - explicit chain-of-responsibility around the action;
//!   a link that does not call `next` stops the pipeline
//! - **Plugin kernel** - dependency-ordered plugin lifecycle and an async
//!   event bus with sequential, subscription-ordered delivery
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rudder::{App, Command};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mut app = App::new("demo", env!("CARGO_PKG_VERSION"))
//!         .command(
//!             Command::new("build")
//!                 .description("Build the project")
//!                 .argument("<input>", "Entry point")
//!                 .option("-w, --watch", "Rebuild on change")
//!                 .option("-p, --port <number>", "Dev server port")
//!                 .action(|ctx| async move {
//!                     println!("building {:?}", ctx.arg("input"));
//!                     Ok(())
//!                 }),
//!         );
//!     let _ = app.run().await;
//! }
//! ```
//!
//! Parsing is synchronous; the awaited suspension points are plugin
//! initialization, event emission, middleware, and the action itself.
//! Handlers for one event run sequentially in subscription order, and
//! plugins initialize in dependency order. There is no cancellation or
//! timeout primitive: a hung action blocks the invocation.

// ============================================================================
// Core Modules
// ============================================================================

/// Positional argument definitions and the argument parser.
pub mod arguments;

/// The command tree: builder surface, alias resolution, help text.
pub mod command;

/// Execution context, middleware continuation, and handler types.
pub mod context;

/// Classified engine errors and exit codes.
pub mod error;

/// Engine events and their closed payload set.
pub mod events;

/// Command executor and the [`App`] invocation surface.
pub mod executor;

/// Plugin micro-kernel: registry, dependency-ordered lifecycle, shared
/// context, and the async event bus.
///
/// # Submodules
///
/// - [`kernel::bus`] - Async event bus
/// - [`kernel::plugin`] - The [`Plugin`] trait
/// - [`kernel::topo`] - Dependency-order resolution
pub mod kernel;

/// Option definitions and the option parser.
pub mod options;

/// Command router over the token sequence.
pub mod router;

/// "Did you mean" suggestions for unresolved command names.
pub mod suggest;

/// Tokenizer: raw argv strings to typed tokens.
pub mod token;

/// Typed values produced by coercion.
pub mod value;

// ============================================================================
// Re-exports for convenience
// ============================================================================

/// The application builder and invocation surface.
pub use executor::App;

/// One node in the command tree.
pub use command::Command;

/// Per-invocation execution context.
pub use context::{AppInfo, CommandInfo, Context, Next};

/// Classified engine errors.
pub use error::{Error, Failure};

/// Emitted events and their payloads.
pub use events::AppEvent;

/// Plugin kernel surface.
pub use kernel::{Kernel, KernelError, SharedContext};

/// The plugin trait.
pub use kernel::plugin::Plugin;

/// Event bus handle types.
pub use kernel::bus::{EventBus, HandlerId};

/// Option declarations.
pub use options::{parse_option_flags, OptionDef, OptionType, ParsedOptions};

/// Argument declarations.
pub use arguments::{parse_argument_spec, ArgType, ArgumentDef, ParsedArguments};

/// Token model.
pub use token::{tokenize, Token, TokenKind};

/// Coerced values.
pub use value::Value;
