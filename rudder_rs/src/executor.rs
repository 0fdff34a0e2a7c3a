//! Command executor: the top-level driver tying tokenizer, router,
//! parsers, kernel, middleware, and action together.
//!
//! One invocation moves through a fixed state sequence
//! (`Idle → Tokenized → Routed → Parsed → Validated → Executing →
//! Completed | Failed`); transitions are logged at debug level. Parsing is
//! synchronous; the awaited suspension points are plugin initialization,
//! event emission, middleware, and the action.

use std::future::Future;
use std::process;

use colored::Colorize;
use tracing::{debug, warn};

use crate::arguments::parse_arguments;
use crate::command::Command;
use crate::context::{AppInfo, CommandInfo, Context, Next};
use crate::error::Error;
use crate::events::AppEvent;
use crate::kernel::plugin::Plugin;
use crate::kernel::{Kernel, KernelError};
use crate::options::parse_options;
use crate::router::route;
use crate::suggest::suggest_for;
use crate::token::{tokenize, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExecState {
    Idle,
    Tokenized,
    Routed,
    Parsed,
    Validated,
    Executing,
    Completed,
    Failed,
}

/// A command-line application: the root command, the plugin kernel, and
/// the invocation surface.
pub struct App {
    name: String,
    version: String,
    root: Command,
    kernel: Kernel,
    exit_on_error: bool,
}

impl App {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            root: Command::new(name.clone()),
            name,
            version: version.into(),
            kernel: Kernel::new(),
            exit_on_error: true,
        }
    }

    // ------------------------------------------------------------------
    // Builder surface (delegates to the root command)
    // ------------------------------------------------------------------

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.root = self.root.description(text);
        self
    }

    pub fn command(mut self, command: Command) -> Self {
        self.root = self.root.subcommand(command);
        self
    }

    pub fn argument(mut self, spec: &str, description: &str) -> Self {
        self.root = self.root.argument(spec, description);
        self
    }

    pub fn option(mut self, flags: &str, description: &str) -> Self {
        self.root = self.root.option(flags, description);
        self
    }

    pub fn middleware<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.root = self.root.middleware(f);
        self
    }

    pub fn action<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.root = self.root.action(f);
        self
    }

    pub fn allow_unknown_options(mut self) -> Self {
        self.root = self.root.allow_unknown_options();
        self
    }

    /// Register a plugin; its `install` hook runs immediately.
    pub fn plugin<P: Plugin + 'static>(mut self, plugin: P) -> Result<Self, KernelError> {
        self.kernel.register(std::sync::Arc::new(plugin))?;
        Ok(self)
    }

    /// Subscribe an event handler directly from application code.
    pub fn on<F, Fut>(mut self, event: &str, handler: F) -> Self
    where
        F: Fn(AppEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.kernel.on(event, handler);
        self
    }

    /// Keep fatal errors as return values instead of terminating the
    /// process; for hosting libraries and tests.
    pub fn no_exit(mut self) -> Self {
        self.exit_on_error = false;
        self
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut Kernel {
        &mut self.kernel
    }

    pub fn root(&self) -> &Command {
        &self.root
    }

    // ------------------------------------------------------------------
    // Invocation surface
    // ------------------------------------------------------------------

    /// Run against the process's own arguments (program name skipped).
    pub async fn run(&mut self) -> Result<(), Error> {
        let argv: Vec<String> = std::env::args().skip(1).collect();
        self.run_from(argv).await
    }

    /// Run against an explicit argv-style list.
    ///
    /// On failure the `error` event is emitted, the failure is reported to
    /// stderr, and the process exits with the error's code, unless
    /// [`App::no_exit`] was set, in which case the classified error is
    /// returned.
    pub async fn run_from(&mut self, argv: Vec<String>) -> Result<(), Error> {
        match self.execute(&argv).await {
            Ok(()) => Ok(()),
            Err(err) => {
                let code = err.exit_code();
                let event = AppEvent::Error {
                    message: err.to_string(),
                    code,
                };
                if let Err(emit_err) = self.kernel.emit(&event).await {
                    warn!(error = %emit_err, "error event handler failed");
                }
                self.report(&err);
                if self.exit_on_error {
                    process::exit(code);
                }
                Err(err)
            }
        }
    }

    async fn execute(&mut self, argv: &[String]) -> Result<(), Error> {
        let mut state = ExecState::Idle;

        // Plugins must be initialized (dependency order) before any event
        // fires. Idempotent across invocations of the same App.
        self.kernel.initialize().await?;

        let tokens = tokenize(argv);
        transition(&mut state, ExecState::Tokenized);

        if tokens.is_empty() {
            let info = command_info(&self.root, vec![self.name.clone()]);
            println!("{}", self.root.format_help(&info.path));
            self.kernel
                .emit(&AppEvent::Help { command: info })
                .await
                .map_err(Error::Execution)?;
            transition(&mut state, ExecState::Completed);
            return Ok(());
        }

        let matched = route(&self.root, &tokens);
        transition(&mut state, ExecState::Routed);
        let cmd = matched.command;
        let info = command_info(cmd, matched.path);

        if info.path.len() == 1 && wants_version(cmd, &matched.tokens) {
            println!("{} {}", self.name, self.version);
            self.kernel
                .emit(&AppEvent::Version {
                    name: self.name.clone(),
                    version: self.version.clone(),
                })
                .await
                .map_err(Error::Execution)?;
            transition(&mut state, ExecState::Completed);
            return Ok(());
        }

        if wants_help(cmd, &matched.tokens) {
            println!("{}", cmd.format_help(&info.path));
            self.kernel
                .emit(&AppEvent::Help { command: info })
                .await
                .map_err(Error::Execution)?;
            transition(&mut state, ExecState::Completed);
            return Ok(());
        }

        if !cmd.has_action() {
            if let Some(stray) = stray_argument(&matched.tokens) {
                let err = Error::UnknownCommand {
                    name: stray.value.clone(),
                    suggestion: suggest_for(&stray.value, &self.root),
                };
                transition(&mut state, ExecState::Failed);
                return Err(err);
            }
            // A pure command group invoked bare: show its help.
            println!("{}", cmd.format_help(&info.path));
            self.kernel
                .emit(&AppEvent::Help { command: info })
                .await
                .map_err(Error::Execution)?;
            transition(&mut state, ExecState::Completed);
            return Ok(());
        }

        let (options, leftover) = parse_options(&matched.tokens, cmd.options(), cmd.is_strict());
        let args = parse_arguments(&leftover, cmd.arguments());
        transition(&mut state, ExecState::Parsed);

        let issues: Vec<String> = options
            .errors
            .iter()
            .chain(args.errors.iter())
            .cloned()
            .collect();
        if !issues.is_empty() {
            for issue in &issues {
                eprintln!("{} {}", "error:".red().bold(), issue);
            }
            transition(&mut state, ExecState::Failed);
            return Err(Error::Validation { issues });
        }
        transition(&mut state, ExecState::Validated);

        let context = Context {
            args,
            options,
            argv: argv.to_vec(),
            command: info.clone(),
            app: AppInfo {
                name: self.name.clone(),
                version: self.version.clone(),
            },
            shared: self.kernel.shared(),
        };

        self.kernel
            .emit(&AppEvent::CommandBefore {
                command: info.clone(),
                context: context.clone(),
            })
            .await
            .map_err(Error::Execution)?;
        transition(&mut state, ExecState::Executing);

        Next::new(cmd.middleware_chain(), cmd.action_handler())
            .run(context.clone())
            .await
            .map_err(Error::Execution)?;

        self.kernel
            .emit(&AppEvent::CommandAfter {
                command: info,
                context,
            })
            .await
            .map_err(Error::Execution)?;
        transition(&mut state, ExecState::Completed);
        Ok(())
    }

    fn report(&self, err: &Error) {
        match err {
            // Parse issues were already printed line by line.
            Error::Validation { .. } => {}
            Error::UnknownCommand { name, suggestion } => {
                eprintln!("{} unknown command '{}'", "error:".red().bold(), name);
                if let Some(suggestion) = suggestion {
                    eprintln!("Did you mean: {}?", suggestion.bold());
                }
                eprintln!("Run '{} --help' for available commands.", self.name);
            }
            other => eprintln!("{} {}", "error:".red().bold(), other),
        }
    }
}

fn transition(state: &mut ExecState, to: ExecState) {
    debug!(from = ?state, to = ?to, "executor state");
    *state = to;
}

fn command_info(cmd: &Command, path: Vec<String>) -> CommandInfo {
    CommandInfo {
        name: cmd.name().to_string(),
        path,
        description: cmd.describe().to_string(),
    }
}

/// `--version` / `-V` requested, and the command does not claim the name
/// for itself.
fn wants_version(cmd: &Command, tokens: &[Token]) -> bool {
    if cmd.options().iter().any(|o| o.name == "version") {
        return false;
    }
    tokens.iter().any(|t| match t.kind {
        TokenKind::Option => t.value == "version",
        TokenKind::Flag => t.value == "V" && !cmd.options().iter().any(|o| o.alias == Some('V')),
        _ => false,
    })
}

/// `--help` / `-h` requested, and the command does not claim the name for
/// itself.
fn wants_help(cmd: &Command, tokens: &[Token]) -> bool {
    if cmd.options().iter().any(|o| o.name == "help") {
        return false;
    }
    tokens.iter().any(|t| match t.kind {
        TokenKind::Option => t.value == "help",
        TokenKind::Flag => t.value == "h" && !cmd.options().iter().any(|o| o.alias == Some('h')),
        _ => false,
    })
}

/// First positional before any `--` separator; a candidate subcommand name
/// that failed to resolve.
fn stray_argument(tokens: &[Token]) -> Option<&Token> {
    for token in tokens {
        match token.kind {
            TokenKind::Separator => return None,
            TokenKind::Argument => return Some(token),
            _ => {}
        }
    }
    None
}

// ============================================================================
// Tests
// ============================================================================
