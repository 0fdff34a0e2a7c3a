//! Execution context handed to middleware, actions, and event handlers.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::arguments::ParsedArguments;
use crate::kernel::SharedContext;
use crate::options::ParsedOptions;
use crate::value::Value;

/// Identity of the application driving the invocation.
#[derive(Debug, Clone)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
}

/// Identity of the resolved command: its name and the path of subcommand
/// names from the root. Carried instead of a parent back-reference; the
/// path is what full-name display needs.
#[derive(Debug, Clone)]
pub struct CommandInfo {
    pub name: String,
    pub path: Vec<String>,
    pub description: String,
}

impl CommandInfo {
    /// Space-joined command path, e.g. `app remote add`.
    pub fn full_path(&self) -> String {
        self.path.join(" ")
    }
}

/// Per-invocation execution context.
///
/// Cheap to clone: the kernel context is behind an `Arc` and the parsed
/// maps are small. One instance is built per invocation after validation.
#[derive(Debug, Clone)]
pub struct Context {
    pub args: ParsedArguments,
    pub options: ParsedOptions,
    pub argv: Vec<String>,
    pub command: CommandInfo,
    pub app: AppInfo,
    /// Kernel shared context, frozen after plugin initialization.
    pub shared: Arc<SharedContext>,
}

impl Context {
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    pub fn opt(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    /// Boolean option lookup; absent reads as false.
    pub fn flag(&self, name: &str) -> bool {
        self.options.flag(name)
    }
}

/// An action handler: the leaf of the execution pipeline.
pub type ActionFn = Arc<dyn Fn(Context) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// A middleware link. Receives the context and the continuation; not
/// calling [`Next::run`] short-circuits the rest of the chain and the
/// action itself.
pub type MiddlewareFn =
    Arc<dyn Fn(Context, Next) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Continuation over the middleware chain: an index cursor into the chain
/// plus the terminal action. Dropping it without calling [`Next::run`]
/// stops the pipeline.
pub struct Next {
    chain: Arc<[MiddlewareFn]>,
    action: Option<ActionFn>,
    index: usize,
}

impl Next {
    pub(crate) fn new(chain: Arc<[MiddlewareFn]>, action: Option<ActionFn>) -> Self {
        Self {
            chain,
            action,
            index: 0,
        }
    }

    /// Advance to the next middleware, or the action once the chain is
    /// exhausted.
    pub fn run(self, context: Context) -> BoxFuture<'static, anyhow::Result<()>> {
        Box::pin(async move {
            if let Some(middleware) = self.chain.get(self.index).cloned() {
                let next = Next {
                    chain: self.chain,
                    action: self.action,
                    index: self.index + 1,
                };
                middleware(context, next).await
            } else if let Some(action) = self.action {
                action(context).await
            } else {
                Ok(())
            }
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
