//! The command tree: a recursive node of names, definitions, middleware,
//! and an optional action.
//!
//! Commands are assembled by chainable builder calls at application-setup
//! time and are structurally immutable once `run` begins. Declaration
//! mistakes (duplicate names, a non-final variadic argument) are programmer
//! errors and panic at declaration time, the way ecosystem CLI builders
//! treat invalid command definitions.

use std::future::Future;
use std::sync::Arc;

use crate::arguments::{parse_argument_spec, ArgumentDef};
use crate::context::{ActionFn, Context, MiddlewareFn, Next};
use crate::options::{parse_option_flags, OptionDef};

/// One node in the command tree.
pub struct Command {
    name: String,
    description: String,
    aliases: Vec<String>,
    children: Vec<Command>,
    args: Vec<ArgumentDef>,
    options: Vec<OptionDef>,
    middleware: Vec<MiddlewareFn>,
    action: Option<ActionFn>,
    strict: bool,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            aliases: Vec::new(),
            children: Vec::new(),
            args: Vec::new(),
            options: Vec::new(),
            middleware: Vec::new(),
            action: None,
            strict: true,
        }
    }

    // ------------------------------------------------------------------
    // Builder surface
    // ------------------------------------------------------------------

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Declare a positional argument from a spec string: `<name>` required,
    /// `[name]` optional, trailing `...` variadic.
    ///
    /// # Panics
    ///
    /// On an invalid spec, a duplicate name, or a declaration after a
    /// variadic argument.
    pub fn argument(self, spec: &str, description: &str) -> Self {
        let def = match parse_argument_spec(spec) {
            Ok(def) => def.description(description),
            Err(err) => panic!("{}", err),
        };
        self.argument_def(def)
    }

    /// Declare a positional argument from a prebuilt definition.
    ///
    /// # Panics
    ///
    /// On a duplicate name or a declaration after a variadic argument.
    pub fn argument_def(mut self, def: ArgumentDef) -> Self {
        if self.args.iter().any(|a| a.name == def.name) {
            panic!("duplicate argument '{}' on command '{}'", def.name, self.name);
        }
        if self.args.last().is_some_and(|a| a.variadic) {
            panic!(
                "argument '{}' on command '{}' declared after a variadic argument",
                def.name, self.name
            );
        }
        self.args.push(def);
        self
    }

    /// Declare an option from a flag spec string, e.g.
    /// `"-p, --port <number>"`.
    ///
    /// # Panics
    ///
    /// On an invalid spec or a duplicate option name.
    pub fn option(self, flags: &str, description: &str) -> Self {
        let def = match parse_option_flags(flags) {
            Ok(def) => def.description(description),
            Err(err) => panic!("{}", err),
        };
        self.option_def(def)
    }

    /// Declare an option from a prebuilt definition.
    ///
    /// # Panics
    ///
    /// On a duplicate option name.
    pub fn option_def(mut self, def: OptionDef) -> Self {
        if self.options.iter().any(|o| o.name == def.name) {
            panic!("duplicate option '--{}' on command '{}'", def.name, self.name);
        }
        self.options.push(def);
        self
    }

    /// Append a middleware link to the chain. Middleware run in declaration
    /// order; a link that does not call `next.run` stops the chain and the
    /// action.
    pub fn middleware<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.middleware
            .push(Arc::new(move |ctx, next| Box::pin(f(ctx, next))));
        self
    }

    /// Set the action handler invoked after the middleware chain.
    pub fn action<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.action = Some(Arc::new(move |ctx| Box::pin(f(ctx))));
        self
    }

    /// Attach a subcommand.
    ///
    /// # Panics
    ///
    /// If a child with the same name already exists.
    pub fn subcommand(mut self, child: Command) -> Self {
        if self.children.iter().any(|c| c.name == child.name) {
            panic!(
                "duplicate subcommand '{}' on command '{}'",
                child.name, self.name
            );
        }
        self.children.push(child);
        self
    }

    /// Record undeclared options in the unknown list instead of erroring.
    pub fn allow_unknown_options(mut self) -> Self {
        self.strict = false;
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn describe(&self) -> &str {
        &self.description
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn children(&self) -> impl Iterator<Item = &Command> {
        self.children.iter()
    }

    pub fn arguments(&self) -> &[ArgumentDef] {
        &self.args
    }

    pub fn options(&self) -> &[OptionDef] {
        &self.options
    }

    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub(crate) fn middleware_chain(&self) -> Arc<[MiddlewareFn]> {
        Arc::from(self.middleware.clone())
    }

    pub(crate) fn action_handler(&self) -> Option<ActionFn> {
        self.action.clone()
    }

    /// Resolve a child by name, falling back to aliases. A direct name
    /// match wins over an alias collision.
    pub fn child_by_name_or_alias(&self, name: &str) -> Option<&Command> {
        self.children
            .iter()
            .find(|c| c.name == name)
            .or_else(|| {
                self.children
                    .iter()
                    .find(|c| c.aliases.iter().any(|a| a == name))
            })
    }

    // ------------------------------------------------------------------
    // Help text
    // ------------------------------------------------------------------

    /// Render help for this command, addressed by its full path.
    pub fn format_help(&self, path: &[String]) -> String {
        let full = path.join(" ");
        let mut help = String::new();

        if !self.description.is_empty() {
            help.push_str(&format!("{}\n\n", self.description));
        }

        help.push_str("USAGE:\n");
        let mut usage = format!("    {}", full);
        if !self.children.is_empty() {
            usage.push_str(" [COMMAND]");
        }
        for arg in &self.args {
            usage.push_str(&format!(" {}", arg.placeholder()));
        }
        usage.push_str(" [OPTIONS]");
        help.push_str(&usage);
        help.push('\n');

        if !self.args.is_empty() {
            help.push_str("\nARGUMENTS:\n");
            for arg in &self.args {
                help.push_str(&format!(
                    "    {:<18} {}\n",
                    arg.placeholder(),
                    arg.description
                ));
            }
        }

        if !self.children.is_empty() {
            help.push_str("\nCOMMANDS:\n");
            for child in &self.children {
                let label = if child.aliases.is_empty() {
                    child.name.clone()
                } else {
                    format!("{} ({})", child.name, child.aliases.join(", "))
                };
                help.push_str(&format!("    {:<18} {}\n", label, child.description));
            }
        }

        if !self.options.is_empty() {
            help.push_str("\nOPTIONS:\n");
            for option in &self.options {
                help.push_str(&format!(
                    "    {:<24} {}\n",
                    option.flag_column(),
                    option.description
                ));
            }
        }

        help
    }
}

// ============================================================================
// Tests
// ============================================================================
