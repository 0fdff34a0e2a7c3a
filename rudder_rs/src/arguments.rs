//! Positional argument definitions and the argument parser.
//!
//! The argument parser runs after the option parser and consumes the tokens
//! the option pass left behind, matching them against the declared
//! positional definitions in order.

use std::collections::BTreeMap;
use std::fmt;

use crate::options::{CoerceFn, ValidateFn};
use crate::token::Token;
use crate::value::{coerce_number, Value};

/// Declared value shape of a positional argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    Str,
    Number,
    Boolean,
}

/// A declared positional argument.
#[derive(Clone)]
pub struct ArgumentDef {
    pub name: String,
    pub kind: ArgType,
    pub description: String,
    pub required: bool,
    pub variadic: bool,
    pub default: Option<Value>,
    pub(crate) coerce: Option<CoerceFn>,
    pub(crate) validate: Option<ValidateFn>,
}

impl fmt::Debug for ArgumentDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("variadic", &self.variadic)
            .field("default", &self.default)
            .finish()
    }
}

impl ArgumentDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ArgType::Str,
            description: String::new(),
            required: false,
            variadic: false,
            default: None,
            coerce: None,
            validate: None,
        }
    }

    pub fn typed(mut self, kind: ArgType) -> Self {
        self.kind = kind;
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn coerce<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.coerce = Some(std::sync::Arc::new(f));
        self
    }

    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validate = Some(std::sync::Arc::new(f));
        self
    }

    /// The placeholder shown in usage output, e.g. `<input>` or
    /// `[files...]`.
    pub fn placeholder(&self) -> String {
        let dots = if self.variadic { "..." } else { "" };
        if self.required {
            format!("<{}{}>", self.name, dots)
        } else {
            format!("[{}{}]", self.name, dots)
        }
    }
}

/// Parse a declaration spec into a definition: `<name>` is required,
/// `[name]` optional, a trailing `...` marks the variadic tail.
pub fn parse_argument_spec(spec: &str) -> Result<ArgumentDef, String> {
    let (required, body) = if spec.starts_with('<') && spec.ends_with('>') {
        (true, &spec[1..spec.len() - 1])
    } else if spec.starts_with('[') && spec.ends_with(']') {
        (false, &spec[1..spec.len() - 1])
    } else {
        return Err(format!(
            "invalid argument spec '{}': use <name>, [name], or a trailing ...",
            spec
        ));
    };

    let (name, variadic) = match body.strip_suffix("...") {
        Some(name) => (name, true),
        None => (body, false),
    };
    if name.is_empty() {
        return Err(format!("invalid argument spec '{}': empty name", spec));
    }

    let mut def = ArgumentDef::new(name);
    def.required = required;
    def.variadic = variadic;
    Ok(def)
}

/// Result of an argument-parsing pass.
#[derive(Debug, Clone, Default)]
pub struct ParsedArguments {
    /// Coerced values by argument name.
    pub values: BTreeMap<String, Value>,
    /// Accumulated parse errors; never raised individually.
    pub errors: Vec<String>,
    /// Positional values supplied beyond the declared definitions.
    pub remaining: Vec<String>,
}

impl ParsedArguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// Parse leftover tokens against the declared positional definitions.
///
/// One token is consumed per non-variadic definition in declaration order.
/// A variadic definition (always the last) swallows every remaining token
/// into one array. Coercion failures append an error but still assign the
/// raw string as a best-effort value.
pub fn parse_arguments(tokens: &[Token], defs: &[ArgumentDef]) -> ParsedArguments {
    let mut out = ParsedArguments::default();
    let mut cursor = tokens.iter();

    for def in defs {
        if def.variadic {
            let items: Vec<Value> = cursor
                .by_ref()
                .map(|token| coerce_argument(def, &token.value, &mut out.errors))
                .collect();
            if !items.is_empty() {
                check(def, &Value::Array(items.clone()), &mut out.errors);
                out.values.insert(def.name.clone(), Value::Array(items));
            }
            break;
        }

        match cursor.next() {
            Some(token) => {
                let value = coerce_argument(def, &token.value, &mut out.errors);
                check(def, &value, &mut out.errors);
                out.values.insert(def.name.clone(), value);
            }
            None => break,
        }
    }

    for def in defs {
        if !out.values.contains_key(&def.name) {
            if let Some(default) = &def.default {
                out.values.insert(def.name.clone(), default.clone());
            } else if def.required {
                out.errors
                    .push(format!("missing required argument '{}'", def.placeholder()));
            }
        }
    }

    out.remaining = cursor.map(|t| t.value.clone()).collect();
    out
}

fn coerce_argument(def: &ArgumentDef, raw: &str, errors: &mut Vec<String>) -> Value {
    if let Some(coerce) = &def.coerce {
        return match coerce(raw) {
            Ok(value) => value,
            Err(err) => {
                errors.push(err);
                Value::Str(raw.to_string())
            }
        };
    }
    match def.kind {
        ArgType::Str => Value::Str(raw.to_string()),
        ArgType::Number => match coerce_number(&def.placeholder(), raw) {
            Ok(value) => value,
            Err(err) => {
                errors.push(err);
                Value::Str(raw.to_string())
            }
        },
        ArgType::Boolean => Value::Bool(Value::truthy(raw)),
    }
}

fn check(def: &ArgumentDef, value: &Value, errors: &mut Vec<String>) {
    if let Some(validate) = &def.validate {
        if let Err(err) = validate(value) {
            errors.push(err);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
