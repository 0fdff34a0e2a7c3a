//! Option definitions and the option parser.
//!
//! Options are declared either through [`OptionDef`] builders or through a
//! flag spec string (`"-p, --port <number>"`, see [`parse_option_flags`]).
//! The parser walks the token sequence left to right, leaving non-option
//! tokens untouched for the argument parser, and accumulates errors instead
//! of halting: the executor surfaces them as one validation failure.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::token::{Token, TokenKind};
use crate::value::{coerce_array, coerce_number, coerce_object, Value};

/// Declared value shape of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    Str,
    Number,
    Boolean,
    Array,
    Object,
}

/// Custom raw-string coercion hook. Wins over the declared type.
pub type CoerceFn = Arc<dyn Fn(&str) -> Result<Value, String> + Send + Sync>;

/// Custom validation hook, run after coercion.
pub type ValidateFn = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// A declared option.
#[derive(Clone)]
pub struct OptionDef {
    pub name: String,
    pub alias: Option<char>,
    pub kind: OptionType,
    pub description: String,
    pub required: bool,
    pub default: Option<Value>,
    pub choices: Vec<String>,
    pub negatable: bool,
    pub(crate) coerce: Option<CoerceFn>,
    pub(crate) validate: Option<ValidateFn>,
}

impl fmt::Debug for OptionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionDef")
            .field("name", &self.name)
            .field("alias", &self.alias)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("choices", &self.choices)
            .field("negatable", &self.negatable)
            .finish()
    }
}

impl OptionDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            kind: OptionType::Boolean,
            description: String::new(),
            required: false,
            default: None,
            choices: Vec::new(),
            negatable: false,
            coerce: None,
            validate: None,
        }
    }

    pub fn alias(mut self, alias: char) -> Self {
        self.alias = Some(alias);
        self
    }

    pub fn typed(mut self, kind: OptionType) -> Self {
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

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn negatable(mut self) -> Self {
        self.negatable = true;
        self
    }

    pub fn coerce<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.coerce = Some(Arc::new(f));
        self
    }

    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(f));
        self
    }

    /// The flag column shown in help output, e.g. `-p, --port <number>`.
    pub fn flag_column(&self) -> String {
        let mut column = match self.alias {
            Some(alias) => format!("-{}, --{}", alias, self.name),
            None => format!("    --{}", self.name),
        };
        let hint = match self.kind {
            OptionType::Boolean => None,
            OptionType::Str => Some("string"),
            OptionType::Number => Some("number"),
            OptionType::Array => Some("items..."),
            OptionType::Object => Some("key=value"),
        };
        if let Some(hint) = hint {
            column.push_str(&format!(" <{}>", hint));
        }
        column
    }
}

/// Parse a flag spec string into a definition.
///
/// `"-p, --port <number>"` yields name `port`, alias `p`, type number.
/// Without a value placeholder the option is boolean. Placeholder text
/// selects the type: `number`, `boolean`, `object`, `array` (or a trailing
/// `...`); anything else is a string.
pub fn parse_option_flags(flags: &str) -> Result<OptionDef, String> {
    let mut name: Option<String> = None;
    let mut alias: Option<char> = None;
    let mut kind: Option<OptionType> = None;

    for part in flags.split([',', ' ']).filter(|p| !p.is_empty()) {
        if let Some(body) = part.strip_prefix("--") {
            if body.is_empty() {
                return Err(format!("invalid option flags '{}'", flags));
            }
            name = Some(body.to_string());
        } else if let Some(body) = part.strip_prefix('-') {
            let mut chars = body.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => alias = Some(c),
                _ => return Err(format!("short flag '-{}' must be a single character", body)),
            }
        } else if (part.starts_with('<') && part.ends_with('>'))
            || (part.starts_with('[') && part.ends_with(']'))
        {
            let hint = &part[1..part.len() - 1];
            kind = Some(placeholder_type(hint));
        } else {
            return Err(format!("unexpected token '{}' in option flags '{}'", part, flags));
        }
    }

    let name = name.ok_or_else(|| format!("option flags '{}' need a long name", flags))?;
    let mut def = OptionDef::new(name).typed(kind.unwrap_or(OptionType::Boolean));
    def.alias = alias;
    Ok(def)
}

fn placeholder_type(hint: &str) -> OptionType {
    if hint.ends_with("...") {
        return OptionType::Array;
    }
    match hint {
        "number" | "int" | "float" => OptionType::Number,
        "boolean" | "bool" => OptionType::Boolean,
        "array" => OptionType::Array,
        "object" => OptionType::Object,
        _ => OptionType::Str,
    }
}

/// Result of an option-parsing pass.
#[derive(Debug, Clone, Default)]
pub struct ParsedOptions {
    /// Coerced values by canonical option name.
    pub values: BTreeMap<String, Value>,
    /// Accumulated parse errors; never raised individually.
    pub errors: Vec<String>,
    /// Names seen but not declared (non-strict mode only).
    pub unknown: Vec<String>,
}

impl ParsedOptions {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Boolean option lookup; absent or non-boolean reads as false.
    pub fn flag(&self, name: &str) -> bool {
        self.values
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Lookup entry: definition index plus whether it was reached through its
/// negated `no-` shadow name.
#[derive(Clone, Copy)]
struct Resolved {
    def: usize,
    negated: bool,
}

struct OptionPass<'a> {
    defs: &'a [OptionDef],
    by_name: HashMap<String, Resolved>,
    by_alias: HashMap<char, usize>,
    strict: bool,
    seen: HashSet<String>,
    out: ParsedOptions,
    remaining: Vec<Token>,
}

/// Parse the token sequence against the declared options.
///
/// Returns the parsed values plus the tokens left for the argument parser
/// (`Argument` and `Value` tokens; the `--` separator is dropped).
pub fn parse_options(
    tokens: &[Token],
    defs: &[OptionDef],
    strict: bool,
) -> (ParsedOptions, Vec<Token>) {
    let mut by_name = HashMap::new();
    let mut by_alias = HashMap::new();
    for (idx, def) in defs.iter().enumerate() {
        by_name.insert(def.name.clone(), Resolved { def: idx, negated: false });
        if let Some(alias) = def.alias {
            by_alias.insert(alias, idx);
        }
        if def.negatable {
            by_name.insert(format!("no-{}", def.name), Resolved { def: idx, negated: true });
        }
    }

    let mut pass = OptionPass {
        defs,
        by_name,
        by_alias,
        strict,
        seen: HashSet::new(),
        out: ParsedOptions::default(),
        remaining: Vec::new(),
    };

    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        i += match token.kind {
            TokenKind::Separator => 1,
            TokenKind::Argument | TokenKind::Value => {
                pass.remaining.push(token.clone());
                1
            }
            TokenKind::Option => pass.long_option(token, tokens.get(i + 1)),
            TokenKind::Flag => pass.flag(token, tokens.get(i + 1)),
        };
    }

    pass.finish()
}

impl<'a> OptionPass<'a> {
    /// Handle a `--name` token. Returns how many tokens were consumed.
    fn long_option(&mut self, token: &Token, next: Option<&Token>) -> usize {
        match self.by_name.get(token.value.as_str()).copied() {
            Some(resolved) => self.defined(resolved, &format!("--{}", token.value), None, next),
            None => self.undefined(&token.value, &format!("--{}", token.value), next),
        }
    }

    /// Handle a `-x` / `-xyz` token. Returns how many tokens were consumed.
    fn flag(&mut self, token: &Token, next: Option<&Token>) -> usize {
        let display = format!("-{}", token.value);
        let mut chars = token.value.chars();
        let first = match chars.next() {
            Some(c) => c,
            None => return 1,
        };

        if token.value.len() > 1 {
            if let Some(&idx) = self.by_alias.get(&first) {
                if self.defs[idx].kind != OptionType::Boolean {
                    // Short flag with attached value: -p3000
                    let attached = token.value[first.len_utf8()..].to_string();
                    let resolved = Resolved { def: idx, negated: false };
                    return self.defined(resolved, &display, Some(attached), next);
                }
                // Grouped boolean cluster: set every matching boolean flag,
                // silently ignore the rest (observed upstream behavior).
                for c in token.value.chars() {
                    if let Some(&idx) = self.by_alias.get(&c) {
                        let def = &self.defs[idx];
                        if def.kind == OptionType::Boolean && self.seen.insert(def.name.clone()) {
                            self.out.values.insert(def.name.clone(), Value::Bool(true));
                        }
                    }
                }
                return 1;
            }
            // Multi-character flag with no known leading alias: fall back to
            // a whole-cluster name lookup before declaring it unknown.
            return match self.by_name.get(token.value.as_str()).copied() {
                Some(resolved) => self.defined(resolved, &display, None, next),
                None => self.undefined(&token.value, &display, next),
            };
        }

        match self.by_alias.get(&first).copied() {
            Some(idx) => {
                let resolved = Resolved { def: idx, negated: false };
                self.defined(resolved, &display, None, next)
            }
            None => self.undefined(&token.value, &display, next),
        }
    }

    /// Handle a token that resolved to a definition. `attached` carries a
    /// value glued to a short flag. Returns tokens consumed.
    fn defined(
        &mut self,
        resolved: Resolved,
        display: &str,
        attached: Option<String>,
        next: Option<&Token>,
    ) -> usize {
        let def = &self.defs[resolved.def];
        let bound_value = next.filter(|t| t.kind == TokenKind::Value);

        if !self.seen.insert(def.name.clone()) {
            // Duplicate occurrence (also guards --color / --no-color pairs):
            // first one wins, a bound `=` value is dropped with it.
            return if bound_value.is_some() { 2 } else { 1 };
        }

        if resolved.negated {
            self.out.values.insert(def.name.clone(), Value::Bool(false));
            return if bound_value.is_some() { 2 } else { 1 };
        }

        if def.kind == OptionType::Boolean {
            // Only a `=`-bound Value token may carry an explicit boolean;
            // a bare positional after the flag is never consumed.
            return match bound_value {
                Some(value_token) => {
                    let value = match &def.coerce {
                        Some(coerce) => match coerce(&value_token.value) {
                            Ok(v) => v,
                            Err(err) => {
                                self.out.errors.push(err);
                                return 2;
                            }
                        },
                        None => Value::Bool(Value::truthy(&value_token.value)),
                    };
                    self.store_checked(def, display, value);
                    2
                }
                None => {
                    self.store_checked(def, display, Value::Bool(true));
                    1
                }
            };
        }

        // Non-boolean: an attached value, else the next Value/Argument
        // token, else the declared default, else an error.
        let (raw, consumed) = if let Some(attached) = attached {
            (Some(attached), 1)
        } else {
            match next {
                Some(t) if matches!(t.kind, TokenKind::Value | TokenKind::Argument) => {
                    (Some(t.value.clone()), 2)
                }
                _ => (None, 1),
            }
        };

        let raw = match raw.or_else(|| def.default.as_ref().map(|d| d.to_string())) {
            Some(raw) => raw,
            None => {
                self.out.errors.push(format!("{} requires a value", display));
                return consumed;
            }
        };

        match coerce_value(def, display, &raw) {
            Ok(value) => self.store_checked(def, display, value),
            Err(err) => self.out.errors.push(err),
        }
        consumed
    }

    /// Handle a token that resolved to nothing. Returns tokens consumed.
    fn undefined(&mut self, name: &str, display: &str, next: Option<&Token>) -> usize {
        if self.strict {
            self.out.errors.push(format!("unknown option '{}'", display));
            return 1;
        }
        self.out.unknown.push(name.to_string());

        let bound_value = next.filter(|t| t.kind == TokenKind::Value);
        if name.chars().count() == 1 {
            // Undeclared single-character flags behave as boolean presence.
            let value = match bound_value {
                Some(t) => Value::Bool(Value::truthy(&t.value)),
                None => Value::Bool(true),
            };
            self.out.values.insert(name.to_string(), value);
        } else if let Some(t) = bound_value {
            // A `=`-bound value belongs to the unknown option, not to the
            // positional stream.
            self.out
                .values
                .insert(name.to_string(), Value::Str(t.value.clone()));
        }
        if bound_value.is_some() { 2 } else { 1 }
    }

    /// Run choices + custom validation, then store. Failed checks append an
    /// error but the value is kept.
    fn store_checked(&mut self, def: &OptionDef, display: &str, value: Value) {
        if !def.choices.is_empty() {
            let items: Vec<&Value> = match &value {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            for item in items {
                let shown = item.to_string();
                if !def.choices.iter().any(|c| c == &shown) {
                    self.out.errors.push(format!(
                        "invalid value '{}' for {} (choose from: {})",
                        shown,
                        display,
                        def.choices.join(", ")
                    ));
                }
            }
        }
        if let Some(validate) = &def.validate {
            if let Err(err) = validate(&value) {
                self.out.errors.push(err);
            }
        }
        self.out.values.insert(def.name.clone(), value);
    }

    fn finish(mut self) -> (ParsedOptions, Vec<Token>) {
        for def in self.defs {
            if !self.out.values.contains_key(&def.name) {
                if let Some(default) = &def.default {
                    self.out.values.insert(def.name.clone(), default.clone());
                } else if def.required {
                    self.out
                        .errors
                        .push(format!("missing required option '--{}'", def.name));
                }
            }
        }
        (self.out, self.remaining)
    }
}

fn coerce_value(def: &OptionDef, display: &str, raw: &str) -> Result<Value, String> {
    if let Some(coerce) = &def.coerce {
        return coerce(raw);
    }
    match def.kind {
        OptionType::Str => Ok(Value::Str(raw.to_string())),
        OptionType::Number => coerce_number(display, raw),
        OptionType::Boolean => Ok(Value::Bool(Value::truthy(raw))),
        OptionType::Array => Ok(coerce_array(raw)),
        OptionType::Object => Ok(coerce_object(raw)),
    }
}

// ============================================================================
// Tests
// ============================================================================
