//! Tokenizer, matcher and subcommand resolver.
//!
//! One scanner walks the tokens of one schema. A matched subcommand ends
//! the scan and the remaining tokens are handed to a fresh scan of the nested
//! schema, so recursion depth equals the depth of the selected command path.

use std::sync::Arc;

use crate::binding::{Binding, Slot};
use crate::choice::Subcommand;
use crate::error::ErrorKind;
use crate::log::LogLevel;
use crate::schema::Schema;
use crate::spec::{ArgumentSpec, FlagKind, Payload, PositionalSpec};
use crate::tree::{CommandTree, FsProbe, ParseOutcome, SchemaId};
use crate::value::{Value, ValueKind};
use crate::verify::{Verification, verify};

/// How a scan of one schema ended.
enum Step {
    Finished,
    Failed(ErrorKind),
    Descend { entry: Arc<Subcommand>, rest: usize },
}

/// Whether scanning continues after a flag or option.
enum Flow {
    Continue,
    Exit,
}

/// An option or flag found by name.
#[derive(Clone, Copy)]
enum Named {
    Option(usize),
    Flag(usize),
}

/// Parses `tokens` against the schema `id`, descending into subcommands.
pub(crate) fn run(tree: &mut CommandTree, fs: &dyn FsProbe, id: SchemaId, tokens: &[Arc<str>]) -> ParseOutcome {
    let Some(schema) = tree.schema_at(id) else {
        return ParseOutcome::Failed(id);
    };
    schema.error = ErrorKind::Ok;

    match Scanner::new(schema, id, fs).scan(tokens) {
        Step::Finished => ParseOutcome::Success,
        Step::Failed(kind) => tree.record_error(id, kind),
        Step::Descend { entry, rest } => descend(tree, fs, id, &entry, &tokens[rest..]),
    }
}

fn descend(
    tree: &mut CommandTree,
    fs: &dyn FsProbe,
    parent: SchemaId,
    entry: &Subcommand,
    tokens: &[Arc<str>],
) -> ParseOutcome {
    let child = entry.schema;
    let findings = tree.validate(child);
    let Some(schema) = tree.schema_at(child) else {
        if let Some(parent_schema) = tree.schema(parent) {
            parent_schema.log(
                LogLevel::ConfigError,
                format_args!("subcommand '{}' refers to unknown schema {child}", entry.name),
            );
        }
        return tree.record_error(parent, ErrorKind::InvalidConfig);
    };
    schema.name = Some(entry.name.clone());
    schema.parent = Some(parent);
    tracing::debug!(command = %entry.name, schema = %child, "entering subcommand");

    if let Some(err) = findings.iter().find(|f| !f.is_warning()) {
        schema.log(LogLevel::ConfigError, format_args!("{err}"));
        return tree.record_error(child, ErrorKind::InvalidConfig);
    }
    run(tree, fs, child, tokens)
}

struct Scanner<'s> {
    schema: &'s mut Schema,
    id: SchemaId,
    fs: &'s dyn FsProbe,
    /// Arg indices of the positionals, in order.
    positionals: Vec<usize>,
    /// Tokens bound to each positional.
    counts: Vec<usize>,
    cursor: usize,
    options_enabled: bool,
    one_shot: bool,
}

impl<'s> Scanner<'s> {
    fn new(schema: &'s mut Schema, id: SchemaId, fs: &'s dyn FsProbe) -> Self {
        let positionals: Vec<usize> = schema
            .args
            .iter()
            .enumerate()
            .filter(|(_, arg)| matches!(arg, ArgumentSpec::Positional(_)))
            .map(|(i, _)| i)
            .collect();
        let counts = vec![0; positionals.len()];
        Self {
            schema,
            id,
            fs,
            positionals,
            counts,
            cursor: 0,
            options_enabled: true,
            one_shot: false,
        }
    }

    fn scan(mut self, tokens: &[Arc<str>]) -> Step {
        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            i += 1;

            if self.is_ignored(token) {
                tracing::debug!(token = %token, "ignored");
                continue;
            }
            let forced = std::mem::take(&mut self.one_shot);
            if !forced && &**token == "--" {
                if self.schema.options.allow_option_toggle {
                    self.options_enabled = !self.options_enabled;
                } else {
                    self.one_shot = true;
                }
                continue;
            }

            if !forced && self.options_enabled {
                let flow = if let Some(body) = token.strip_prefix("--") {
                    Some(self.long(body, tokens, &mut i))
                } else if let Some(body) = token.strip_prefix('-').filter(|body| !body.is_empty()) {
                    Some(self.short(body, tokens, &mut i))
                } else {
                    None
                };
                match flow {
                    Some(Ok(Flow::Continue)) => continue,
                    Some(Ok(Flow::Exit)) => return Step::Finished,
                    Some(Err(kind)) => return Step::Failed(kind),
                    None => {}
                }
            }

            match self.positional(token, tokens, i) {
                Ok(None) => {}
                Ok(Some(step)) => return step,
                Err(kind) => return Step::Failed(kind),
            }
        }
        self.complete()
    }

    fn is_ignored(&self, token: &str) -> bool {
        self.schema
            .options
            .ignore_prefix
            .as_deref()
            .is_some_and(|prefix| !prefix.is_empty() && token.starts_with(prefix))
    }

    fn is_terminator(&self, token: &str) -> bool {
        self.schema.options.list_terminator.as_deref() == Some(token)
    }

    fn lookup_long(&self, name: &str) -> Option<Named> {
        self.schema.args.iter().enumerate().find_map(|(i, arg)| match arg {
            ArgumentSpec::Option(o) if o.matches_long(name) => Some(Named::Option(i)),
            ArgumentSpec::Flag(f) if f.matches_long(name) => Some(Named::Flag(i)),
            _ => None,
        })
    }

    fn lookup_short(&self, c: char) -> Option<Named> {
        self.schema.args.iter().enumerate().find_map(|(i, arg)| match arg {
            ArgumentSpec::Option(o) if o.matches_short(c) => Some(Named::Option(i)),
            ArgumentSpec::Flag(f) if f.matches_short(c) => Some(Named::Flag(i)),
            _ => None,
        })
    }

    fn is_exit_flag(&self, index: usize) -> bool {
        matches!(&self.schema.args[index], ArgumentSpec::Flag(f) if f.exit)
    }

    fn positional_spec(&self, k: usize) -> Option<&PositionalSpec> {
        match self.schema.args.get(*self.positionals.get(k)?)? {
            ArgumentSpec::Positional(p) => Some(p),
            _ => None,
        }
    }

    /// `--name`, `--name=value` or `--name value`.
    fn long(&mut self, body: &str, tokens: &[Arc<str>], i: &mut usize) -> Result<Flow, ErrorKind> {
        let (name, inline) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (body, None),
        };
        match self.lookup_long(name) {
            None => {
                self.schema
                    .log(LogLevel::Error, format_args!("unknown option '--{name}'"));
                Err(ErrorKind::InvalidOption)
            }
            Some(Named::Flag(_)) if inline.is_some() => {
                self.schema.log(
                    LogLevel::Error,
                    format_args!("flag '--{name}' does not take a value"),
                );
                Err(ErrorKind::InvalidOption)
            }
            Some(Named::Flag(index)) => self.apply_flag(index),
            Some(Named::Option(index)) => {
                let value = match inline {
                    Some(value) => Arc::from(value),
                    None => self.next_value(tokens, i, &format!("--{name}"))?,
                };
                self.bind(index, value)?;
                Ok(Flow::Continue)
            }
        }
    }

    /// `-abc`: flags apply left to right; an option takes the rest of the
    /// token, or the next token when nothing is left.
    fn short(&mut self, body: &str, tokens: &[Arc<str>], i: &mut usize) -> Result<Flow, ErrorKind> {
        for (pos, c) in body.char_indices() {
            match self.lookup_short(c) {
                None => {
                    self.schema
                        .log(LogLevel::Error, format_args!("unknown flag '-{c}'"));
                    return Err(ErrorKind::InvalidOption);
                }
                Some(Named::Flag(index)) => {
                    if let Flow::Exit = self.apply_flag(index)? {
                        return Ok(Flow::Exit);
                    }
                }
                Some(Named::Option(index)) => {
                    let rest = &body[pos + c.len_utf8()..];
                    let value = if rest.is_empty() {
                        self.next_value(tokens, i, &format!("-{c}"))?
                    } else {
                        Arc::from(rest)
                    };
                    self.bind(index, value)?;
                    return Ok(Flow::Continue);
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn next_value(&self, tokens: &[Arc<str>], i: &mut usize, name: &str) -> Result<Arc<str>, ErrorKind> {
        match tokens.get(*i) {
            Some(token) => {
                *i += 1;
                Ok(Arc::clone(token))
            }
            None => {
                self.schema
                    .log(LogLevel::Error, format_args!("option '{name}' requires a value"));
                Err(ErrorKind::InvalidOption)
            }
        }
    }

    fn apply_flag(&mut self, index: usize) -> Result<Flow, ErrorKind> {
        let ArgumentSpec::Flag(flag) = &self.schema.args[index] else {
            return Err(ErrorKind::InvalidConfig);
        };
        let exit = flag.exit;
        match flag.kind {
            FlagKind::Bool => *flag.binding().lock() = Slot::Switch(true),
            FlagKind::Count => {
                let mut slot = flag.binding().lock();
                let seen = match &*slot {
                    Slot::Count(n) => *n,
                    _ => 0,
                };
                *slot = Slot::Count(seen.saturating_add(1));
            }
            FlagKind::ConfigCapture => *flag.binding().lock() = Slot::Capture(Some(self.id)),
            FlagKind::Callback => {
                let Some(callback) = flag.callback.clone() else {
                    let name = flag.display_name();
                    self.schema.log(
                        LogLevel::ConfigError,
                        format_args!("callback flag '{name}' has no callback"),
                    );
                    return Err(ErrorKind::InvalidConfig);
                };
                callback(self.id, &*self.schema);
            }
        }
        if exit {
            tracing::debug!(flag = index, "exit flag stops the scan");
            Ok(Flow::Exit)
        } else {
            Ok(Flow::Continue)
        }
    }

    /// Binds `token` to the current positional. Returns a step when the scan
    /// of this schema ends here.
    fn positional(&mut self, token: &Arc<str>, tokens: &[Arc<str>], next: usize) -> Result<Option<Step>, ErrorKind> {
        loop {
            let k = self.cursor;
            let Some(spec) = self.positional_spec(k) else {
                self.schema
                    .log(LogLevel::Error, format_args!("unexpected argument '{token}'"));
                return Err(ErrorKind::TooManyArguments);
            };
            let (is_list, kind) = (spec.is_list(), spec.value_kind());
            let arg_index = self.positionals[k];

            if kind == ValueKind::Subcommand {
                return self.subcommand(k, token, next).map(Some);
            }
            if is_list {
                if self.is_terminator(token) {
                    self.cursor += 1;
                    return Ok(None);
                }
                if self.list_yields(k, token, tokens, next - 1) {
                    tracing::debug!(token = %token, "list yields to the next positional");
                    self.cursor += 1;
                    continue;
                }
                self.bind(arg_index, Arc::clone(token))?;
                self.counts[k] += 1;
                return Ok(None);
            }

            self.bind(arg_index, Arc::clone(token))?;
            self.counts[k] += 1;
            self.cursor += 1;
            return Ok(None);
        }
    }

    /// Decides whether the list positional `k` stops before `token` (found at
    /// `at`) so that the positionals after it can be satisfied.
    fn list_yields(&self, k: usize, token: &str, tokens: &[Arc<str>], at: usize) -> bool {
        let Some(spec) = self.positional_spec(k) else {
            return false;
        };
        let minimum = usize::from(!spec.is_optional());
        if self.counts[k] < minimum {
            return false;
        }

        let later: Vec<&PositionalSpec> = (k + 1..self.positionals.len())
            .filter_map(|j| self.positional_spec(j))
            .collect();
        if let Some(selector) = later.iter().position(|p| p.value_payload().subcommands().is_some()) {
            let Some(subcommands) = later[selector].value_payload().subcommands() else {
                return false;
            };
            // Required positionals before the selector still take their tokens.
            let required_between = later[..selector].iter().filter(|p| !p.is_optional()).count();
            if required_between == 0 {
                return subcommands.find(token).is_some();
            }
            return self
                .positional_tokens_ahead(tokens, at)
                .and_then(|ahead| ahead.get(required_between).copied())
                .is_some_and(|name| subcommands.find(name).is_some());
        }
        if later.iter().any(|p| p.is_list()) {
            return false;
        }

        let required_after = later.iter().filter(|p| !p.is_optional()).count();
        match self.positional_tokens_ahead(tokens, at) {
            Some(ahead) => ahead.len() <= required_after,
            None => false,
        }
    }

    /// The tokens from `at` on that would bind to positionals, found without
    /// side effects. `None` if a list terminator lies ahead.
    fn positional_tokens_ahead<'t>(&self, tokens: &'t [Arc<str>], at: usize) -> Option<Vec<&'t str>> {
        let mut ahead = vec![&*tokens[at]];
        let mut enabled = self.options_enabled;
        let mut one_shot = false;
        let mut j = at + 1;

        'tokens: while j < tokens.len() {
            let token = &*tokens[j];
            j += 1;
            if self.is_ignored(token) {
                continue;
            }
            let forced = std::mem::take(&mut one_shot);
            if !forced && token == "--" {
                if self.schema.options.allow_option_toggle {
                    enabled = !enabled;
                } else {
                    one_shot = true;
                }
                continue;
            }
            if !forced && enabled {
                if let Some(body) = token.strip_prefix("--") {
                    let (name, inline) = match body.split_once('=') {
                        Some((name, value)) => (name, Some(value)),
                        None => (body, None),
                    };
                    match self.lookup_long(name) {
                        Some(Named::Option(_)) if inline.is_none() => j += 1,
                        Some(Named::Flag(index)) if self.is_exit_flag(index) => break,
                        _ => {}
                    }
                    continue;
                }
                if let Some(body) = token.strip_prefix('-').filter(|body| !body.is_empty()) {
                    for (pos, c) in body.char_indices() {
                        match self.lookup_short(c) {
                            Some(Named::Flag(index)) if self.is_exit_flag(index) => break 'tokens,
                            Some(Named::Flag(_)) => {}
                            Some(Named::Option(_)) => {
                                if body[pos + c.len_utf8()..].is_empty() {
                                    j += 1;
                                }
                                break;
                            }
                            None => break,
                        }
                    }
                    continue;
                }
            }
            if self.is_terminator(token) {
                return None;
            }
            ahead.push(token);
        }
        Some(ahead)
    }

    fn subcommand(&mut self, k: usize, token: &str, next: usize) -> Result<Step, ErrorKind> {
        let Some(spec) = self.positional_spec(k) else {
            return Err(ErrorKind::InvalidConfig);
        };
        let entry = spec.value_payload().subcommands().and_then(|set| set.find(token));
        let Some(entry) = entry else {
            let name = spec.name.clone();
            self.schema.log(
                LogLevel::Error,
                format_args!("unknown command '{token}' for '{name}'"),
            );
            return Err(ErrorKind::InvalidValue);
        };
        spec.binding().set(Value::Subcommand(Arc::clone(&entry)));
        self.counts[k] += 1;
        self.cursor += 1;
        Ok(Step::Descend { entry, rest: next })
    }

    /// Verifies `token` for the positional or option at `index` and stores
    /// the result.
    fn bind(&mut self, index: usize, token: Arc<str>) -> Result<(), ErrorKind> {
        let value = {
            let Schema {
                args,
                options,
                sink,
                name,
                ledger,
                ..
            } = &mut *self.schema;
            let Some((kind, payload, _, _)) = value_parts(&args[index]) else {
                return Err(ErrorKind::InvalidConfig);
            };
            let arg_name = args[index].display_name();
            let mut ctx = Verification::new(
                name.as_deref().unwrap_or_default(),
                &arg_name,
                token,
                options,
                &**sink,
                ledger,
                self.fs,
            );
            verify(kind, payload, &mut ctx)
        };
        let Some(value) = value else {
            return Err(ErrorKind::InvalidValue);
        };
        self.store(index, value)
    }

    fn store(&self, index: usize, value: Value) -> Result<(), ErrorKind> {
        let arg = &self.schema.args[index];
        let Some((kind, _, is_list, binding)) = value_parts(arg) else {
            return Err(ErrorKind::InvalidConfig);
        };
        let rejected_size = {
            let mut slot = binding.lock();
            if !is_list {
                *slot = Slot::Value(value);
                return Ok(());
            }
            match &mut *slot {
                Slot::List(list) => {
                    if list.push_checked(kind, value) {
                        return Ok(());
                    }
                    Some(list.item_size())
                }
                _ => None,
            }
        };

        let name = arg.display_name();
        match rejected_size {
            Some(item_size) => {
                self.schema.log(
                    LogLevel::Error,
                    format_args!("list '{name}' holds {item_size}-byte elements, which cannot store {kind} values"),
                );
                Err(ErrorKind::InvalidValue)
            }
            None => {
                self.schema.log(
                    LogLevel::ConfigError,
                    format_args!("'{name}' is a list but is not bound to a list"),
                );
                Err(ErrorKind::InvalidConfig)
            }
        }
    }

    fn complete(self) -> Step {
        for k in 0..self.positionals.len() {
            let Some(spec) = self.positional_spec(k) else {
                continue;
            };
            if self.counts[k] == 0 && !spec.is_optional() {
                self.schema.log(
                    LogLevel::Error,
                    format_args!("missing required argument '{}'", spec.name),
                );
                return Step::Failed(ErrorKind::TooFewArguments);
            }
        }
        Step::Finished
    }
}

fn value_parts(arg: &ArgumentSpec) -> Option<(ValueKind, &Payload, bool, &Binding)> {
    match arg {
        ArgumentSpec::Positional(p) => Some((p.value_kind(), p.value_payload(), p.is_list(), p.binding())),
        ArgumentSpec::Option(o) => Some((o.value_kind(), o.value_payload(), o.is_list(), o.binding())),
        ArgumentSpec::Flag(_) => None,
    }
}
