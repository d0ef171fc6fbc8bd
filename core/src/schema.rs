//! Schemas: the declared arguments of one command plus its parse state.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::binding::Binding;
use crate::error::ErrorKind;
use crate::log::{LogLevel, LogSink, SharedSink, default_sink, emit};
use crate::spec::{ArgumentSpec, FlagSpec, OptionSpec, PositionalSpec};
use crate::tree::SchemaId;

/// Per-schema parser settings.
///
/// All fields have documented defaults, so one value can be shared by several
/// schemas or read from a schema document.
///
/// # Examples
///
/// ```
/// use argwright_core::{LogLevel, SchemaOptions};
///
/// let options: SchemaOptions =
///     serde_yaml::from_str("list_terminator: '::'\nmin_log_level: warning\n").unwrap();
/// assert_eq!(options.list_terminator.as_deref(), Some("::"));
/// assert_eq!(options.min_log_level, LogLevel::Warning);
/// assert!(options.show_notes);
/// assert!(!options.duplicate_strings);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaOptions {
    /// Tokens starting with this prefix are skipped entirely.
    pub ignore_prefix: Option<String>,
    /// Token that ends the current list positional.
    pub list_terminator: Option<String>,
    /// `--` toggles option parsing instead of disabling it for one token.
    pub allow_option_toggle: bool,
    /// Copy string values into the schema's ledger instead of sharing the
    /// argument buffers.
    pub duplicate_strings: bool,
    /// Diagnostics below this level are dropped.
    pub min_log_level: LogLevel,
    /// Command description shown in usage output.
    pub description: Option<String>,
    /// Show the notes section (terminator, prefix, toggle) in usage output.
    pub show_notes: bool,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            ignore_prefix: None,
            list_terminator: None,
            allow_option_toggle: false,
            duplicate_strings: false,
            min_log_level: LogLevel::Info,
            description: None,
            show_notes: true,
        }
    }
}

/// Strings duplicated by a schema, released as a unit.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    strings: Vec<Arc<str>>,
}

impl Ledger {
    /// Number of tracked strings.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Returns `true` if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Returns `true` if `s` is one of the tracked copies.
    pub fn owns(&self, s: &Arc<str>) -> bool {
        self.strings.iter().any(|owned| Arc::ptr_eq(owned, s))
    }

    pub(crate) fn duplicate(&mut self, s: &str) -> Arc<str> {
        let copy: Arc<str> = Arc::from(s);
        self.strings.push(Arc::clone(&copy));
        copy
    }

    /// Drops every tracked string. Safe to call repeatedly.
    pub fn release(&mut self) {
        self.strings = Vec::new();
    }
}

/// One command's declared arguments and its parse state.
///
/// # Examples
///
/// ```
/// use argwright_core::*;
///
/// let schema = Schema::new()
///     .with_positional(PositionalSpec::new("lhs", "left operand").kind(ValueKind::Int32))
///     .with_option(OptionSpec::new(Some('o'), Some("output"), "FILE", "output file"))
///     .with_flag(FlagSpec::help())
///     .with_description("Add two numbers");
///
/// assert_eq!(schema.args().len(), 3);
/// assert!(schema.binding("--output").is_some());
/// assert!(schema.binding("lhs").is_some());
/// assert_eq!(schema.error(), ErrorKind::Ok);
/// ```
pub struct Schema {
    pub(crate) args: Vec<ArgumentSpec>,
    pub options: SchemaOptions,
    pub(crate) sink: SharedSink,
    pub(crate) name: Option<String>,
    pub(crate) parent: Option<SchemaId>,
    pub(crate) ledger: Ledger,
    pub(crate) error: ErrorKind,
}

impl Schema {
    /// Creates an empty schema with default options and the tracing sink.
    pub fn new() -> Self {
        Self {
            args: Vec::new(),
            options: SchemaOptions::default(),
            sink: default_sink(),
            name: None,
            parent: None,
            ledger: Ledger::default(),
            error: ErrorKind::Ok,
        }
    }

    /// Appends any argument spec.
    pub fn with_arg(mut self, arg: impl Into<ArgumentSpec>) -> Self {
        let mut arg = arg.into();
        arg.finalize();
        self.args.push(arg);
        self
    }

    /// Appends a positional.
    pub fn with_positional(self, spec: PositionalSpec) -> Self {
        self.with_arg(spec)
    }

    /// Appends an option.
    pub fn with_option(self, spec: OptionSpec) -> Self {
        self.with_arg(spec)
    }

    /// Appends a flag.
    pub fn with_flag(self, spec: FlagSpec) -> Self {
        self.with_arg(spec)
    }

    /// Replaces the options.
    pub fn with_options(mut self, options: SchemaOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the description shown in usage output.
    pub fn with_description(mut self, description: &str) -> Self {
        self.options.description = Some(description.to_string());
        self
    }

    /// Routes diagnostics to `sink`.
    pub fn with_log_sink(self, sink: impl LogSink + 'static) -> Self {
        self.with_shared_sink(Arc::new(sink))
    }

    /// Routes diagnostics to an already shared sink.
    pub fn with_shared_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    /// Declared arguments in declaration order.
    pub fn args(&self) -> &[ArgumentSpec] {
        &self.args
    }

    /// Positionals in declaration order.
    pub fn positionals(&self) -> impl Iterator<Item = &PositionalSpec> {
        self.args.iter().filter_map(|arg| match arg {
            ArgumentSpec::Positional(p) => Some(p),
            _ => None,
        })
    }

    /// Options in declaration order.
    pub fn option_specs(&self) -> impl Iterator<Item = &OptionSpec> {
        self.args.iter().filter_map(|arg| match arg {
            ArgumentSpec::Option(o) => Some(o),
            _ => None,
        })
    }

    /// Flags in declaration order.
    pub fn flags(&self) -> impl Iterator<Item = &FlagSpec> {
        self.args.iter().filter_map(|arg| match arg {
            ArgumentSpec::Flag(f) => Some(f),
            _ => None,
        })
    }

    /// Binding of the argument named `name`.
    ///
    /// Positionals are found by name; options and flags by `--long` or `-s`.
    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.args.iter().find_map(|arg| {
            let matches = match arg {
                ArgumentSpec::Positional(p) => p.name == name,
                ArgumentSpec::Option(o) => named(o.short, o.long.as_deref(), name),
                ArgumentSpec::Flag(f) => named(f.short, f.long.as_deref(), name),
            };
            matches.then(|| arg.binding())
        })
    }

    /// Name assigned by the last parse: the program name for the root, the
    /// matched subcommand name for nested schemas.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The schema that selected this one during the last parse.
    pub fn parent(&self) -> Option<SchemaId> {
        self.parent
    }

    /// Error recorded by the last parse.
    pub fn error(&self) -> ErrorKind {
        self.error
    }

    /// Strings duplicated by this schema.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Sends a diagnostic through this schema's sink, honouring
    /// `min_log_level`.
    pub fn log(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        emit(
            self.sink.as_ref(),
            self.options.min_log_level,
            self.name().unwrap_or_default(),
            level,
            args,
        );
    }

    /// Returns `s` unchanged unless `duplicate_strings` is set, in which case
    /// an owned copy is tracked in the ledger and returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use argwright_core::{Schema, SchemaOptions};
    ///
    /// let input: Arc<str> = Arc::from("a.txt");
    /// let mut shared = Schema::new();
    /// assert!(Arc::ptr_eq(&shared.duplicate_string(&input), &input));
    ///
    /// let mut owning = Schema::new().with_options(SchemaOptions {
    ///     duplicate_strings: true,
    ///     ..SchemaOptions::default()
    /// });
    /// let copy = owning.duplicate_string(&input);
    /// assert!(!Arc::ptr_eq(&copy, &input));
    /// assert_eq!(owning.ledger().len(), 1);
    /// ```
    pub fn duplicate_string(&mut self, s: &Arc<str>) -> Arc<str> {
        if self.options.duplicate_strings {
            self.ledger.duplicate(s)
        } else {
            Arc::clone(s)
        }
    }

    /// Releases every duplicated string. Safe to call repeatedly.
    pub fn release_allocations(&mut self) {
        self.ledger.release();
    }

    /// Releases the ledger and every list bound to this schema's specs.
    ///
    /// Nested schemas are not touched.
    pub fn release_all(&mut self) {
        for arg in &self.args {
            arg.binding().release_list();
        }
        self.release_allocations();
    }
}

fn named(short: Option<char>, long: Option<&str>, name: &str) -> bool {
    if let Some(long_name) = name.strip_prefix("--") {
        return long == Some(long_name);
    }
    let mut chars = name.strip_prefix('-').unwrap_or_default().chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if short == Some(c))
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("args", &self.args)
            .field("options", &self.options)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
