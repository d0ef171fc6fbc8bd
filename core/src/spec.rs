//! Argument specifications: positionals, options and flags.
//!
//! Specs are built with small builder chains. Defaults are explicit:
//! `kind: String`, not a list, required (positionals), no payload, and a
//! spec-owned binding whose shape follows the spec.

use std::fmt;
use std::sync::Arc;

use crate::binding::{Binding, SlotShape};
use crate::choice::{ChoiceSet, SubcommandSet};
use crate::schema::Schema;
use crate::tree::SchemaId;
use crate::value::ValueKind;
use crate::verify::Verification;

/// User-supplied verifier for [`ValueKind::Custom`].
///
/// Receives the verification context and the raw token; returns `true` to
/// accept. A verifier that accepts without calling
/// [`Verification::set`] binds the token as text.
pub type CustomVerifyFn = Arc<dyn Fn(&mut Verification<'_>, &str) -> bool + Send + Sync>;

/// Callback invoked by a [`FlagKind::Callback`] flag with the active schema.
pub type CallbackFn = Arc<dyn Fn(SchemaId, &Schema) + Send + Sync>;

/// Kind-specific extra data of a positional or option.
#[derive(Clone, Default)]
pub enum Payload {
    /// No payload (all kinds except Custom, Choice and Subcommand).
    #[default]
    None,
    /// Verifier of a [`ValueKind::Custom`] argument.
    Verifier(CustomVerifyFn),
    /// Allowed literals of a [`ValueKind::Choice`] argument.
    Choices(ChoiceSet),
    /// Nested commands of a [`ValueKind::Subcommand`] positional.
    Subcommands(SubcommandSet),
}

impl Payload {
    /// The kind this payload belongs to, or `None` for [`Payload::None`].
    pub fn required_kind(&self) -> Option<ValueKind> {
        match self {
            Self::None => None,
            Self::Verifier(_) => Some(ValueKind::Custom),
            Self::Choices(_) => Some(ValueKind::Choice),
            Self::Subcommands(_) => Some(ValueKind::Subcommand),
        }
    }

    /// The choice set, if this is a choice payload.
    pub fn choices(&self) -> Option<&ChoiceSet> {
        match self {
            Self::Choices(set) => Some(set),
            _ => None,
        }
    }

    /// The subcommand set, if this is a subcommand payload.
    pub fn subcommands(&self) -> Option<&SubcommandSet> {
        match self {
            Self::Subcommands(set) => Some(set),
            _ => None,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Verifier(_) => f.write_str("Verifier(..)"),
            Self::Choices(set) => f.debug_tuple("Choices").field(set).finish(),
            Self::Subcommands(set) => f.debug_tuple("Subcommands").field(set).finish(),
        }
    }
}

/// Value settings shared by positionals and options.
#[derive(Debug, Clone, Default)]
pub(crate) struct ValueSettings {
    pub kind: ValueKind,
    pub is_list: bool,
    pub payload: Payload,
    binding: Binding,
    bound_by_caller: bool,
}

impl ValueSettings {
    fn finalize(&mut self) {
        if !self.bound_by_caller {
            self.binding = if self.is_list {
                Binding::list(self.kind)
            } else {
                Binding::new()
            };
        }
    }

    fn bind(&mut self, binding: Binding) {
        self.binding = binding;
        self.bound_by_caller = true;
    }

    pub(crate) fn binding(&self) -> &Binding {
        &self.binding
    }

    pub(crate) fn expected_shape(&self) -> SlotShape {
        if self.is_list {
            SlotShape::List
        } else {
            SlotShape::Value
        }
    }
}

macro_rules! value_builders {
    () => {
        /// Sets the value kind.
        pub fn kind(mut self, kind: ValueKind) -> Self {
            self.value.kind = kind;
            self
        }

        /// Makes every matched token append to a list.
        pub fn list(mut self) -> Self {
            self.value.is_list = true;
            self
        }

        /// Restricts the value to `choices` (sets the kind to Choice).
        pub fn choices(mut self, choices: ChoiceSet) -> Self {
            self.value.kind = ValueKind::Choice;
            self.value.payload = Payload::Choices(choices);
            self
        }

        /// Verifies tokens with `verify` (sets the kind to Custom).
        pub fn custom<F>(mut self, verify: F) -> Self
        where
            F: Fn(&mut Verification<'_>, &str) -> bool + Send + Sync + 'static,
        {
            self.value.kind = ValueKind::Custom;
            self.value.payload = Payload::Verifier(Arc::new(verify));
            self
        }

        /// Stores results in a caller-held binding.
        pub fn bind(mut self, binding: Binding) -> Self {
            self.value.bind(binding);
            self
        }

        /// Sets the payload directly, without touching the kind.
        pub fn payload(mut self, payload: Payload) -> Self {
            self.value.payload = payload;
            self
        }

        /// The value kind.
        pub fn value_kind(&self) -> ValueKind {
            self.value.kind
        }

        /// Returns `true` for list-valued specs.
        pub fn is_list(&self) -> bool {
            self.value.is_list
        }

        /// The kind-specific payload.
        pub fn value_payload(&self) -> &Payload {
            &self.value.payload
        }

        /// The storage slot handle.
        pub fn binding(&self) -> &Binding {
            &self.value.binding
        }
    };
}

/// A positional argument, matched by order.
///
/// # Examples
///
/// ```
/// use argwright_core::{PositionalSpec, ValueKind};
///
/// let files = PositionalSpec::new("files", "input files")
///     .kind(ValueKind::File)
///     .list()
///     .optional();
/// assert!(files.is_list());
/// assert!(files.is_optional());
/// assert_eq!(files.value_kind(), ValueKind::File);
/// ```
#[derive(Debug, Clone)]
pub struct PositionalSpec {
    pub name: String,
    pub description: String,
    pub optional: bool,
    value: ValueSettings,
}

impl PositionalSpec {
    /// Creates a required string positional.
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            optional: false,
            value: ValueSettings::default(),
        }
    }

    /// Allows the positional to be omitted.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Selects a nested command (sets the kind to Subcommand).
    pub fn subcommands(mut self, subcommands: SubcommandSet) -> Self {
        self.value.kind = ValueKind::Subcommand;
        self.value.payload = Payload::Subcommands(subcommands);
        self
    }

    /// Returns `true` if the positional may be omitted.
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub(crate) fn settings(&self) -> &ValueSettings {
        &self.value
    }

    value_builders!();
}

/// An option: a named argument that takes a value.
///
/// Long names are given without the leading dashes.
///
/// # Examples
///
/// ```
/// use argwright_core::{OptionSpec, ValueKind};
///
/// let quality = OptionSpec::new(Some('q'), Some("quality"), "NUM", "output quality")
///     .kind(ValueKind::UInt8);
/// assert_eq!(quality.display_name(), "--quality");
/// assert!(quality.matches_short('q'));
/// ```
#[derive(Debug, Clone)]
pub struct OptionSpec {
    pub short: Option<char>,
    pub long: Option<String>,
    pub value_name: String,
    pub description: String,
    value: ValueSettings,
}

impl OptionSpec {
    /// Creates a string option.
    pub fn new(short: Option<char>, long: Option<&str>, value_name: &str, description: &str) -> Self {
        Self {
            short,
            long: long.map(String::from),
            value_name: value_name.to_string(),
            description: description.to_string(),
            value: ValueSettings::default(),
        }
    }

    /// `--long` if present, otherwise `-s`.
    pub fn display_name(&self) -> String {
        display_name(self.short, self.long.as_deref())
    }

    /// Returns `true` if `c` is this option's short name.
    pub fn matches_short(&self, c: char) -> bool {
        self.short == Some(c)
    }

    /// Returns `true` if `name` (without dashes) is this option's long name.
    pub fn matches_long(&self, name: &str) -> bool {
        self.long.as_deref() == Some(name)
    }

    pub(crate) fn settings(&self) -> &ValueSettings {
        &self.value
    }

    value_builders!();
}

/// Effect of a flag occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    /// Sets a switch to `true`.
    #[default]
    Bool,
    /// Increments a counter.
    Count,
    /// Records the schema in which the flag occurred.
    ConfigCapture,
    /// Invokes a callback with the active schema.
    Callback,
}

impl FlagKind {
    pub(crate) fn expected_shape(self) -> Option<SlotShape> {
        match self {
            Self::Bool => Some(SlotShape::Switch),
            Self::Count => Some(SlotShape::Count),
            Self::ConfigCapture => Some(SlotShape::Capture),
            Self::Callback => None,
        }
    }
}

/// A flag: a named argument that takes no value.
///
/// # Examples
///
/// ```
/// use argwright_core::{FlagKind, FlagSpec};
///
/// let verbose = FlagSpec::new(Some('v'), Some("verbose"), "increase verbosity").count();
/// assert_eq!(verbose.kind, FlagKind::Count);
///
/// let help = FlagSpec::help();
/// assert!(help.exit);
/// assert!(help.matches_long("help"));
/// ```
#[derive(Clone)]
pub struct FlagSpec {
    pub short: Option<char>,
    pub long: Option<String>,
    pub description: String,
    pub kind: FlagKind,
    /// Stop parsing the active schema right after this flag's effect.
    pub exit: bool,
    pub callback: Option<CallbackFn>,
    binding: Binding,
    bound_by_caller: bool,
}

impl FlagSpec {
    /// Creates a boolean flag.
    pub fn new(short: Option<char>, long: Option<&str>, description: &str) -> Self {
        Self {
            short,
            long: long.map(String::from),
            description: description.to_string(),
            kind: FlagKind::Bool,
            exit: false,
            callback: None,
            binding: Binding::switch(),
            bound_by_caller: false,
        }
    }

    /// `-h, --help`: boolean flag that stops parsing.
    pub fn help() -> Self {
        Self::new(Some('h'), Some("help"), "print this help dialog").exit()
    }

    /// `-h, --help`: records the schema that asked for help and stops parsing.
    pub fn help_capture() -> Self {
        Self::help().capture()
    }

    /// `--version`: boolean flag that stops parsing.
    pub fn version() -> Self {
        Self::new(None, Some("version"), "print the version").exit()
    }

    /// Counts occurrences.
    pub fn count(mut self) -> Self {
        self.kind = FlagKind::Count;
        self
    }

    /// Records the schema in which the flag occurs.
    pub fn capture(mut self) -> Self {
        self.kind = FlagKind::ConfigCapture;
        self
    }

    /// Invokes `callback` on each occurrence.
    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(SchemaId, &Schema) + Send + Sync + 'static,
    {
        self.kind = FlagKind::Callback;
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Stops parsing of the active schema after the flag's effect.
    pub fn exit(mut self) -> Self {
        self.exit = true;
        self
    }

    /// Stores results in a caller-held binding.
    pub fn bind(mut self, binding: Binding) -> Self {
        self.binding = binding;
        self.bound_by_caller = true;
        self
    }

    /// The storage slot handle.
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// `--long` if present, otherwise `-s`.
    pub fn display_name(&self) -> String {
        display_name(self.short, self.long.as_deref())
    }

    /// Returns `true` if `c` is this flag's short name.
    pub fn matches_short(&self, c: char) -> bool {
        self.short == Some(c)
    }

    /// Returns `true` if `name` (without dashes) is this flag's long name.
    pub fn matches_long(&self, name: &str) -> bool {
        self.long.as_deref() == Some(name)
    }

    fn finalize(&mut self) {
        if self.bound_by_caller {
            return;
        }
        self.binding = match self.kind {
            FlagKind::Bool => Binding::switch(),
            FlagKind::Count => Binding::counter(),
            FlagKind::ConfigCapture => Binding::capture(),
            FlagKind::Callback => Binding::new(),
        };
    }
}

impl fmt::Debug for FlagSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagSpec")
            .field("short", &self.short)
            .field("long", &self.long)
            .field("kind", &self.kind)
            .field("exit", &self.exit)
            .field("callback", &self.callback.as_ref().map(|_| ".."))
            .finish_non_exhaustive()
    }
}

/// One declared argument of a schema.
#[derive(Debug, Clone)]
pub enum ArgumentSpec {
    Positional(PositionalSpec),
    Option(OptionSpec),
    Flag(FlagSpec),
}

impl ArgumentSpec {
    /// Name used in diagnostics: the positional name or the dashed flag name.
    pub fn display_name(&self) -> String {
        match self {
            Self::Positional(p) => p.name.clone(),
            Self::Option(o) => o.display_name(),
            Self::Flag(f) => f.display_name(),
        }
    }

    /// The storage slot handle.
    pub fn binding(&self) -> &Binding {
        match self {
            Self::Positional(p) => p.binding(),
            Self::Option(o) => o.binding(),
            Self::Flag(f) => f.binding(),
        }
    }

    pub(crate) fn finalize(&mut self) {
        match self {
            Self::Positional(p) => p.value.finalize(),
            Self::Option(o) => o.value.finalize(),
            Self::Flag(f) => f.finalize(),
        }
    }
}

impl From<PositionalSpec> for ArgumentSpec {
    fn from(spec: PositionalSpec) -> Self {
        Self::Positional(spec)
    }
}

impl From<OptionSpec> for ArgumentSpec {
    fn from(spec: OptionSpec) -> Self {
        Self::Option(spec)
    }
}

impl From<FlagSpec> for ArgumentSpec {
    fn from(spec: FlagSpec) -> Self {
        Self::Flag(spec)
    }
}

fn display_name(short: Option<char>, long: Option<&str>) -> String {
    match (short, long) {
        (_, Some(long)) => format!("--{long}"),
        (Some(short), None) => format!("-{short}"),
        (None, None) => "<unnamed>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use crate::binding::Slot;

    use super::*;

    #[test]
    fn test_finalize_picks_binding_shape() {
        let mut spec: ArgumentSpec = PositionalSpec::new("files", "").kind(ValueKind::Int32).list().into();
        spec.finalize();
        match spec.binding().slot() {
            Slot::List(list) => assert_eq!(list.item_size(), 4),
            other => panic!("expected list slot, got {other:?}"),
        }

        let mut flag: ArgumentSpec = FlagSpec::new(Some('v'), None, "").count().into();
        flag.finalize();
        assert_eq!(flag.binding().slot(), Slot::Count(0));
    }

    #[test]
    fn test_finalize_keeps_caller_binding() {
        let shared = Binding::with_default(3u8);
        let mut spec: ArgumentSpec = OptionSpec::new(Some('q'), None, "N", "")
            .kind(ValueKind::UInt8)
            .bind(shared.clone())
            .into();
        spec.finalize();
        assert!(spec.binding().same_slot(&shared));
    }

    #[test]
    fn test_payload_builders_set_kind() {
        let spec = OptionSpec::new(None, Some("format"), "FMT", "")
            .choices(ChoiceSet::new().with_choice("png", ""));
        assert_eq!(spec.value_kind(), ValueKind::Choice);
        assert_eq!(spec.value_payload().required_kind(), Some(ValueKind::Choice));

        let spec = PositionalSpec::new("word", "").custom(|_, token| !token.is_empty());
        assert_eq!(spec.value_kind(), ValueKind::Custom);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(FlagSpec::new(Some('w'), None, "").display_name(), "-w");
        assert_eq!(FlagSpec::version().display_name(), "--version");
        assert_eq!(ArgumentSpec::from(PositionalSpec::new("src", "")).display_name(), "src");
    }
}
