//! Declarative command-line argument parsing.
//!
//! A program describes its command line as a tree of schemas:
//!
//! - [`Schema`]: the positionals, options and flags of one command, plus
//!   [`SchemaOptions`] and a [`LogSink`] for diagnostics.
//! - [`PositionalSpec`], [`OptionSpec`], [`FlagSpec`]: argument declarations.
//!   Each owns a [`Binding`], the shared slot its converted value lands in.
//! - [`ValueKind`]: the verifier applied to a token (integers, sizes,
//!   durations, paths, [`ChoiceSet`] literals, [`SubcommandSet`] names or a
//!   custom function).
//! - [`CommandTree`]: arena of schemas addressed by [`SchemaId`]; nested
//!   commands refer to their schema by id.
//!
//! [`CommandTree::parse`] walks the tokens once, binding values as they are
//! matched, and returns a [`ParseOutcome`] naming the failing schema on
//! error. Schemas are validated on insertion ([`validate_schema`]).
//! [`render_usage`] prints help text; [`CommandDefinition`] loads a tree
//! from a YAML or JSON document; [`ParseReport`] snapshots a finished parse.
//!
//! # Example
//!
//! ```
//! use argwright_core::*;
//!
//! let quality = Binding::with_default(80u8);
//! let mut tree = CommandTree::new();
//! let root = tree
//!     .insert(
//!         Schema::new()
//!             .with_positional(PositionalSpec::new("input", "image to convert").kind(ValueKind::String))
//!             .with_option(
//!                 OptionSpec::new(Some('q'), Some("quality"), "NUM", "output quality")
//!                     .kind(ValueKind::UInt8)
//!                     .bind(quality.clone()),
//!             )
//!             .with_flag(FlagSpec::new(Some('v'), Some("verbose"), "print progress")),
//!     )
//!     .unwrap();
//!
//! let outcome = tree.parse(root, ["convert", "-q", "95", "photo.png"]);
//! assert!(outcome.is_success());
//! assert_eq!(quality.get::<u8>(), Some(95));
//!
//! let schema = tree.schema(root).unwrap();
//! assert_eq!(schema.binding("input").unwrap().get::<String>().as_deref(), Some("photo.png"));
//! assert_eq!(schema.binding("--verbose").unwrap().slot(), Slot::Switch(false));
//! ```

mod binding;
mod choice;
mod definition;
mod error;
mod list;
mod log;
mod parse;
mod report;
mod schema;
mod spec;
mod tree;
mod usage;
mod validate;
mod value;
mod verify;

pub use binding::{Binding, Slot};
pub use choice::{Choice, ChoiceSet, Subcommand, SubcommandSet, choice_index, subcommand_index};
pub use definition::{ArgDefinition, BuiltCommand, BuiltSchema, CommandDefinition, DefinitionError, ValueDefinition};
pub use error::{ErrorKind, error_description};
pub use list::{LIST_INIT_CAPACITY, TypedList};
pub use log::{LogLevel, LogSink, SharedSink, TracingSink};
pub use report::{CommandValues, ParseReport, ReportedValue};
pub use schema::{Ledger, Schema, SchemaOptions};
pub use spec::{ArgumentSpec, CallbackFn, CustomVerifyFn, FlagKind, FlagSpec, OptionSpec, Payload, PositionalSpec};
pub use tree::{CommandTree, FsKind, FsProbe, ParseOutcome, SchemaId, StdFs};
pub use usage::{
    EntryUsage, FlagUsage, OptionUsage, PositionalUsage, Usage, UsageError, UsageFormat, log_usage, render_usage,
    write_usage,
};
pub use validate::{ValidationError, validate_schema, validate_tree};
pub use value::{FromValue, Value, ValueKind};
pub use verify::{
    TimeUnit, Verification, VerifyError, check_path, convert_literal, parse_bool, parse_double, parse_duration,
    parse_integer, parse_size,
};
