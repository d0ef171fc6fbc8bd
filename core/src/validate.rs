//! Schema validation.
//!
//! Validates structural invariants of a schema before it enters a
//! [`CommandTree`], catching malformed flag names, duplicates, payloads that
//! disagree with their kind, and bindings of the wrong shape before they can
//! surface as confusing parse results.
//!
//! # Examples
//!
//! ```
//! use argwright_core::*;
//!
//! let tree = CommandTree::new();
//! let schema = Schema::new().with_flag(FlagSpec::new(Some('v'), Some("verbose"), ""));
//! assert!(validate_schema(&tree, &schema).is_empty());
//!
//! // Invalid: long name given with its dashes
//! let bad = Schema::new().with_flag(FlagSpec::new(None, Some("--verbose"), ""));
//! assert!(!validate_schema(&tree, &bad).is_empty());
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::binding::Slot;
use crate::schema::Schema;
use crate::spec::{ArgumentSpec, FlagKind, FlagSpec, Payload, ValueSettings};
use crate::tree::{CommandTree, SchemaId};
use crate::value::ValueKind;

/// Schema validation findings.
///
/// Most variants are hard errors that make [`CommandTree::insert`] fail;
/// [`ValidationError::is_warning`] identifies the advisory ones.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A positional has an empty name.
    #[error("positional must have a name")]
    MissingPositionalName,
    /// An option or flag has neither short nor long form.
    #[error("option or flag must define a short or long form")]
    MissingFlagName,
    /// Short name is `-` or not a visible character.
    #[error("invalid short flag: {0:?}")]
    InvalidShortFlag(char),
    /// Long name is empty, starts with `-`, or contains `=` or whitespace.
    #[error("invalid long flag: {0:?}")]
    InvalidLongFlag(String),
    /// Two options or flags share a name.
    #[error("duplicate flag in scope: {0}")]
    DuplicateFlag(String),
    /// Two subcommands of one set share a name.
    #[error("duplicate subcommand in scope: {0}")]
    DuplicateSubcommand(String),
    /// Two choices of one set match the same literal.
    #[error("duplicate choice in '{arg}': {literal}")]
    DuplicateChoice { arg: String, literal: String },
    /// A choice or subcommand set has no entries.
    #[error("'{0}' has an empty set of choices or subcommands")]
    EmptySet(String),
    /// A payload belongs to another kind.
    #[error("'{arg}' is {kind} but carries a {payload} payload")]
    PayloadMismatch {
        arg: String,
        kind: ValueKind,
        payload: ValueKind,
    },
    /// A choice, subcommand or custom argument lacks its payload.
    #[error("'{arg}' is {kind} but has no matching payload")]
    MissingPayload { arg: String, kind: ValueKind },
    /// Only positionals can select subcommands.
    #[error("option '{0}' cannot be a subcommand")]
    SubcommandOption(String),
    /// A subcommand positional was marked as a list.
    #[error("subcommand positional '{0}' cannot be a list")]
    SubcommandList(String),
    /// A positional follows a subcommand positional.
    #[error("positional '{0}' follows a subcommand positional")]
    PositionalAfterSubcommand(String),
    /// A subcommand refers to a schema not yet in the tree.
    #[error("subcommand '{name}' refers to unknown schema {schema}")]
    UnknownSubcommandSchema { name: String, schema: SchemaId },
    /// A caller-supplied binding has the wrong slot shape.
    #[error("'{arg}' needs a {expected} binding, found {found}")]
    BindingShapeMismatch {
        arg: String,
        expected: &'static str,
        found: &'static str,
    },
    /// A binding default is not a value of the argument's kind.
    #[error("default of '{arg}' is not a {kind} value")]
    DefaultKindMismatch { arg: String, kind: ValueKind },
    /// A callback flag without a callback.
    #[error("callback flag '{0}' has no callback")]
    MissingCallback(String),
    /// A list positional is followed by another list positional and no
    /// terminator is configured; the first list consumes every token.
    #[error("list '{0}' is followed by another list; set a list terminator to split them")]
    AmbiguousListReservation(String),
    /// A list's element size disagrees with its kind; every item will be
    /// rejected.
    #[error("list '{arg}' has element size {found}, {kind} needs {expected}")]
    ListItemSizeMismatch {
        arg: String,
        kind: ValueKind,
        expected: usize,
        found: usize,
    },
}

impl ValidationError {
    /// Returns `true` for advisory findings that do not reject the schema.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::AmbiguousListReservation(_) | Self::ListItemSizeMismatch { .. }
        )
    }
}

/// Validates a schema against the tree it is about to join.
///
/// Returns every finding, warnings included.
///
/// # Examples
///
/// ```
/// use argwright_core::*;
///
/// let tree = CommandTree::new();
/// let schema = Schema::new()
///     .with_positional(PositionalSpec::new("a", "").list())
///     .with_positional(PositionalSpec::new("b", "").list());
/// let findings = validate_schema(&tree, &schema);
/// assert_eq!(findings, vec![ValidationError::AmbiguousListReservation("a".to_string())]);
/// assert!(findings[0].is_warning());
/// ```
pub fn validate_schema(tree: &CommandTree, schema: &Schema) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen_names = HashSet::new();
    let mut after_subcommand = false;

    let positionals: Vec<_> = schema.positionals().collect();
    for (i, positional) in positionals.iter().enumerate() {
        if positional.name.trim().is_empty() {
            errors.push(ValidationError::MissingPositionalName);
        }
        if after_subcommand {
            errors.push(ValidationError::PositionalAfterSubcommand(positional.name.clone()));
        }
        if positional.value_kind() == ValueKind::Subcommand {
            after_subcommand = true;
            if positional.is_list() {
                errors.push(ValidationError::SubcommandList(positional.name.clone()));
            }
        }
        if positional.is_list()
            && schema.options.list_terminator.is_none()
            && positionals[i + 1..].iter().any(|p| p.is_list())
        {
            errors.push(ValidationError::AmbiguousListReservation(positional.name.clone()));
        }
    }

    for arg in schema.args() {
        let name = arg.display_name();
        match arg {
            ArgumentSpec::Positional(p) => {
                validate_value(tree, &name, p.settings(), &mut errors);
            }
            ArgumentSpec::Option(o) => {
                validate_names(o.short, o.long.as_deref(), &mut seen_names, &mut errors);
                if o.value_kind() == ValueKind::Subcommand {
                    errors.push(ValidationError::SubcommandOption(name.clone()));
                }
                validate_value(tree, &name, o.settings(), &mut errors);
            }
            ArgumentSpec::Flag(f) => {
                validate_names(f.short, f.long.as_deref(), &mut seen_names, &mut errors);
                validate_flag(&name, f, &mut errors);
            }
        }
    }

    errors
}

/// Validates every schema of a tree.
pub fn validate_tree(tree: &CommandTree) -> Vec<(SchemaId, ValidationError)> {
    tree.iter()
        .flat_map(|(id, schema)| {
            validate_schema(tree, schema)
                .into_iter()
                .map(move |err| (id, err))
        })
        .collect()
}

fn validate_names(
    short: Option<char>,
    long: Option<&str>,
    seen: &mut HashSet<String>,
    errors: &mut Vec<ValidationError>,
) {
    if short.is_none() && long.is_none() {
        errors.push(ValidationError::MissingFlagName);
        return;
    }

    if let Some(short) = short {
        if short == '-' || short.is_whitespace() || short.is_control() {
            errors.push(ValidationError::InvalidShortFlag(short));
        } else if !seen.insert(format!("-{short}")) {
            errors.push(ValidationError::DuplicateFlag(format!("-{short}")));
        }
    }

    if let Some(long) = long {
        if long.is_empty() || long.starts_with('-') || long.contains('=') || long.contains(char::is_whitespace) {
            errors.push(ValidationError::InvalidLongFlag(long.to_string()));
        } else if !seen.insert(format!("--{long}")) {
            errors.push(ValidationError::DuplicateFlag(format!("--{long}")));
        }
    }
}

fn validate_value(tree: &CommandTree, name: &str, settings: &ValueSettings, errors: &mut Vec<ValidationError>) {
    let kind = settings.kind;

    match (settings.payload.required_kind(), kind) {
        (Some(payload), kind) if payload != kind => errors.push(ValidationError::PayloadMismatch {
            arg: name.to_string(),
            kind,
            payload,
        }),
        (None, ValueKind::Choice | ValueKind::Subcommand | ValueKind::Custom) => {
            errors.push(ValidationError::MissingPayload {
                arg: name.to_string(),
                kind,
            })
        }
        _ => {}
    }

    match &settings.payload {
        Payload::Choices(set) => {
            if set.is_empty() {
                errors.push(ValidationError::EmptySet(name.to_string()));
            }
            for (i, choice) in set.items().iter().enumerate() {
                let duplicate = set.items()[..i]
                    .iter()
                    .any(|earlier| set.literals_equal(&earlier.value, &choice.value));
                if duplicate {
                    errors.push(ValidationError::DuplicateChoice {
                        arg: name.to_string(),
                        literal: choice.value.clone(),
                    });
                }
            }
        }
        Payload::Subcommands(set) => {
            if set.is_empty() {
                errors.push(ValidationError::EmptySet(name.to_string()));
            }
            let mut seen = HashSet::new();
            for sub in set.items() {
                if !seen.insert(sub.name.as_str()) {
                    errors.push(ValidationError::DuplicateSubcommand(sub.name.clone()));
                }
                if tree.schema(sub.schema).is_none() {
                    errors.push(ValidationError::UnknownSubcommandSchema {
                        name: sub.name.clone(),
                        schema: sub.schema,
                    });
                }
            }
        }
        Payload::None | Payload::Verifier(_) => {}
    }

    let slot = settings.binding().lock();
    let expected = settings.expected_shape();
    if slot.shape() != expected {
        errors.push(ValidationError::BindingShapeMismatch {
            arg: name.to_string(),
            expected: expected.name(),
            found: slot.shape().name(),
        });
        return;
    }
    match &*slot {
        Slot::Value(value) if !kind.accepts(value) => {
            errors.push(ValidationError::DefaultKindMismatch {
                arg: name.to_string(),
                kind,
            });
        }
        Slot::List(list) if !list.fits(kind) => {
            errors.push(ValidationError::ListItemSizeMismatch {
                arg: name.to_string(),
                kind,
                expected: kind.item_size().unwrap_or_default(),
                found: list.item_size(),
            });
        }
        _ => {}
    }
}

fn validate_flag(name: &str, flag: &FlagSpec, errors: &mut Vec<ValidationError>) {
    if flag.kind == FlagKind::Callback && flag.callback.is_none() {
        errors.push(ValidationError::MissingCallback(name.to_string()));
    }
    let Some(expected) = flag.kind.expected_shape() else {
        return;
    };
    let found = flag.binding().lock().shape();
    if found != expected {
        errors.push(ValidationError::BindingShapeMismatch {
            arg: name.to_string(),
            expected: expected.name(),
            found: found.name(),
        });
    }
}

#[cfg(test)]
mod tests {
    use crate::binding::Binding;
    use crate::choice::{ChoiceSet, SubcommandSet};
    use crate::spec::{OptionSpec, PositionalSpec};

    use super::*;

    #[test]
    fn test_rejects_duplicate_flag_across_options_and_flags() {
        let tree = CommandTree::new();
        let schema = Schema::new()
            .with_option(OptionSpec::new(Some('o'), Some("output"), "FILE", ""))
            .with_flag(FlagSpec::new(None, Some("output"), ""));
        assert_eq!(
            validate_schema(&tree, &schema),
            vec![ValidationError::DuplicateFlag("--output".to_string())]
        );
    }

    #[test]
    fn test_rejects_bad_names() {
        let tree = CommandTree::new();
        let schema = Schema::new()
            .with_flag(FlagSpec::new(Some('-'), None, ""))
            .with_flag(FlagSpec::new(None, Some("a=b"), ""))
            .with_flag(FlagSpec::new(None, None, ""));
        assert_eq!(
            validate_schema(&tree, &schema),
            vec![
                ValidationError::InvalidShortFlag('-'),
                ValidationError::InvalidLongFlag("a=b".to_string()),
                ValidationError::MissingFlagName,
            ]
        );
    }

    #[test]
    fn test_payload_must_match_kind() {
        let tree = CommandTree::new();
        let schema = Schema::new()
            .with_positional(PositionalSpec::new("mode", "").kind(ValueKind::Choice))
            .with_positional(
                PositionalSpec::new("n", "")
                    .choices(ChoiceSet::new().with_choice("a", ""))
                    .kind(ValueKind::Int32),
            );
        let errors = validate_schema(&tree, &schema);
        assert!(matches!(errors[0], ValidationError::MissingPayload { .. }));
        assert!(matches!(
            errors[1],
            ValidationError::PayloadMismatch {
                payload: ValueKind::Choice,
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_choices_respect_case_rule() {
        let tree = CommandTree::new();
        let set = ChoiceSet::new().with_choice("png", "").with_choice("PNG", "");
        let sensitive = Schema::new().with_positional(PositionalSpec::new("f", "").choices(set.clone()));
        assert!(validate_schema(&tree, &sensitive).is_empty());

        let insensitive =
            Schema::new().with_positional(PositionalSpec::new("f", "").choices(set.case_insensitive()));
        assert_eq!(
            validate_schema(&tree, &insensitive),
            vec![ValidationError::DuplicateChoice {
                arg: "f".to_string(),
                literal: "PNG".to_string()
            }]
        );
    }

    #[test]
    fn test_subcommand_rules() {
        let mut tree = CommandTree::new();
        let init = tree.insert(Schema::new()).unwrap();
        let set = SubcommandSet::new()
            .with_subcommand("init", "", init)
            .with_subcommand("init", "", init)
            .with_subcommand("ghost", "", SchemaId::from_index(9));
        let schema = Schema::new()
            .with_positional(PositionalSpec::new("command", "").subcommands(set))
            .with_positional(PositionalSpec::new("extra", ""));

        let errors = validate_schema(&tree, &schema);
        assert!(errors.contains(&ValidationError::DuplicateSubcommand("init".to_string())));
        assert!(errors.contains(&ValidationError::UnknownSubcommandSchema {
            name: "ghost".to_string(),
            schema: SchemaId::from_index(9)
        }));
        assert!(errors.contains(&ValidationError::PositionalAfterSubcommand("extra".to_string())));
    }

    #[test]
    fn test_binding_shape_and_default_checks() {
        let tree = CommandTree::new();
        let schema = Schema::new()
            .with_flag(FlagSpec::new(Some('v'), None, "").count().bind(Binding::switch()))
            .with_option(
                OptionSpec::new(Some('n'), None, "N", "")
                    .kind(ValueKind::Int32)
                    .bind(Binding::with_default("ten")),
            )
            .with_positional(PositionalSpec::new("xs", "").list().bind(Binding::new()));

        assert_eq!(
            validate_schema(&tree, &schema),
            vec![
                ValidationError::BindingShapeMismatch {
                    arg: "-v".to_string(),
                    expected: "count",
                    found: "switch"
                },
                ValidationError::DefaultKindMismatch {
                    arg: "-n".to_string(),
                    kind: ValueKind::Int32
                },
                ValidationError::BindingShapeMismatch {
                    arg: "xs".to_string(),
                    expected: "list",
                    found: "value"
                },
            ]
        );
    }

    #[test]
    fn test_list_size_mismatch_is_a_warning() {
        let tree = CommandTree::new();
        let schema = Schema::new().with_positional(
            PositionalSpec::new("ids", "")
                .kind(ValueKind::Int64)
                .list()
                .bind(Binding::list_with_item_size(4)),
        );
        let errors = validate_schema(&tree, &schema);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_warning());
    }

    #[test]
    fn test_terminator_silences_list_warning() {
        let tree = CommandTree::new();
        let mut schema = Schema::new()
            .with_positional(PositionalSpec::new("a", "").list())
            .with_positional(PositionalSpec::new("b", "").list());
        schema.options.list_terminator = Some("::".to_string());
        assert!(validate_schema(&tree, &schema).is_empty());
    }
}
