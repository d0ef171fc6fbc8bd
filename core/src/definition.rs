//! Schema documents.
//!
//! A [`CommandDefinition`] describes a command tree in YAML or JSON so that
//! schemas can be declared without writing Rust. [`CommandDefinition::build`]
//! turns a document into schemas of a [`CommandTree`]. Custom verifiers and
//! callback flags have no document form.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::binding::Binding;
use crate::choice::{Choice, ChoiceSet, SubcommandSet};
use crate::schema::{Schema, SchemaOptions};
use crate::spec::{ArgumentSpec, FlagKind, FlagSpec, OptionSpec, PositionalSpec};
use crate::tree::{CommandTree, SchemaId};
use crate::validate::ValidationError;
use crate::value::{Value, ValueKind};
use crate::verify::{VerifyError, convert_literal};

/// Errors raised while loading or building a schema document.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("'{arg}' in '{command}': kind {kind} cannot be declared in a document")]
    UnsupportedKind {
        command: String,
        arg: String,
        kind: ValueKind,
    },
    #[error("'{flag}' in '{command}': callback flags cannot be declared in a document")]
    UnsupportedFlag { command: String, flag: String },
    #[error("'{arg}' in '{command}': list arguments cannot have a default")]
    ListDefault { command: String, arg: String },
    #[error("'{arg}' in '{command}': invalid default '{literal}': {source}")]
    BadDefault {
        command: String,
        arg: String,
        literal: String,
        #[source]
        source: VerifyError,
    },
    #[error("invalid command '{command}': {source}")]
    Invalid {
        command: String,
        #[source]
        source: ValidationError,
    },
}

fn default_command_arg() -> String {
    "command".to_string()
}

/// A command declared in a schema document.
///
/// # Examples
///
/// ```
/// use argwright_core::{CommandDefinition, CommandTree};
///
/// let doc = r#"
/// name: archive
/// args:
///   - type: option
///     short: l
///     long: level
///     kind: uint8
///     default: 6
///   - type: positional
///     name: files
///     kind: string
///     list: true
/// "#;
///
/// let mut tree = CommandTree::new();
/// let built = CommandDefinition::from_yaml_str(doc).unwrap().build(&mut tree).unwrap();
/// assert!(tree.parse(built.root, ["archive", "-l", "9", "a", "b"]).is_success());
/// assert_eq!(built.binding(&[], "--level").unwrap().get::<u8>(), Some(9));
/// assert_eq!(built.binding(&[], "files").unwrap().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandDefinition {
    pub name: String,
    /// One-line summary shown in the parent's command list.
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub options: SchemaOptions,
    #[serde(default)]
    pub args: Vec<ArgDefinition>,
    /// Name of the positional that selects a subcommand.
    #[serde(default = "default_command_arg")]
    pub command_arg: String,
    #[serde(default)]
    pub subcommands: Vec<CommandDefinition>,
}

/// One argument of a [`CommandDefinition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArgDefinition {
    Positional {
        name: String,
        #[serde(default)]
        description: String,
        #[serde(flatten)]
        value: ValueDefinition,
        #[serde(default)]
        optional: bool,
    },
    Option {
        #[serde(default)]
        short: Option<char>,
        #[serde(default)]
        long: Option<String>,
        #[serde(default)]
        value_name: Option<String>,
        #[serde(default)]
        description: String,
        #[serde(flatten)]
        value: ValueDefinition,
    },
    Flag {
        #[serde(default)]
        short: Option<char>,
        #[serde(default)]
        long: Option<String>,
        #[serde(default)]
        description: String,
        #[serde(default)]
        kind: FlagKind,
        #[serde(default)]
        exit: bool,
    },
}

/// Value settings shared by positionals and options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueDefinition {
    #[serde(default)]
    pub kind: ValueKind,
    #[serde(default)]
    pub list: bool,
    /// Default literal, converted with the argument's kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Allowed literals; a non-empty list makes the kind `choice`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub case_insensitive: bool,
    #[serde(default)]
    pub hide_choice_details: bool,
}

/// Schemas created by [`CommandDefinition::build`].
#[derive(Debug, Clone)]
pub struct BuiltCommand {
    pub root: SchemaId,
    commands: BTreeMap<Vec<String>, BuiltSchema>,
}

/// One schema of a [`BuiltCommand`] with its bindings by argument name.
#[derive(Debug, Clone)]
pub struct BuiltSchema {
    pub id: SchemaId,
    pub bindings: BTreeMap<String, Binding>,
}

impl BuiltCommand {
    /// Schema reached through the subcommand names in `path` (empty for the root).
    pub fn command(&self, path: &[&str]) -> Option<&BuiltSchema> {
        let key: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        self.commands.get(&key)
    }

    /// Binding of `name` in the schema at `path`.
    ///
    /// Names follow [`Schema::binding`]: positional names, `--long`, or `-s`
    /// when the argument has no long name.
    pub fn binding(&self, path: &[&str], name: &str) -> Option<&Binding> {
        self.command(path)?.bindings.get(name)
    }

    /// All schemas keyed by subcommand path.
    pub fn commands(&self) -> impl Iterator<Item = (&[String], &BuiltSchema)> {
        self.commands.iter().map(|(path, built)| (path.as_slice(), built))
    }
}

impl CommandDefinition {
    /// Reads a document; `.json` files are parsed as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self, DefinitionError> {
        let content = std::fs::read_to_string(path).map_err(|source| DefinitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    pub fn from_yaml_str(input: &str) -> Result<Self, DefinitionError> {
        Ok(serde_yaml::from_str(input)?)
    }

    pub fn from_json_str(input: &str) -> Result<Self, DefinitionError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Inserts the document's schemas into `tree`, children first.
    pub fn build(&self, tree: &mut CommandTree) -> Result<BuiltCommand, DefinitionError> {
        let mut commands = BTreeMap::new();
        let root = self.build_into(tree, &mut Vec::new(), &mut commands)?;
        Ok(BuiltCommand { root, commands })
    }

    fn build_into(
        &self,
        tree: &mut CommandTree,
        path: &mut Vec<String>,
        commands: &mut BTreeMap<Vec<String>, BuiltSchema>,
    ) -> Result<SchemaId, DefinitionError> {
        let mut subcommands = SubcommandSet::new();
        for child in &self.subcommands {
            path.push(child.name.clone());
            let id = child.build_into(tree, path, commands)?;
            path.pop();
            subcommands = subcommands.with_subcommand(&child.name, &child.description, id);
        }

        let command = if path.is_empty() {
            self.name.clone()
        } else {
            path.join(" ")
        };

        let mut schema = Schema::new().with_options(self.options.clone());
        for arg in &self.args {
            schema = schema.with_arg(arg.to_spec(&command)?);
        }
        if !subcommands.is_empty() {
            schema = schema.with_positional(PositionalSpec::new(&self.command_arg, "command to run").subcommands(subcommands));
        }

        let bindings = schema
            .args()
            .iter()
            .map(|arg| (arg.display_name(), arg.binding().clone()))
            .collect();

        let id = tree
            .insert(schema)
            .map_err(|source| DefinitionError::Invalid { command, source })?;
        commands.insert(path.clone(), BuiltSchema { id, bindings });
        Ok(id)
    }
}

impl ArgDefinition {
    fn to_spec(&self, command: &str) -> Result<ArgumentSpec, DefinitionError> {
        match self {
            Self::Positional {
                name,
                description,
                value,
                optional,
            } => {
                let mut spec = PositionalSpec::new(name, description);
                if *optional {
                    spec = spec.optional();
                }
                let (choices, binding) = value.resolve(command, name)?;
                spec = spec.kind(value.kind);
                if let Some(choices) = choices {
                    spec = spec.choices(choices);
                }
                if value.list {
                    spec = spec.list();
                }
                if let Some(binding) = binding {
                    spec = spec.bind(binding);
                }
                Ok(spec.into())
            }
            Self::Option {
                short,
                long,
                value_name,
                description,
                value,
            } => {
                let value_name = value_name.clone().unwrap_or_else(|| match long {
                    Some(long) => long.to_uppercase(),
                    None => "VALUE".to_string(),
                });
                let mut spec = OptionSpec::new(*short, long.as_deref(), &value_name, description);
                let (choices, binding) = value.resolve(command, &spec.display_name())?;
                spec = spec.kind(value.kind);
                if let Some(choices) = choices {
                    spec = spec.choices(choices);
                }
                if value.list {
                    spec = spec.list();
                }
                if let Some(binding) = binding {
                    spec = spec.bind(binding);
                }
                Ok(spec.into())
            }
            Self::Flag {
                short,
                long,
                description,
                kind,
                exit,
            } => {
                let mut spec = FlagSpec::new(*short, long.as_deref(), description);
                spec = match kind {
                    FlagKind::Bool => spec,
                    FlagKind::Count => spec.count(),
                    FlagKind::ConfigCapture => spec.capture(),
                    FlagKind::Callback => {
                        return Err(DefinitionError::UnsupportedFlag {
                            command: command.to_string(),
                            flag: spec.display_name(),
                        });
                    }
                };
                if *exit {
                    spec = spec.exit();
                }
                Ok(spec.into())
            }
        }
    }
}

impl ValueDefinition {
    /// Builds the choice set and the default binding, if any.
    fn resolve(&self, command: &str, arg: &str) -> Result<(Option<ChoiceSet>, Option<Binding>), DefinitionError> {
        if matches!(self.kind, ValueKind::Custom | ValueKind::Subcommand) {
            return Err(DefinitionError::UnsupportedKind {
                command: command.to_string(),
                arg: arg.to_string(),
                kind: self.kind,
            });
        }

        let choices = (!self.choices.is_empty()).then(|| {
            let mut set = self
                .choices
                .iter()
                .fold(ChoiceSet::new(), |set, c| set.with_choice(&c.value, &c.description));
            if self.case_insensitive {
                set = set.case_insensitive();
            }
            if self.hide_choice_details {
                set = set.hide_details();
            }
            set
        });

        let Some(default) = &self.default else {
            return Ok((choices, None));
        };
        if self.list {
            return Err(DefinitionError::ListDefault {
                command: command.to_string(),
                arg: arg.to_string(),
            });
        }

        let literal = match default {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let bad_default = |source| DefinitionError::BadDefault {
            command: command.to_string(),
            arg: arg.to_string(),
            literal: literal.clone(),
            source,
        };
        let value = match &choices {
            Some(set) => Value::Choice(set.find(&literal).ok_or_else(|| bad_default(VerifyError::NoSuchChoice))?),
            None => convert_literal(self.kind, &literal).map_err(bad_default)?,
        };
        Ok((choices, Some(Binding::with_default(value))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIT: &str = r#"
name: git
options:
  description: A tiny git
args:
  - type: flag
    short: h
    long: help
    kind: config_capture
    exit: true
subcommands:
  - name: init
    description: create a repository
    args:
      - type: flag
        short: q
        long: quiet
      - type: positional
        name: dir
        kind: path
        optional: true
        default: "."
  - name: log
    description: show history
    args:
      - type: option
        short: n
        long: max-count
        kind: uint32
      - type: option
        long: format
        choices:
          - value: oneline
          - value: full
        default: full
"#;

    #[test]
    fn test_build_nested_document() {
        let mut tree = CommandTree::new();
        let built = CommandDefinition::from_yaml_str(GIT).unwrap().build(&mut tree).unwrap();
        assert_eq!(tree.len(), 3);
        assert!(built.command(&["init"]).is_some());
        assert_eq!(
            built.binding(&["init"], "dir").unwrap().get::<String>().as_deref(),
            Some(".")
        );

        assert!(tree.parse(built.root, ["git", "log", "-n", "3"]).is_success());
        assert_eq!(built.binding(&["log"], "--max-count").unwrap().get::<u32>(), Some(3));
        let format = built.binding(&["log"], "--format").unwrap().value().unwrap();
        assert!(matches!(format, Value::Choice(c) if c.value == "full"));
        let root_schema = tree.schema(built.root).unwrap();
        assert_eq!(root_schema.options.description.as_deref(), Some("A tiny git"));
        assert!(root_schema.binding("command").is_some());
    }

    #[test]
    fn test_json_document() {
        let doc = r#"{"name": "echo", "args": [{"type": "positional", "name": "words", "list": true, "optional": true}]}"#;
        let mut tree = CommandTree::new();
        let built = CommandDefinition::from_json_str(doc).unwrap().build(&mut tree).unwrap();
        assert!(tree.parse(built.root, ["echo", "a", "b"]).is_success());
        assert_eq!(built.binding(&[], "words").unwrap().values::<String>(), vec!["a", "b"]);
    }

    #[test]
    fn test_unsupported_and_bad_defaults() {
        let custom = "name: x\nargs:\n  - type: positional\n    name: v\n    kind: custom\n";
        let mut tree = CommandTree::new();
        let err = CommandDefinition::from_yaml_str(custom).unwrap().build(&mut tree).unwrap_err();
        assert!(matches!(err, DefinitionError::UnsupportedKind { kind: ValueKind::Custom, .. }));

        let callback = "name: x\nargs:\n  - type: flag\n    long: go\n    kind: callback\n";
        let err = CommandDefinition::from_yaml_str(callback).unwrap().build(&mut tree).unwrap_err();
        assert!(matches!(err, DefinitionError::UnsupportedFlag { .. }));

        let bad = "name: x\nargs:\n  - type: option\n    long: n\n    kind: uint8\n    default: 300\n";
        let err = CommandDefinition::from_yaml_str(bad).unwrap().build(&mut tree).unwrap_err();
        assert!(matches!(err, DefinitionError::BadDefault { source: VerifyError::OutOfRange, .. }));
        assert!(err.to_string().contains("'300'"));

        let list = "name: x\nargs:\n  - type: option\n    long: n\n    list: true\n    default: a\n";
        let err = CommandDefinition::from_yaml_str(list).unwrap().build(&mut tree).unwrap_err();
        assert!(matches!(err, DefinitionError::ListDefault { .. }));
    }

    #[test]
    fn test_validation_failure_is_reported() {
        let doc = "name: x\nargs:\n  - type: flag\n    short: v\n  - type: flag\n    short: v\n";
        let mut tree = CommandTree::new();
        let err = CommandDefinition::from_yaml_str(doc).unwrap().build(&mut tree).unwrap_err();
        assert!(matches!(
            err,
            DefinitionError::Invalid { source: ValidationError::DuplicateFlag(_), .. }
        ));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(matches!(
            CommandDefinition::from_yaml_str("name: x\nflags: []\n"),
            Err(DefinitionError::Yaml(_))
        ));
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tool.json");
        std::fs::write(&path, r#"{"name": "tool"}"#).unwrap();
        assert_eq!(CommandDefinition::load(&path).unwrap().name, "tool");

        let missing = dir.path().join("missing.yaml");
        assert!(matches!(CommandDefinition::load(&missing), Err(DefinitionError::Io { .. })));
    }
}
