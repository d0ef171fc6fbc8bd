//! The schema arena and the parse entry point.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::log::LogLevel;
use crate::parse;
use crate::schema::Schema;
use crate::validate::{ValidationError, validate_schema};

/// Index of a schema inside a [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaId(usize);

impl SchemaId {
    /// Position of the schema in insertion order.
    pub fn index(self) -> usize {
        self.0
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of [`CommandTree::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Every schema on the selected path finished without error.
    Success,
    /// The innermost schema that recorded an error; see [`Schema::error`].
    Failed(SchemaId),
}

impl ParseOutcome {
    /// Returns `true` on success.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// The failing schema, if any.
    pub fn failed(self) -> Option<SchemaId> {
        match self {
            Self::Success => None,
            Self::Failed(id) => Some(id),
        }
    }
}

/// What a path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsKind {
    File,
    Dir,
    Other,
}

/// Filesystem capability used by the Path, File and Dir verifiers.
pub trait FsProbe: Send + Sync {
    /// Kind of the entry at `path`, or `None` if nothing exists there.
    fn kind(&self, path: &Path) -> Option<FsKind>;
}

/// [`FsProbe`] backed by `std::fs::metadata`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFs;

impl FsProbe for StdFs {
    fn kind(&self, path: &Path) -> Option<FsKind> {
        let metadata = std::fs::metadata(path).ok()?;
        Some(if metadata.is_file() {
            FsKind::File
        } else if metadata.is_dir() {
            FsKind::Dir
        } else {
            FsKind::Other
        })
    }
}

/// Owner of every schema of a command hierarchy.
///
/// Schemas reference nested schemas by [`SchemaId`], and only ids returned by
/// earlier [`CommandTree::insert`] calls are accepted, so the hierarchy is
/// always acyclic. Insert leaves first, then the schemas that select them.
///
/// # Examples
///
/// ```
/// use argwright_core::*;
///
/// let mut tree = CommandTree::new();
/// let count = Binding::new();
/// let root = tree
///     .insert(
///         Schema::new()
///             .with_positional(PositionalSpec::new("count", "how many").kind(ValueKind::UInt32).bind(count.clone()))
///             .with_flag(FlagSpec::help()),
///     )
///     .unwrap();
///
/// assert_eq!(tree.parse(root, ["prog", "42"]), ParseOutcome::Success);
/// assert_eq!(count.get::<u32>(), Some(42));
///
/// let outcome = tree.parse(root, ["prog", "many"]);
/// assert_eq!(outcome, ParseOutcome::Failed(root));
/// assert_eq!(tree.schema(root).unwrap().error(), ErrorKind::InvalidValue);
/// ```
pub struct CommandTree {
    schemas: Vec<Schema>,
    fs: Arc<dyn FsProbe>,
}

impl CommandTree {
    /// Creates an empty tree using [`StdFs`].
    pub fn new() -> Self {
        Self {
            schemas: Vec::new(),
            fs: Arc::new(StdFs),
        }
    }

    /// Replaces the filesystem capability.
    pub fn set_fs_probe(&mut self, probe: impl FsProbe + 'static) {
        self.fs = Arc::new(probe);
    }

    /// Validates `schema` and adds it to the tree.
    ///
    /// Advisory findings are logged at [`LogLevel::ConfigWarning`] through the
    /// schema's sink; the first hard error is logged at
    /// [`LogLevel::ConfigError`] and returned.
    pub fn insert(&mut self, schema: Schema) -> Result<SchemaId, ValidationError> {
        let findings = validate_schema(self, &schema);
        let mut first_error = None;
        for finding in findings {
            if finding.is_warning() {
                schema.log(LogLevel::ConfigWarning, format_args!("{finding}"));
            } else if first_error.is_none() {
                schema.log(LogLevel::ConfigError, format_args!("{finding}"));
                first_error = Some(finding);
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        let id = SchemaId(self.schemas.len());
        self.schemas.push(schema);
        tracing::debug!(schema = %id, "inserted schema");
        Ok(id)
    }

    /// The schema behind `id`.
    pub fn schema(&self, id: SchemaId) -> Option<&Schema> {
        self.schemas.get(id.0)
    }

    /// Mutable access, e.g. to lower the minimum log level after a failure.
    pub fn schema_mut(&mut self, id: SchemaId) -> Option<&mut Schema> {
        self.schemas.get_mut(id.0)
    }

    /// Number of schemas.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Returns `true` if no schema has been inserted.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Iterates over all schemas with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (SchemaId, &Schema)> {
        self.schemas.iter().enumerate().map(|(i, s)| (SchemaId(i), s))
    }

    /// Re-runs validation of the schema behind `id`.
    pub fn validate(&self, id: SchemaId) -> Vec<ValidationError> {
        self.schema(id)
            .map(|schema| validate_schema(self, schema))
            .unwrap_or_default()
    }

    /// Command names from the root down to `id`, following parent links.
    ///
    /// Only meaningful after a parse has selected `id`.
    pub fn command_path(&self, id: SchemaId) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(id) = current {
            let Some(schema) = self.schema(id) else { break };
            path.push(schema.name().unwrap_or_default().to_string());
            current = schema.parent();
        }
        path.reverse();
        path
    }

    /// Parses `args` against the schema `root`.
    ///
    /// `args[0]` is the program name; it becomes the root schema's name. Bound
    /// values are written through the specs' bindings as tokens are matched.
    pub fn parse<I, S>(&mut self, root: SchemaId, args: I) -> ParseOutcome
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        let mut tokens = args.into_iter().map(Into::into);
        let program = tokens.next();
        let tokens: Vec<Arc<str>> = tokens.collect();

        let Some(schema) = self.schemas.get_mut(root.0) else {
            tracing::error!(schema = %root, "parse called with an unknown schema id");
            return ParseOutcome::Failed(root);
        };
        if let Some(program) = program {
            schema.name = Some(program.to_string());
        }
        schema.parent = None;

        let fs = Arc::clone(&self.fs);
        parse::run(self, fs.as_ref(), root, &tokens)
    }

    pub(crate) fn schema_at(&mut self, id: SchemaId) -> Option<&mut Schema> {
        self.schemas.get_mut(id.0)
    }

    pub(crate) fn record_error(&mut self, id: SchemaId, error: ErrorKind) -> ParseOutcome {
        if let Some(schema) = self.schemas.get_mut(id.0) {
            schema.error = error;
        }
        ParseOutcome::Failed(id)
    }
}

impl Default for CommandTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommandTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTree")
            .field("schemas", &self.schemas.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use super::*;
    use crate::spec::{FlagSpec, PositionalSpec};
    use crate::value::ValueKind;

    struct FakeFs(HashMap<PathBuf, FsKind>);

    impl FsProbe for FakeFs {
        fn kind(&self, path: &Path) -> Option<FsKind> {
            self.0.get(path).copied()
        }
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let mut tree = CommandTree::new();
        let a = tree.insert(Schema::new()).unwrap();
        let b = tree.insert(Schema::new()).unwrap();
        assert_eq!((a.index(), b.index()), (0, 1));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_insert_rejects_invalid_schema() {
        let mut tree = CommandTree::new();
        let err = tree
            .insert(
                Schema::new()
                    .with_flag(FlagSpec::new(Some('v'), None, ""))
                    .with_flag(FlagSpec::new(Some('v'), None, "")),
            )
            .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateFlag("-v".to_string()));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_program_name_becomes_root_name() {
        let mut tree = CommandTree::new();
        let root = tree.insert(Schema::new()).unwrap();
        assert!(tree.parse(root, ["tool"]).is_success());
        assert_eq!(tree.schema(root).unwrap().name(), Some("tool"));
        assert_eq!(tree.command_path(root), vec!["tool".to_string()]);
    }

    #[test]
    fn test_unknown_root_fails() {
        let mut tree = CommandTree::new();
        let outcome = tree.parse(SchemaId::from_index(3), ["prog"]);
        assert_eq!(outcome.failed(), Some(SchemaId::from_index(3)));
    }

    #[test]
    fn test_custom_fs_probe_is_used() {
        let mut tree = CommandTree::new();
        tree.set_fs_probe(FakeFs(HashMap::from([(
            PathBuf::from("virtual.txt"),
            FsKind::File,
        )])));
        let root = tree
            .insert(Schema::new().with_positional(PositionalSpec::new("input", "").kind(ValueKind::File)))
            .unwrap();

        assert!(tree.parse(root, ["prog", "virtual.txt"]).is_success());
        assert!(!tree.parse(root, ["prog", "missing.txt"]).is_success());
    }
}
