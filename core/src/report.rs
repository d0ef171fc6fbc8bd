//! Parse reports: a serialisable snapshot of a finished parse.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::binding::Slot;
use crate::error::ErrorKind;
use crate::tree::{CommandTree, ParseOutcome, SchemaId};
use crate::value::Value;

/// Summary of one parse.
///
/// # Examples
///
/// ```
/// use argwright_core::*;
///
/// let mut tree = CommandTree::new();
/// let root = tree
///     .insert(
///         Schema::new()
///             .with_positional(PositionalSpec::new("n", "count").kind(ValueKind::Int32))
///             .with_flag(FlagSpec::new(Some('v'), Some("verbose"), "chatty")),
///     )
///     .unwrap();
///
/// let outcome = tree.parse(root, ["prog", "-v", "12"]);
/// let report = ParseReport::collect(&tree, root, outcome);
/// assert!(report.success);
/// assert_eq!(report.selected_command, vec!["prog"]);
/// let json = serde_json::to_value(&report).unwrap();
/// assert_eq!(json["commands"][0]["values"]["n"], 12);
/// assert_eq!(json["commands"][0]["values"]["--verbose"], true);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ParseReport {
    pub success: bool,
    pub error: ErrorKind,
    pub error_description: &'static str,
    /// Command path of the schema that failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_command: Option<Vec<String>>,
    /// Command path from the root to the deepest selected subcommand.
    pub selected_command: Vec<String>,
    /// Bound values of every schema on the selected path, root first.
    pub commands: Vec<CommandValues>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandValues {
    pub command: Vec<String>,
    pub values: BTreeMap<String, ReportedValue>,
}

/// A bound value as it appears in a report. Unset arguments are omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportedValue {
    Value(Value),
    List(Vec<Value>),
    Switch(bool),
    Count(u64),
    /// Command path of the schema in which a capture flag fired.
    Capture(Vec<String>),
}

impl ParseReport {
    /// Builds the report for `outcome` of a parse started at `root`.
    pub fn collect(tree: &CommandTree, root: SchemaId, outcome: ParseOutcome) -> Self {
        let (error, failed_command) = match outcome {
            ParseOutcome::Success => (ErrorKind::Ok, None),
            ParseOutcome::Failed(id) => {
                let kind = tree.schema(id).map(|s| s.error()).unwrap_or(ErrorKind::InvalidConfig);
                (kind, Some(tree.command_path(id)))
            }
        };

        let selected = selected_path(tree, root);
        let commands = selected
            .iter()
            .map(|&id| CommandValues {
                command: tree.command_path(id),
                values: collect_values(tree, id),
            })
            .collect();

        Self {
            success: outcome.is_success(),
            error,
            error_description: error.description(),
            failed_command,
            selected_command: selected.last().map(|&id| tree.command_path(id)).unwrap_or_default(),
            commands,
        }
    }
}

/// Follows bound subcommand values down from `root`.
fn selected_path(tree: &CommandTree, root: SchemaId) -> Vec<SchemaId> {
    let mut path = Vec::new();
    let mut current = Some(root);
    while let Some(id) = current.take() {
        let Some(schema) = tree.schema(id) else { break };
        path.push(id);
        current = schema.positionals().find_map(|p| match p.binding().value() {
            Some(Value::Subcommand(entry)) if tree.schema(entry.schema).and_then(|s| s.parent()) == Some(id) => {
                Some(entry.schema)
            }
            _ => None,
        });
        // Stale bindings may form a cycle.
        if current.is_some_and(|next| path.contains(&next)) {
            break;
        }
    }
    path
}

fn collect_values(tree: &CommandTree, id: SchemaId) -> BTreeMap<String, ReportedValue> {
    let Some(schema) = tree.schema(id) else {
        return BTreeMap::new();
    };
    schema
        .args()
        .iter()
        .filter_map(|arg| {
            let reported = match arg.binding().slot() {
                Slot::Unset => return None,
                Slot::Value(value) => ReportedValue::Value(value),
                Slot::List(list) => ReportedValue::List(list.items().to_vec()),
                Slot::Switch(on) => ReportedValue::Switch(on),
                Slot::Count(n) => ReportedValue::Count(n),
                Slot::Capture(None) => return None,
                Slot::Capture(Some(at)) => ReportedValue::Capture(tree.command_path(at)),
            };
            Some((arg.display_name(), reported))
        })
        .collect()
}
