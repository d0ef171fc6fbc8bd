//! Usage rendering.
//!
//! [`Usage::from_tree`] snapshots the declared arguments of one schema into a
//! serialisable model; [`render_usage`] formats it. Rendering only reads the
//! tree and the current binding defaults, it never mutates either.

use std::io::Write;

use serde::Serialize;
use thiserror::Error;

use crate::binding::Slot;
use crate::log::LogLevel;
use crate::schema::Schema;
use crate::spec::{FlagKind, FlagSpec, OptionSpec, Payload, PositionalSpec};
use crate::tree::{CommandTree, SchemaId};
use crate::value::{Value, ValueKind};

/// Supported usage formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum UsageFormat {
    #[default]
    Text,
    Markdown,
    Json,
    Yaml,
}

/// Errors raised while rendering usage.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("unknown schema {0}")]
    UnknownSchema(SchemaId),
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to write usage: {0}")]
    Io(#[from] std::io::Error),
}

/// Usage model of one schema.
#[derive(Debug, Clone, Serialize)]
pub struct Usage {
    /// Program name followed by the subcommand names leading to the schema.
    pub command_path: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub positionals: Vec<PositionalUsage>,
    pub options: Vec<OptionUsage>,
    pub flags: Vec<FlagUsage>,
    pub subcommands: Vec<EntryUsage>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionalUsage {
    pub name: String,
    pub description: String,
    pub kind: ValueKind,
    pub list: bool,
    pub optional: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<EntryUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionUsage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long: Option<String>,
    pub value_name: String,
    pub description: String,
    pub kind: ValueKind,
    pub list: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<EntryUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlagUsage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long: Option<String>,
    pub description: String,
    pub kind: FlagKind,
    pub exit: bool,
}

/// A choice literal or a subcommand name with its description.
#[derive(Debug, Clone, Serialize)]
pub struct EntryUsage {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Usage {
    /// Builds the usage model of `id`.
    ///
    /// The command path follows the parent links recorded by the last parse;
    /// the root is shown as `program_name`.
    pub fn from_tree(tree: &CommandTree, id: SchemaId, program_name: &str) -> Result<Self, UsageError> {
        let schema = tree.schema(id).ok_or(UsageError::UnknownSchema(id))?;

        let mut command_path = Vec::new();
        let mut current = schema;
        while let Some(parent) = current.parent() {
            command_path.push(current.name().unwrap_or("<command>").to_string());
            current = tree.schema(parent).ok_or(UsageError::UnknownSchema(parent))?;
        }
        command_path.push(program_name.to_string());
        command_path.reverse();

        let subcommands = schema
            .positionals()
            .filter_map(|p| p.value_payload().subcommands())
            .flat_map(|set| set.items())
            .map(|sub| EntryUsage {
                name: sub.name.clone(),
                description: Some(sub.description.clone()),
            })
            .collect();

        Ok(Self {
            command_path,
            description: schema.options.description.clone(),
            positionals: schema.positionals().map(positional_usage).collect(),
            options: schema.option_specs().map(option_usage).collect(),
            flags: schema.flags().map(flag_usage).collect(),
            subcommands,
            notes: notes(schema),
        })
    }

    /// One-line synopsis, e.g. `prog [OPTIONS] <src>... <dest>`.
    pub fn synopsis(&self) -> String {
        let mut line = self.command_path.join(" ");
        if !self.options.is_empty() || !self.flags.is_empty() {
            line.push_str(" [OPTIONS]");
        }
        for p in &self.positionals {
            line.push(' ');
            line.push_str(&positional_label(p));
            if p.kind == ValueKind::Subcommand {
                line.push_str(" ...");
            }
        }
        line
    }
}

fn positional_label(p: &PositionalUsage) -> String {
    let dots = if p.list { "..." } else { "" };
    if p.optional {
        format!("[{}]{dots}", p.name)
    } else {
        format!("<{}>{dots}", p.name)
    }
}

fn choices(payload: &Payload) -> Vec<EntryUsage> {
    let Some(set) = payload.choices() else {
        return Vec::new();
    };
    set.items()
        .iter()
        .map(|choice| EntryUsage {
            name: choice.value.clone(),
            description: (!set.details_hidden()).then(|| choice.description.clone()),
        })
        .collect()
}

fn default_value(slot: Slot) -> Option<Value> {
    match slot {
        Slot::Value(value) => Some(value),
        _ => None,
    }
}

fn positional_usage(p: &PositionalSpec) -> PositionalUsage {
    PositionalUsage {
        name: p.name.clone(),
        description: p.description.clone(),
        kind: p.value_kind(),
        list: p.is_list(),
        optional: p.is_optional(),
        choices: choices(p.value_payload()),
        default: default_value(p.binding().slot()),
    }
}

fn option_usage(o: &OptionSpec) -> OptionUsage {
    OptionUsage {
        short: o.short,
        long: o.long.clone(),
        value_name: o.value_name.clone(),
        description: o.description.clone(),
        kind: o.value_kind(),
        list: o.is_list(),
        choices: choices(o.value_payload()),
        default: default_value(o.binding().slot()),
    }
}

fn flag_usage(f: &FlagSpec) -> FlagUsage {
    FlagUsage {
        short: f.short,
        long: f.long.clone(),
        description: f.description.clone(),
        kind: f.kind,
        exit: f.exit,
    }
}

fn notes(schema: &Schema) -> Vec<String> {
    let options = &schema.options;
    if !options.show_notes {
        return Vec::new();
    }
    let mut notes = Vec::new();
    if let Some(prefix) = options.ignore_prefix.as_deref().filter(|p| !p.is_empty()) {
        notes.push(format!("Arguments starting with '{prefix}' are ignored."));
    }
    if let Some(terminator) = &options.list_terminator {
        notes.push(format!("'{terminator}' ends the current list."));
    }
    if options.allow_option_toggle {
        notes.push("'--' toggles option parsing on and off.".to_string());
    }
    notes
}

/// Renders the usage of `id` in `format`.
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
///             .with_positional(PositionalSpec::new("files", "input files").list())
///             .with_option(OptionSpec::new(Some('o'), Some("output"), "FILE", "output file"))
///             .with_description("Concatenate files"),
///     )
///     .unwrap();
///
/// let text = render_usage(&tree, root, "cat", UsageFormat::Text).unwrap();
/// assert!(text.starts_with("Usage: cat [OPTIONS] <files>..."));
/// assert!(text.contains("-o, --output <FILE>"));
/// ```
pub fn render_usage(tree: &CommandTree, id: SchemaId, program_name: &str, format: UsageFormat) -> Result<String, UsageError> {
    let usage = Usage::from_tree(tree, id, program_name)?;
    match format {
        UsageFormat::Text => Ok(usage_to_text(&usage)),
        UsageFormat::Markdown => Ok(usage_to_markdown(&usage)),
        UsageFormat::Json => Ok(serde_json::to_string_pretty(&usage)?),
        UsageFormat::Yaml => Ok(serde_yaml::to_string(&usage)?),
    }
}

/// Renders the usage of `id` into `writer`.
pub fn write_usage<W: Write>(
    writer: &mut W,
    tree: &CommandTree,
    id: SchemaId,
    program_name: &str,
    format: UsageFormat,
) -> Result<(), UsageError> {
    let rendered = render_usage(tree, id, program_name, format)?;
    writer.write_all(rendered.as_bytes())?;
    Ok(())
}

/// Logs a usage line at `Info` through the schema's own sink.
pub fn log_usage(tree: &CommandTree, id: SchemaId, program_name: &str) -> Result<(), UsageError> {
    let usage = Usage::from_tree(tree, id, program_name)?;
    if let Some(schema) = tree.schema(id) {
        schema.log(LogLevel::Info, format_args!("usage: {}", usage.synopsis()));
    }
    Ok(())
}

fn option_label(short: Option<char>, long: Option<&str>, value_name: Option<&str>) -> String {
    let mut label = match (short, long) {
        (Some(s), Some(l)) => format!("-{s}, --{l}"),
        (Some(s), None) => format!("-{s}"),
        (None, Some(l)) => format!("    --{l}"),
        (None, None) => "?".to_string(),
    };
    if let Some(value_name) = value_name {
        label.push_str(&format!(" <{value_name}>"));
    }
    label
}

fn kind_hint(kind: ValueKind) -> String {
    match kind {
        ValueKind::String | ValueKind::Choice | ValueKind::Subcommand | ValueKind::Custom => String::new(),
        other => format!(" ({other})"),
    }
}

fn default_hint(default: Option<&Value>) -> String {
    match default {
        Some(Value::Text(s)) => format!(" [default: {s}]"),
        Some(Value::Custom(_)) | None => String::new(),
        Some(value) => match serde_json::to_string(value) {
            Ok(json) => format!(" [default: {json}]"),
            Err(_) => String::new(),
        },
    }
}

fn push_entries(out: &mut String, entries: &[EntryUsage], indent: usize) {
    let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
    if entries.iter().all(|e| e.description.is_none()) {
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        out.push_str(&format!("{:indent$}one of: {}\n", "", names.join(", ")));
        return;
    }
    for entry in entries {
        let desc = entry.description.as_deref().unwrap_or("");
        out.push_str(&format!("{:indent$}{:<width$}  {desc}\n", "", entry.name));
    }
}

fn usage_to_text(usage: &Usage) -> String {
    let mut out = format!("Usage: {}\n", usage.synopsis());

    if let Some(desc) = &usage.description {
        out.push_str(&format!("\n{desc}\n"));
    }

    let positional_rows: Vec<(String, &PositionalUsage)> = usage
        .positionals
        .iter()
        .map(|p| (positional_label(p), p))
        .collect();
    let mut option_rows: Vec<(String, String)> = usage
        .options
        .iter()
        .map(|o| {
            let label = option_label(o.short, o.long.as_deref(), Some(&o.value_name));
            let list = if o.list { " (repeatable)" } else { "" };
            let desc = format!("{}{}{list}{}", o.description, kind_hint(o.kind), default_hint(o.default.as_ref()));
            (label, desc)
        })
        .collect();
    option_rows.extend(
        usage
            .flags
            .iter()
            .map(|f| (option_label(f.short, f.long.as_deref(), None), f.description.clone())),
    );

    let width = positional_rows
        .iter()
        .map(|(label, _)| label.len())
        .chain(option_rows.iter().map(|(label, _)| label.len()))
        .chain(usage.subcommands.iter().map(|s| s.name.len()))
        .max()
        .unwrap_or(4);

    if !positional_rows.is_empty() {
        out.push_str("\nArguments:\n");
        for (label, p) in &positional_rows {
            let desc = format!("{}{}{}", p.description, kind_hint(p.kind), default_hint(p.default.as_ref()));
            out.push_str(&format!("  {label:<width$}  {desc}\n"));
            if !p.choices.is_empty() {
                push_entries(&mut out, &p.choices, width + 4);
            }
        }
    }

    if !usage.subcommands.is_empty() {
        out.push_str("\nCommands:\n");
        for sub in &usage.subcommands {
            let desc = sub.description.as_deref().unwrap_or("");
            out.push_str(&format!("  {:<width$}  {desc}\n", sub.name));
        }
    }

    if !option_rows.is_empty() {
        out.push_str("\nOptions:\n");
        for (label, desc) in &option_rows {
            out.push_str(&format!("  {label:<width$}  {desc}\n"));
        }
        for o in usage.options.iter().filter(|o| !o.choices.is_empty()) {
            let label = option_label(o.short, o.long.as_deref(), None);
            out.push_str(&format!("\n  {} values:\n", label.trim_start()));
            push_entries(&mut out, &o.choices, 4);
        }
    }

    if !usage.notes.is_empty() {
        out.push_str("\nNotes:\n");
        for note in &usage.notes {
            out.push_str(&format!("  {note}\n"));
        }
    }

    out
}

fn usage_to_markdown(usage: &Usage) -> String {
    let mut out = format!("# {}\n\n", usage.command_path.join(" "));

    if let Some(desc) = &usage.description {
        out.push_str(&format!("{desc}\n\n"));
    }
    out.push_str(&format!("```\n{}\n```\n\n", usage.synopsis()));

    if !usage.positionals.is_empty() {
        out.push_str("## Arguments\n\n");
        out.push_str("| Argument | Type | Required | Description |\n");
        out.push_str("|----------|------|----------|-------------|\n");
        for p in &usage.positionals {
            let required = if p.optional { "no" } else { "yes" };
            out.push_str(&format!(
                "| `{}` | {} | {required} | {} |\n",
                positional_label(p),
                p.kind,
                p.description
            ));
        }
        out.push('\n');
    }

    if !usage.subcommands.is_empty() {
        out.push_str("## Commands\n\n");
        out.push_str("| Command | Description |\n");
        out.push_str("|---------|-------------|\n");
        for sub in &usage.subcommands {
            let desc = sub.description.as_deref().unwrap_or("");
            out.push_str(&format!("| `{}` | {desc} |\n", sub.name));
        }
        out.push('\n');
    }

    if !usage.options.is_empty() || !usage.flags.is_empty() {
        out.push_str("## Options\n\n");
        out.push_str("| Option | Description |\n");
        out.push_str("|--------|-------------|\n");
        for o in &usage.options {
            let label = option_label(o.short, o.long.as_deref(), Some(&o.value_name));
            out.push_str(&format!("| `{}` | {} |\n", label.trim_start(), o.description));
        }
        for f in &usage.flags {
            let label = option_label(f.short, f.long.as_deref(), None);
            out.push_str(&format!("| `{}` | {} |\n", label.trim_start(), f.description));
        }
        out.push('\n');
    }

    if !usage.notes.is_empty() {
        out.push_str("## Notes\n\n");
        for note in &usage.notes {
            out.push_str(&format!("- {note}\n"));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Binding;
    use crate::choice::{ChoiceSet, SubcommandSet};
    use crate::schema::SchemaOptions;
    use crate::spec::{FlagSpec, OptionSpec, PositionalSpec};

    fn sample() -> (CommandTree, SchemaId, SchemaId) {
        let mut tree = CommandTree::new();
        let init = tree
            .insert(Schema::new().with_positional(PositionalSpec::new("dir", "target directory").optional()))
            .unwrap();
        let root = tree
            .insert(
                Schema::new()
                    .with_positional(
                        PositionalSpec::new("command", "command to run")
                            .subcommands(SubcommandSet::new().with_subcommand("init", "create a repository", init)),
                    )
                    .with_option(
                        OptionSpec::new(Some('f'), Some("format"), "FMT", "output format")
                            .choices(ChoiceSet::new().with_choice("json", "machine readable").with_choice("text", "plain")),
                    )
                    .with_option(
                        OptionSpec::new(Some('j'), Some("jobs"), "N", "parallel jobs")
                            .kind(ValueKind::UInt32)
                            .bind(Binding::with_default(4u32)),
                    )
                    .with_flag(FlagSpec::help())
                    .with_options(SchemaOptions {
                        ignore_prefix: Some("!".to_string()),
                        description: Some("Repository tool".to_string()),
                        ..SchemaOptions::default()
                    }),
            )
            .unwrap();
        (tree, root, init)
    }

    #[test]
    fn test_text_usage_sections() {
        let (tree, root, _) = sample();
        let text = render_usage(&tree, root, "repo", UsageFormat::Text).unwrap();
        assert!(text.starts_with("Usage: repo [OPTIONS] <command> ...\n"));
        assert!(text.contains("Repository tool"));
        assert!(text.contains("Commands:\n  init"));
        assert!(text.contains("-j, --jobs <N>"));
        assert!(text.contains("(uint32) [default: 4]"));
        assert!(text.contains("machine readable"));
        assert!(text.contains("Arguments starting with '!' are ignored."));
    }

    #[test]
    fn test_nested_path_after_parse() {
        let (mut tree, root, init) = sample();
        assert!(tree.parse(root, ["repo", "init"]).is_success());
        let usage = Usage::from_tree(&tree, init, "repo").unwrap();
        assert_eq!(usage.command_path, vec!["repo", "init"]);
        assert_eq!(usage.synopsis(), "repo init [dir]");
    }

    #[test]
    fn test_hidden_choice_details() {
        let mut tree = CommandTree::new();
        let root = tree
            .insert(Schema::new().with_positional(
                PositionalSpec::new("mode", "").choices(ChoiceSet::new().with_choice("a", "first").with_choice("b", "second").hide_details()),
            ))
            .unwrap();
        let text = render_usage(&tree, root, "p", UsageFormat::Text).unwrap();
        assert!(text.contains("one of: a, b"));
        assert!(!text.contains("first"));
    }

    #[test]
    fn test_structured_formats() {
        let (tree, root, _) = sample();
        let json = render_usage(&tree, root, "repo", UsageFormat::Json).unwrap();
        assert!(json.contains("\"command_path\""));
        let yaml = render_usage(&tree, root, "repo", UsageFormat::Yaml).unwrap();
        assert!(yaml.contains("value_name: FMT"));
        let md = render_usage(&tree, root, "repo", UsageFormat::Markdown).unwrap();
        assert!(md.contains("# repo"));
        assert!(md.contains("| `init` | create a repository |"));
    }

    #[test]
    fn test_rendering_does_not_mutate_bindings() {
        let (tree, root, _) = sample();
        let jobs = tree.schema(root).unwrap().binding("--jobs").unwrap().clone();
        let before = jobs.slot();
        let mut sink = Vec::new();
        write_usage(&mut sink, &tree, root, "repo", UsageFormat::Text).unwrap();
        assert_eq!(jobs.slot(), before);
        assert_eq!(tree.schema(root).unwrap().error(), crate::ErrorKind::Ok);
    }

    #[test]
    fn test_unknown_schema() {
        let tree = CommandTree::new();
        assert!(matches!(
            render_usage(&tree, SchemaId::from_index(0), "p", UsageFormat::Text),
            Err(UsageError::UnknownSchema(_))
        ));
    }
}
