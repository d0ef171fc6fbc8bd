use std::fs;
use std::sync::{Arc, Mutex};

use argwright_core::*;

fn single_option(kind: ValueKind, binding: Binding) -> (CommandTree, SchemaId) {
    let mut tree = CommandTree::new();
    let root = tree
        .insert(Schema::new().with_option(OptionSpec::new(Some('n'), Some("num"), "N", "a value").kind(kind).bind(binding)))
        .expect("schema is valid");
    (tree, root)
}

fn failure(tree: &CommandTree, outcome: ParseOutcome) -> ErrorKind {
    let id = outcome.failed().expect("parse should fail");
    tree.schema(id).expect("failing schema exists").error()
}

// ---------------------------------------------------------------------------
// Value conversion through the parser
// ---------------------------------------------------------------------------

#[test]
fn integer_literals_bind_exact_values() {
    let cases: [(ValueKind, &str, Value); 7] = [
        (ValueKind::Int8, "-128", Value::Int8(i8::MIN)),
        (ValueKind::UInt8, "255", Value::UInt8(u8::MAX)),
        (ValueKind::Int32, "+2147483647", Value::Int32(i32::MAX)),
        (ValueKind::UInt32, "  4294967295", Value::UInt32(u32::MAX)),
        (ValueKind::Int64, "-9223372036854775808", Value::Int64(i64::MIN)),
        (ValueKind::UInt64, "18446744073709551615", Value::UInt64(u64::MAX)),
        (ValueKind::Int32, "0", Value::Int32(0)),
    ];

    for (kind, token, expected) in cases {
        let binding = Binding::new();
        let (mut tree, root) = single_option(kind, binding.clone());
        let outcome = tree.parse(root, ["prog", "--num", token]);
        assert!(outcome.is_success(), "{kind} rejected {token:?}");
        assert_eq!(binding.value(), Some(expected), "{kind} {token:?}");
        assert_eq!(tree.schema(root).unwrap().error(), ErrorKind::Ok);
    }
}

#[test]
fn unsigned_rejects_negative_and_keeps_default() {
    let binding = Binding::with_default(7u64);
    let (mut tree, root) = single_option(ValueKind::UInt64, binding.clone());
    let outcome = tree.parse(root, ["prog", "--num", " -1"]);
    assert_eq!(failure(&tree, outcome), ErrorKind::InvalidValue);
    assert_eq!(binding.get::<u64>(), Some(7));
}

#[test]
fn empty_token_rejected_for_numbers() {
    let binding = Binding::with_default(3i32);
    let (mut tree, root) = single_option(ValueKind::Int32, binding.clone());
    let outcome = tree.parse(root, ["prog", "--num", ""]);
    assert_eq!(failure(&tree, outcome), ErrorKind::InvalidValue);
    assert_eq!(binding.get::<i32>(), Some(3));
}

#[test]
fn durations_reject_non_finite_magnitudes() {
    for token in ["nan", "inf", "1e400ms"] {
        let binding = Binding::with_default(10u64);
        let (mut tree, root) = single_option(ValueKind::TimeNanoseconds, binding.clone());
        let outcome = tree.parse(root, ["prog", "--num", token]);
        assert_eq!(failure(&tree, outcome), ErrorKind::InvalidValue, "{token}");
        assert_eq!(binding.get::<u64>(), Some(10));
    }
}

#[test]
fn sizes_and_durations_convert_units() {
    let size = Binding::new();
    let timeout = Binding::new();
    let mut tree = CommandTree::new();
    let root = tree
        .insert(
            Schema::new()
                .with_option(OptionSpec::new(None, Some("size"), "BYTES", "").kind(ValueKind::Size).bind(size.clone()))
                .with_option(
                    OptionSpec::new(None, Some("timeout"), "DUR", "")
                        .kind(ValueKind::TimeSeconds)
                        .bind(timeout.clone()),
                ),
        )
        .unwrap();

    assert!(tree.parse(root, ["prog", "--size=1.5KiB", "--timeout", "2h"]).is_success());
    assert_eq!(size.get::<u64>(), Some(1536));
    assert_eq!(timeout.get::<u64>(), Some(7200));
}

#[test]
fn list_with_wrong_item_size_rejects_first_item() {
    let numbers = Binding::list_with_item_size(2);
    let mut tree = CommandTree::new();
    let root = tree
        .insert(Schema::new().with_positional(
            PositionalSpec::new("numbers", "").kind(ValueKind::Int32).list().bind(numbers.clone()),
        ))
        .expect("size mismatch is only a warning");

    let outcome = tree.parse(root, ["prog", "5", "6"]);
    assert_eq!(failure(&tree, outcome), ErrorKind::InvalidValue);
    assert_eq!(numbers.len(), 0);
}

#[test]
fn bool_option_and_flag() {
    let enabled = Binding::new();
    let verbose = Binding::switch();
    let mut tree = CommandTree::new();
    let root = tree
        .insert(
            Schema::new()
                .with_option(OptionSpec::new(None, Some("enabled"), "BOOL", "").kind(ValueKind::Bool).bind(enabled.clone()))
                .with_flag(FlagSpec::new(Some('v'), Some("verbose"), "").bind(verbose.clone())),
        )
        .unwrap();

    assert!(tree.parse(root, ["prog", "--enabled", "yes", "-v"]).is_success());
    assert_eq!(enabled.get::<bool>(), Some(true));
    assert_eq!(verbose.slot(), Slot::Switch(true));
}

// ---------------------------------------------------------------------------
// Positionals, lists and subcommands
// ---------------------------------------------------------------------------

#[test]
fn trailing_list_takes_every_token() {
    let files = Binding::list(ValueKind::String);
    let mut tree = CommandTree::new();
    let root = tree
        .insert(Schema::new().with_positional(PositionalSpec::new("files", "").list().bind(files.clone())))
        .unwrap();

    assert!(tree.parse(root, ["prog", "a.txt", "b.txt", "c.txt"]).is_success());
    let values = files.values::<String>();
    assert_eq!(values.len(), 3);
    assert_eq!(values.first().map(String::as_str), Some("a.txt"));
    assert_eq!(values.last().map(String::as_str), Some("c.txt"));
}

#[test]
fn list_reserves_tokens_for_later_positionals() {
    let sources = Binding::list(ValueKind::String);
    let dest = Binding::new();
    let mut tree = CommandTree::new();
    let root = tree
        .insert(
            Schema::new()
                .with_positional(PositionalSpec::new("src", "").list().bind(sources.clone()))
                .with_positional(PositionalSpec::new("dest", "").bind(dest.clone())),
        )
        .unwrap();

    assert!(tree.parse(root, ["cp", "a", "b", "c", "out/"]).is_success());
    assert_eq!(sources.values::<String>(), vec!["a", "b", "c"]);
    assert_eq!(dest.get::<String>().as_deref(), Some("out/"));
}

#[test]
fn subcommand_binds_matching_entry() {
    let mut tree = CommandTree::new();
    let init = tree.insert(Schema::new()).unwrap();
    let commands = SubcommandSet::new()
        .with_subcommand("clone", "copy a repository", init)
        .with_subcommand("init", "create a repository", init);
    let selected = Binding::new();
    let root = tree
        .insert(Schema::new().with_positional(
            PositionalSpec::new("command", "").subcommands(commands.clone()).bind(selected.clone()),
        ))
        .unwrap();

    assert!(tree.parse(root, ["git", "init"]).is_success());
    let entry = selected.get::<Arc<Subcommand>>().expect("subcommand bound");
    assert_eq!(entry.name, "init");
    assert_eq!(subcommand_index(&commands, &entry), Some(1));
    assert_eq!(tree.command_path(init), vec!["git", "init"]);
}

#[test]
fn unknown_subcommand_fails_at_enclosing_level() {
    let mut tree = CommandTree::new();
    let init = tree.insert(Schema::new()).unwrap();
    let root = tree
        .insert(Schema::new().with_positional(
            PositionalSpec::new("command", "").subcommands(SubcommandSet::new().with_subcommand("init", "", init)),
        ))
        .unwrap();

    let outcome = tree.parse(root, ["git", "push"]);
    assert_eq!(outcome, ParseOutcome::Failed(root));
    assert_eq!(tree.schema(root).unwrap().error(), ErrorKind::InvalidValue);
}

// ---------------------------------------------------------------------------
// Filesystem kinds
// ---------------------------------------------------------------------------

#[test]
fn file_and_dir_kinds_check_the_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("input.txt");
    fs::write(&file, "data").unwrap();
    let dir_str = dir.path().to_str().unwrap().to_string();
    let file_str = file.to_str().unwrap().to_string();

    let mut tree = CommandTree::new();
    let root = tree
        .insert(
            Schema::new()
                .with_positional(PositionalSpec::new("input", "").kind(ValueKind::File))
                .with_positional(PositionalSpec::new("outdir", "").kind(ValueKind::Dir)),
        )
        .unwrap();

    assert!(tree.parse(root, ["prog", file_str.as_str(), dir_str.as_str()]).is_success());

    let outcome = tree.parse(root, ["prog", dir_str.as_str(), dir_str.as_str()]);
    assert_eq!(failure(&tree, outcome), ErrorKind::InvalidValue);

    let outcome = tree.parse(root, ["prog", file_str.as_str(), file_str.as_str()]);
    assert_eq!(failure(&tree, outcome), ErrorKind::InvalidValue);
}

// ---------------------------------------------------------------------------
// Usage, release and diagnostics
// ---------------------------------------------------------------------------

#[test]
fn usage_rendering_leaves_state_untouched() {
    let quality = Binding::with_default(80u8);
    let files = Binding::list(ValueKind::String);
    let mut tree = CommandTree::new();
    let root = tree
        .insert(
            Schema::new()
                .with_option(OptionSpec::new(Some('q'), None, "NUM", "").kind(ValueKind::UInt8).bind(quality.clone()))
                .with_positional(PositionalSpec::new("files", "").list().bind(files.clone())),
        )
        .unwrap();
    assert!(tree.parse(root, ["prog", "a", "b"]).is_success());

    let quality_before = quality.slot();
    let files_before = files.slot();
    for format in [UsageFormat::Text, UsageFormat::Markdown, UsageFormat::Json, UsageFormat::Yaml] {
        render_usage(&tree, root, "prog", format).unwrap();
    }
    assert_eq!(quality.slot(), quality_before);
    assert_eq!(files.slot(), files_before);
    assert_eq!(tree.schema(root).unwrap().error(), ErrorKind::Ok);
    assert_eq!(tree.schema(root).unwrap().name(), Some("prog"));
}

#[test]
fn release_is_idempotent() {
    let files = Binding::list(ValueKind::String);
    let mut tree = CommandTree::new();
    let root = tree
        .insert(
            Schema::new()
                .with_positional(PositionalSpec::new("files", "").list().bind(files.clone()))
                .with_options(SchemaOptions {
                    duplicate_strings: true,
                    ..SchemaOptions::default()
                }),
        )
        .unwrap();
    assert!(tree.parse(root, ["prog", "a", "b"]).is_success());
    assert_eq!(tree.schema(root).unwrap().ledger().len(), 2);

    let schema = tree.schema_mut(root).unwrap();
    schema.release_allocations();
    schema.release_allocations();
    assert!(schema.ledger().is_empty());

    files.release_list();
    files.release_list();
    let list = files.list_snapshot().unwrap();
    assert_eq!(list.count(), 0);
    assert_eq!(list.capacity(), 0);

    schema.release_all();
    assert!(files.is_empty());
}

#[test]
fn diagnostics_reach_the_schema_sink() {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&messages);
    let mut tree = CommandTree::new();
    let root = tree
        .insert(
            Schema::new()
                .with_option(OptionSpec::new(Some('n'), None, "N", "").kind(ValueKind::Int8))
                .with_log_sink(move |level: LogLevel, message: &str| {
                    sink.lock().unwrap().push((level, message.to_string()));
                }),
        )
        .unwrap();

    assert!(!tree.parse(root, ["prog", "-n", "1000"]).is_success());
    let messages = messages.lock().unwrap();
    assert!(messages.iter().any(|(level, msg)| *level == LogLevel::Error && msg.contains("1000")));
}

#[test]
fn min_log_level_filters_messages() {
    let messages = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&messages);
    let mut tree = CommandTree::new();
    let root = tree
        .insert(
            Schema::new()
                .with_option(OptionSpec::new(Some('n'), None, "N", "").kind(ValueKind::Int8))
                .with_options(SchemaOptions {
                    min_log_level: LogLevel::NoLogs,
                    ..SchemaOptions::default()
                })
                .with_log_sink(move |_level: LogLevel, message: &str| {
                    sink.lock().unwrap().push(message.to_string());
                }),
        )
        .unwrap();

    assert!(!tree.parse(root, ["prog", "-n", "x"]).is_success());
    assert!(messages.lock().unwrap().is_empty());
}
