//! Custom log handling example.
//!
//! Routes diagnostics through a closure sink, silences them with
//! `min_log_level`, and reacts to the recorded [`ErrorKind`] after a failed
//! parse instead.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p argwright-demos --example log_handling -- 2 40
//! cargo run -p argwright-demos --example log_handling -- 2 forty
//! cargo run -p argwright-demos --example log_handling -- 2
//! ```

use std::process::ExitCode;

use argwright_core::{
    Binding, CommandTree, ErrorKind, FlagSpec, LogLevel, PositionalSpec, Schema, SchemaOptions, UsageFormat,
    ValueKind, render_usage,
};

fn log_handler(level: LogLevel, message: &str) {
    match level {
        LogLevel::Info => println!("INFO: {message}"),
        LogLevel::Warning => eprintln!("WARNING: {message}"),
        LogLevel::Error => eprintln!("ERROR: {message}"),
        LogLevel::ConfigWarning => eprintln!("CONFIG WARNING: {message}"),
        LogLevel::ConfigError => eprintln!("CONFIG ERROR: {message}"),
        LogLevel::NoLogs => {}
    }
}

fn main() -> ExitCode {
    let lhs = Binding::with_default(0i32);
    let rhs = Binding::with_default(0i32);
    let help = Binding::switch();

    let mut tree = CommandTree::new();
    let root = match tree.insert(
        Schema::new()
            .with_positional(PositionalSpec::new("lhs", "left-hand side (integer)").kind(ValueKind::Int32).bind(lhs.clone()))
            .with_positional(PositionalSpec::new("rhs", "right-hand side (integer)").kind(ValueKind::Int32).bind(rhs.clone()))
            .with_flag(FlagSpec::help().bind(help.clone()))
            .with_log_sink(log_handler)
            .with_options(SchemaOptions {
                min_log_level: LogLevel::NoLogs,
                description: Some("Add two numbers with enhanced logging".to_string()),
                ..SchemaOptions::default()
            }),
    ) {
        Ok(root) => root,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let program = std::env::args().next().unwrap_or_else(|| "log_handling".to_string());

    let outcome = tree.parse(root, std::env::args());
    if let Some(failed) = outcome.failed() {
        let Some(schema) = tree.schema_mut(failed) else {
            return ExitCode::FAILURE;
        };
        // Re-enable logging for our own messages.
        schema.options.min_log_level = LogLevel::Info;
        match schema.error() {
            ErrorKind::InvalidValue => {
                schema.log(LogLevel::Info, format_args!("invalid number detected, using defaults (lhs=0, rhs=0)"));
                lhs.set(0i32);
                rhs.set(0i32);
            }
            ErrorKind::TooFewArguments => {
                schema.log(LogLevel::Error, format_args!("two numbers are required"));
                if let Ok(usage) = render_usage(&tree, failed, &program, UsageFormat::Text) {
                    print!("{usage}");
                }
                return ExitCode::FAILURE;
            }
            other => {
                schema.log(LogLevel::Error, format_args!("{other}"));
                return ExitCode::FAILURE;
            }
        }
    }
    if help.is_set() {
        if let Ok(usage) = render_usage(&tree, root, &program, UsageFormat::Text) {
            print!("{usage}");
        }
        return ExitCode::SUCCESS;
    }

    let (a, b) = (lhs.get::<i32>().unwrap_or_default(), rhs.get::<i32>().unwrap_or_default());
    println!("{a} + {b} = {}", i64::from(a) + i64::from(b));
    ExitCode::SUCCESS
}
