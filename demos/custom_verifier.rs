//! Custom verifier example.
//!
//! A list positional whose elements are checked by a closure. The closure
//! logs through the schema's sink and stores the token with
//! [`Verification::duplicate_token`], so turning on `duplicate_strings`
//! needs no change to the verifier.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p argwright-demos --example custom_verifier -- alpha beta gamma
//! cargo run -p argwright-demos --example custom_verifier -- alpha Beta
//! ```

use std::process::ExitCode;

use argwright_core::{
    Binding, CommandTree, FlagSpec, LogLevel, PositionalSpec, Schema, UsageFormat, Verification, render_usage,
};

fn verify_lower_case(ctx: &mut Verification<'_>, token: &str) -> bool {
    if token.chars().next().is_some_and(|c| c.is_lowercase()) {
        let value = ctx.duplicate_token();
        ctx.set(value);
        return true;
    }
    ctx.log(
        LogLevel::Error,
        format_args!("string is not lower case for argument '{}': '{token}'", ctx.arg_name()),
    );
    false
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let values = Binding::list(argwright_core::ValueKind::Custom);
    let help = Binding::switch();
    let mut tree = CommandTree::new();
    let root = match tree.insert(
        Schema::new()
            .with_positional(
                PositionalSpec::new("values", "lower case strings")
                    .custom(verify_lower_case)
                    .list()
                    .bind(values.clone()),
            )
            .with_flag(FlagSpec::help().bind(help.clone())),
    ) {
        Ok(root) => root,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let program = std::env::args().next().unwrap_or_else(|| "custom_verifier".to_string());

    let outcome = tree.parse(root, std::env::args());
    if !outcome.is_success() || help.is_set() {
        if let Ok(usage) = render_usage(&tree, root, &program, UsageFormat::Text) {
            print!("{usage}");
        }
        return if help.is_set() { ExitCode::SUCCESS } else { ExitCode::FAILURE };
    }

    println!("The lower case inputs are:");
    for (i, value) in values.values::<String>().iter().enumerate() {
        println!("{i:3}: '{value}'");
    }
    values.release_list();
    ExitCode::SUCCESS
}
