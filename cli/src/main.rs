use std::fmt;
use std::path::{Path, PathBuf};

use argwright_core::{
    BuiltCommand, CommandDefinition, CommandTree, ParseReport, UsageFormat, render_usage,
};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Exit status for a document that fails to load or validate.
const EXIT_SCHEMA_ERROR: i32 = 2;

/// Report formats for `argwright parse`.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ReportFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "argwright")]
#[command(about = "Validate, document and exercise declarative argument schemas")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load schema documents and report validation findings.
    Validate(ValidateArgs),
    /// Render usage text for a command described by a schema document.
    Usage(UsageArgs),
    /// Parse arguments against a schema document and print the bound values.
    Parse(ParseArgs),
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// YAML or JSON schema documents.
    #[arg(required = true)]
    documents: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct UsageArgs {
    /// YAML or JSON schema document.
    document: PathBuf,
    /// Subcommand path to document, e.g. `--command remote --command add`.
    #[arg(long = "command")]
    command: Vec<String>,
    #[arg(long, value_enum, default_value = "text")]
    format: UsageFormat,
}

#[derive(Debug, Args)]
struct ParseArgs {
    /// YAML or JSON schema document.
    document: PathBuf,
    #[arg(long, value_enum, default_value = "json")]
    format: ReportFormat,
    /// Arguments to parse, after `--`.
    #[arg(last = true)]
    args: Vec<String>,
}

#[derive(Debug)]
enum CliError {
    /// Bad input or I/O failure.
    General(String),
    /// The schema document could not be loaded or is invalid.
    Schema(String),
    /// The parsed arguments were rejected; the report was already printed.
    ParseFailed(String),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::General(_) | Self::ParseFailed(_) => 1,
            Self::Schema(_) => EXIT_SCHEMA_ERROR,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General(msg) | Self::Schema(msg) => f.write_str(msg),
            Self::ParseFailed(msg) => write!(f, "parse failed: {msg}"),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Validate(args) => run_validate(args),
        Command::Usage(args) => run_usage(args),
        Command::Parse(args) => run_parse(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_document(path: &Path) -> Result<(CommandDefinition, CommandTree, BuiltCommand), CliError> {
    let definition = CommandDefinition::load(path)
        .map_err(|err| CliError::Schema(format!("'{}': {err}", path.display())))?;
    let mut tree = CommandTree::new();
    let built = definition
        .build(&mut tree)
        .map_err(|err| CliError::Schema(format!("'{}': {err}", path.display())))?;
    tracing::debug!(document = %path.display(), schemas = tree.len(), "loaded schema document");
    Ok((definition, tree, built))
}

fn run_validate(args: ValidateArgs) -> Result<(), CliError> {
    let mut failures = Vec::new();
    let mut warnings = 0usize;

    for path in &args.documents {
        let (definition, tree, built) = match load_document(path) {
            Ok(loaded) => loaded,
            Err(err) => {
                eprintln!("error: {err}");
                failures.push(path.display().to_string());
                continue;
            }
        };
        for (command, schema) in built.commands() {
            let command = std::iter::once(definition.name.as_str())
                .chain(command.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(" ");
            for finding in tree.validate(schema.id) {
                println!("warning: {}: {command}: {finding}", path.display());
                warnings += 1;
            }
        }
    }

    if !failures.is_empty() {
        return Err(CliError::Schema(format!(
            "{} of {} document(s) failed validation",
            failures.len(),
            args.documents.len()
        )));
    }

    println!(
        "Validated {} document(s) with {warnings} warning(s).",
        args.documents.len()
    );
    Ok(())
}

fn run_usage(args: UsageArgs) -> Result<(), CliError> {
    let (definition, tree, built) = load_document(&args.document)?;

    let path: Vec<&str> = args.command.iter().map(String::as_str).collect();
    let target = built.command(&path).ok_or_else(|| {
        CliError::General(format!(
            "'{}' has no command '{}'",
            args.document.display(),
            path.join(" ")
        ))
    })?;

    // Nested schemas have no parent links until parsed, so the full path is
    // passed as the program name.
    let program = std::iter::once(definition.name.as_str())
        .chain(path.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");

    let rendered = render_usage(&tree, target.id, &program, args.format)
        .map_err(|err| CliError::General(format!("Failed to render usage: {err}")))?;
    print!("{rendered}");
    Ok(())
}

fn run_parse(args: ParseArgs) -> Result<(), CliError> {
    let (definition, mut tree, built) = load_document(&args.document)?;

    let tokens = std::iter::once(definition.name.clone()).chain(args.args.iter().cloned());
    let outcome = tree.parse(built.root, tokens);
    let report = ParseReport::collect(&tree, built.root, outcome);

    let rendered = match args.format {
        ReportFormat::Json => serde_json::to_string_pretty(&report)
            .map_err(|err| CliError::General(format!("Failed to serialize report: {err}")))?,
        ReportFormat::Yaml => serde_yaml::to_string(&report)
            .map_err(|err| CliError::General(format!("Failed to serialize report: {err}")))?,
    };
    println!("{rendered}");

    if report.success {
        Ok(())
    } else {
        Err(CliError::ParseFailed(report.error_description.to_string()))
    }
}
