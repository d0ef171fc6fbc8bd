//! Image processor example.
//!
//! A realistic command line with three subcommands sharing one set of
//! [`SchemaOptions`], a version flag bound to the same slot in every schema,
//! and a help flag that records which command asked for help.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p argwright-demos --example image_processor -- convert photo.png -f JPEG -q 75
//! cargo run -p argwright-demos --example image_processor -- resize photo.png -w 640 -k
//! cargo run -p argwright-demos --example image_processor -- tag a.png b.png :: holiday beach -o
//! cargo run -p argwright-demos --example image_processor -- tag --help
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use argwright_core::{
    Binding, Choice, ChoiceSet, CommandTree, FlagSpec, OptionSpec, PositionalSpec, Schema, SchemaId, SchemaOptions,
    Subcommand, SubcommandSet, UsageFormat, ValueKind, render_usage, subcommand_index,
};

const VERSION: &str = "1.0.0";

struct Convert {
    input: Binding,
    output: Binding,
    format: Binding,
    quality: Binding,
    warnings: Binding,
}

struct Resize {
    input: Binding,
    output: Binding,
    width: Binding,
    height: Binding,
    keep_aspect: Binding,
}

struct Tag {
    images: Binding,
    tags: Binding,
    format: Binding,
    overwrite: Binding,
}

struct App {
    tree: CommandTree,
    root: SchemaId,
    tag_id: SchemaId,
    subcommands: SubcommandSet,
    selected: Binding,
    help: Binding,
    version: Binding,
    convert: Convert,
    resize: Resize,
    tag: Tag,
}

fn options() -> SchemaOptions {
    SchemaOptions {
        ignore_prefix: Some("!".to_string()),
        list_terminator: Some("::".to_string()),
        ..SchemaOptions::default()
    }
}

fn build() -> Result<App, String> {
    let help = Binding::capture();
    let version = Binding::switch();
    let version_flag = || FlagSpec::new(Some('v'), Some("version"), "print the version").exit().bind(version.clone());
    let help_flag = || FlagSpec::help_capture().bind(help.clone());

    let mut tree = CommandTree::new();

    let formats = ChoiceSet::new()
        .with_choice("PNG", "")
        .with_choice("JPEG", "")
        .with_choice("TIFF", "")
        .hide_details();
    let convert = Convert {
        input: Binding::new(),
        output: Binding::with_default("out.png"),
        format: Binding::with_default(Arc::clone(&formats.items()[0])),
        quality: Binding::with_default(90u8),
        warnings: Binding::switch(),
    };
    let convert_id = tree
        .insert(
            Schema::new()
                .with_positional(
                    PositionalSpec::new("input_file", "the file to convert")
                        .kind(ValueKind::File)
                        .bind(convert.input.clone()),
                )
                .with_option(OptionSpec::new(Some('o'), Some("output"), "FILE", "the file to output").bind(convert.output.clone()))
                .with_option(
                    OptionSpec::new(Some('f'), Some("format"), "FORMAT", "the format which to convert to")
                        .choices(formats)
                        .bind(convert.format.clone()),
                )
                .with_option(
                    OptionSpec::new(Some('q'), Some("quality"), "QUALITY", "the quality of the conversion")
                        .kind(ValueKind::UInt8)
                        .bind(convert.quality.clone()),
                )
                .with_flag(FlagSpec::new(Some('w'), Some("warnings"), "print warnings").bind(convert.warnings.clone()))
                .with_flag(version_flag())
                .with_flag(help_flag())
                .with_options(options()),
        )
        .map_err(|err| format!("convert schema: {err}"))?;

    let resize = Resize {
        input: Binding::new(),
        output: Binding::with_default("resized.png"),
        width: Binding::with_default(0u32),
        height: Binding::with_default(0u32),
        keep_aspect: Binding::switch(),
    };
    let resize_id = tree
        .insert(
            Schema::new()
                .with_positional(
                    PositionalSpec::new("input_file", "the file to resize")
                        .kind(ValueKind::File)
                        .bind(resize.input.clone()),
                )
                .with_option(OptionSpec::new(Some('o'), Some("output"), "FILE", "the file to output").bind(resize.output.clone()))
                .with_option(
                    OptionSpec::new(Some('w'), Some("width"), "PIXELS", "the width of the output image")
                        .kind(ValueKind::UInt32)
                        .bind(resize.width.clone()),
                )
                .with_option(
                    OptionSpec::new(Some('H'), Some("height"), "PIXELS", "the height of the output image")
                        .kind(ValueKind::UInt32)
                        .bind(resize.height.clone()),
                )
                .with_flag(
                    FlagSpec::new(Some('k'), Some("keep-aspect"), "keep the aspect ratio of the input image")
                        .bind(resize.keep_aspect.clone()),
                )
                .with_flag(version_flag())
                .with_flag(help_flag())
                .with_options(options()),
        )
        .map_err(|err| format!("resize schema: {err}"))?;

    let tag_formats = ChoiceSet::new()
        .with_choice("JSON", "Save tags in JSON format")
        .with_choice("XML", "Save tags in XML format")
        .with_choice("YAML", "Save tags in YAML format");
    let tag = Tag {
        images: Binding::list(ValueKind::File),
        tags: Binding::list(ValueKind::String),
        format: Binding::with_default(Arc::clone(&tag_formats.items()[0])),
        overwrite: Binding::switch(),
    };
    let tag_id = tree
        .insert(
            Schema::new()
                .with_positional(
                    PositionalSpec::new("images", "list of images to tag")
                        .kind(ValueKind::File)
                        .list()
                        .bind(tag.images.clone()),
                )
                .with_positional(PositionalSpec::new("tags", "tags to apply to all images").list().bind(tag.tags.clone()))
                .with_option(
                    OptionSpec::new(Some('f'), Some("format"), "FORMAT", "format to save tags")
                        .choices(tag_formats)
                        .bind(tag.format.clone()),
                )
                .with_flag(FlagSpec::new(Some('o'), Some("overwrite"), "replace existing tags").bind(tag.overwrite.clone()))
                .with_flag(version_flag())
                .with_flag(help_flag())
                .with_options(options()),
        )
        .map_err(|err| format!("tag schema: {err}"))?;

    let subcommands = SubcommandSet::new()
        .with_subcommand("convert", "convert an image to a different format", convert_id)
        .with_subcommand("resize", "resize an image", resize_id)
        .with_subcommand("tag", "tag multiple images", tag_id);
    let selected = Binding::new();
    let root = tree
        .insert(
            Schema::new()
                .with_positional(
                    PositionalSpec::new("action", "the subcommand to run")
                        .subcommands(subcommands.clone())
                        .bind(selected.clone()),
                )
                .with_flag(version_flag())
                .with_flag(help_flag())
                .with_options(options()),
        )
        .map_err(|err| format!("root schema: {err}"))?;

    Ok(App {
        tree,
        root,
        tag_id,
        subcommands,
        selected,
        help,
        version,
        convert,
        resize,
        tag,
    })
}

fn text(binding: &Binding) -> String {
    binding.get::<String>().unwrap_or_default()
}

fn choice(binding: &Binding) -> String {
    binding
        .get::<Arc<Choice>>()
        .map(|c| c.value.clone())
        .unwrap_or_default()
}

fn print_usage(tree: &CommandTree, id: SchemaId, program: &str) {
    match render_usage(tree, id, program, UsageFormat::Text) {
        Ok(usage) => print!("{usage}"),
        Err(err) => eprintln!("error: {err}"),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let mut app = match build() {
        Ok(app) => app,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let program = std::env::args().next().unwrap_or_else(|| "image_processor".to_string());

    let outcome = app.tree.parse(app.root, std::env::args());
    if let Some(failed) = outcome.failed() {
        print_usage(&app.tree, failed, &program);
        return ExitCode::FAILURE;
    }
    if let Some(asked) = app.help.captured() {
        print_usage(&app.tree, asked, &program);
        return ExitCode::SUCCESS;
    }
    if app.version.is_set() {
        println!("{program} - v.{VERSION}");
        return ExitCode::SUCCESS;
    }

    let selected = app.selected.get::<Arc<Subcommand>>();
    match selected.and_then(|entry| subcommand_index(&app.subcommands, &entry)) {
        Some(0) => {
            let c = &app.convert;
            println!("Convert subcommand selected:");
            println!("  Input file : {}", text(&c.input));
            println!("  Output file: {}", text(&c.output));
            println!("  Format     : {}", choice(&c.format));
            println!("  Quality    : {}", c.quality.get::<u8>().unwrap_or_default());
            println!("  Warnings   : {}", c.warnings.is_set());
        }
        Some(1) => {
            let r = &app.resize;
            println!("Resize subcommand selected:");
            println!("  Input file : {}", text(&r.input));
            println!("  Output file: {}", text(&r.output));
            println!("  Width      : {}", r.width.get::<u32>().unwrap_or_default());
            println!("  Height     : {}", r.height.get::<u32>().unwrap_or_default());
            println!("  Keep Aspect: {}", r.keep_aspect.is_set());
        }
        Some(2) => {
            let t = &app.tag;
            let images = t.images.values::<String>();
            println!("Tagging {} images:", images.len());
            for image in &images {
                println!("  Image: {image}");
            }
            let tags = t.tags.values::<String>();
            println!("Tags to apply ({}):", tags.len());
            for tag in &tags {
                println!("  {tag}");
            }
            println!("Overwrite: {}", t.overwrite.is_set());
            println!("Format: {}", choice(&t.format));
        }
        _ => {
            eprintln!("error: no subcommand selected");
            return ExitCode::FAILURE;
        }
    }

    if let Some(schema) = app.tree.schema_mut(app.tag_id) {
        schema.release_all();
    }
    ExitCode::SUCCESS
}
