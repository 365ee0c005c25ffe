//! epubcfi command-line tool
//!
//! Parses, normalizes, composes and compares EPUB CFIs.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::cmp::Ordering;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use epubcfi::cfi::{self, Cfi, Step};
use epubcfi::config::{Config, OutputFormat};

#[derive(Parser)]
#[command(name = "epubcfi", version, about = "Inspect and compose EPUB CFIs")]
struct Cli {
    /// Output format (overrides EPUBCFI_OUTPUT)
    #[arg(long, value_enum, global = true)]
    format: Option<OutputFormat>,

    /// Print bare paths without the epubcfi(...) wrapper
    #[arg(long, global = true)]
    bare: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a CFI and show its structure
    #[command(alias = "inspect")]
    Parse { cfi: String },
    /// Print the canonical form of a CFI
    Normalize { cfi: String },
    /// Compare two CFIs in reading order
    Compare { a: String, b: String },
    /// Append one or more CFIs onto a base CFI
    Append {
        base: String,
        #[arg(required = true)]
        tails: Vec<String>,
    },
    /// Print the steps of a CFI from an index onward
    Sub { cfi: String, index: usize },
    /// Build a range from a base path and two full endpoint paths
    Range {
        base: String,
        start: String,
        end: String,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CfiView<'a> {
    cfi: String,
    is_range: bool,
    total_components: usize,
    components: &'a [Step],
    #[serde(skip_serializing_if = "no_steps")]
    range_start: &'a [Step],
    #[serde(skip_serializing_if = "no_steps")]
    range_end: &'a [Step],
}

fn no_steps(steps: &&[Step]) -> bool {
    steps.is_empty()
}

#[derive(Serialize)]
struct ComparisonView {
    order: &'static str,
    equal: bool,
}

fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let loaded = Config::from_env();
    let mut config = loaded.clone().unwrap_or_default();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = loaded {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
    }

    if let Some(format) = cli.format {
        config.output = format;
    }
    if cli.bare {
        config.wrap = false;
    }

    run(cli.command, &config)
}

fn parse_arg(text: &str) -> anyhow::Result<Cfi> {
    cfi::parse(text).with_context(|| format!("failed to parse {text:?}"))
}

fn render(value: &Cfi, config: &Config) -> String {
    if config.wrap {
        value.to_string()
    } else {
        value.path_string()
    }
}

fn print_cfi(value: &Cfi, config: &Config) -> anyhow::Result<()> {
    match config.output {
        OutputFormat::Text => println!("{}", render(value, config)),
        OutputFormat::Json => {
            let view = CfiView {
                cfi: render(value, config),
                is_range: value.is_range(),
                total_components: value.total_components(),
                components: value.components(),
                range_start: value.range_start(),
                range_end: value.range_end(),
            };
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
    }
    Ok(())
}

fn run(command: Command, config: &Config) -> anyhow::Result<()> {
    match command {
        Command::Parse { cfi } => {
            let value = parse_arg(&cfi)?;
            tracing::debug!(
                steps = value.total_components(),
                range = value.is_range(),
                "Parsed CFI"
            );
            if config.output == OutputFormat::Text {
                print_steps(&value, config);
                return Ok(());
            }
            print_cfi(&value, config)
        }
        Command::Normalize { cfi } => print_cfi(&parse_arg(&cfi)?, config),
        Command::Compare { a, b } => {
            let (a, b) = (parse_arg(&a)?, parse_arg(&b)?);
            let order = match cfi::compare(&a, &b) {
                Ordering::Less => "before",
                Ordering::Equal => "same",
                Ordering::Greater => "after",
            };
            let view = ComparisonView {
                order,
                equal: a == b,
            };
            match config.output {
                OutputFormat::Text => println!("{} (equal: {})", view.order, view.equal),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
            }
            Ok(())
        }
        Command::Append { base, tails } => {
            let mut value = parse_arg(&base)?;
            for tail in &tails {
                value
                    .append(&parse_arg(tail)?)
                    .with_context(|| format!("failed to append {tail:?}"))?;
            }
            print_cfi(&value, config)
        }
        Command::Sub { cfi, index } => {
            let value = parse_arg(&cfi)?;
            if index > value.total_components() {
                tracing::warn!(
                    index,
                    total = value.total_components(),
                    "Index past the end, result is empty"
                );
            }
            print_cfi(&value.sub_cfi(index), config)
        }
        Command::Range { base, start, end } => {
            let value = Cfi::from_range(&parse_arg(&base)?, &parse_arg(&start)?, &parse_arg(&end)?)
                .context("failed to build range")?;
            print_cfi(&value, config)
        }
    }
}

/// Human-readable step listing
fn print_steps(value: &Cfi, config: &Config) {
    println!("{}", render(value, config));
    let groups: [(&str, &[Step]); 3] = [
        ("path", value.components()),
        ("start", value.range_start()),
        ("end", value.range_end()),
    ];
    for (label, steps) in groups {
        if steps.is_empty() {
            continue;
        }
        println!("{label}:");
        for (i, step) in steps.iter().enumerate() {
            let mut line = format!("  [{i}] index {}", step.index());
            if let Some(q) = step.qualifier() {
                line.push_str(&format!(" id={q:?}"));
            }
            if !step.offset().is_none() {
                line.push_str(&format!(" offset {}", step.offset()));
            }
            if let Some(text) = step.text_qualifier() {
                line.push_str(&format!(" text={text:?}"));
            }
            if step.is_indirector() {
                line.push_str(" (indirection)");
            }
            println!("{line}");
        }
    }
}
