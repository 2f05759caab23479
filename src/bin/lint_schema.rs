//! Lint schema files: report schema-definition errors before anything is decoded.
//!
//! Usage:
//!   lint_schema [OPTIONS] [FILE.schema ...]
//!   lint_schema < file.schema
//!
//! Options:
//!   --human, -H  Human-readable output
//!
//! If no files are given, reads from stdin. Exit code 1 if any file fails to
//! parse or resolve, or has error-level findings.

use clap::{ArgAction, Parser};
use schemadec::lint::{lint, LintMessage, Severity};
use schemadec::{parse, ResolvedSchema};
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lint_schema", about = "Check record schemas for definition errors")]
struct Cli {
    /// Schema files; stdin when empty.
    files: Vec<PathBuf>,
    /// Human-readable output.
    #[arg(short = 'H', long = "human", action = ArgAction::SetTrue)]
    human: bool,
}

fn print_message(path: &str, m: &LintMessage, human: bool) {
    let severity_str = match m.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };
    if human {
        println!("  {} {}.{}: {}", path, m.record, m.field, m.message);
        println!("    rule: {}", m.rule.id());
    } else {
        println!(
            "{}:{}.{}: {}: {} [{}]",
            path,
            m.record,
            m.field,
            severity_str,
            m.message,
            m.rule.id()
        );
    }
}

#[derive(Default)]
struct Totals {
    errors: usize,
    warnings: usize,
    failed: bool,
}

fn lint_source(display_path: &str, src: &str, human: bool, totals: &mut Totals) {
    let schema = match parse(src) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: {}", display_path, e);
            totals.failed = true;
            return;
        }
    };
    debug!(path = display_path, records = schema.records.len(), "parsed");
    let messages = lint(&schema);
    for m in &messages {
        match m.severity {
            Severity::Error => totals.errors += 1,
            Severity::Warning => totals.warnings += 1,
        }
        print_message(display_path, m, human);
    }
    if messages.iter().any(|m| m.severity == Severity::Error) {
        totals.failed = true;
    }
    if let Err(e) = ResolvedSchema::resolve(schema) {
        eprintln!("{}: {}", display_path, e);
        totals.failed = true;
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let mut totals = Totals::default();
    if cli.files.is_empty() {
        let mut src = String::new();
        io::stdin().read_to_string(&mut src)?;
        lint_source("<stdin>", &src, cli.human, &mut totals);
    } else {
        for path in &cli.files {
            let display_path = path.display().to_string();
            match std::fs::read_to_string(path) {
                Ok(src) => lint_source(&display_path, &src, cli.human, &mut totals),
                Err(e) => {
                    eprintln!("{}: {}", display_path, e);
                    totals.failed = true;
                }
            }
        }
    }

    if totals.errors > 0 || totals.warnings > 0 {
        eprintln!("lint: {} error(s), {} warning(s)", totals.errors, totals.warnings);
    }
    if totals.failed {
        std::process::exit(1);
    }
    Ok(())
}
