//! Decode a JVM class file and print it.
//!
//! Usage:
//!   dump_class [OPTIONS] FILE.class
//!
//! By default prints the full decoded record tree. With `--summary`, prints
//! the class name, version and table sizes instead. `--schema` decodes with
//! another schema file; its root record is chosen with `--record`.

use anyhow::{anyhow, Context};
use clap::{ArgAction, Parser};
use schemadec::classfile::{self, ClassFile};
use schemadec::dump::record_to_dump;
use schemadec::{parse, Decoder, ResolvedSchema};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dump_class", about = "Decode a binary file through a record schema and print it")]
struct Cli {
    /// Input file.
    file: PathBuf,
    /// Print a one-screen summary (class files only).
    #[arg(short = 's', long = "summary", action = ArgAction::SetTrue)]
    summary: bool,
    /// Decode with this schema instead of the built-in class file schema.
    #[arg(long = "schema", value_name = "FILE")]
    schema: Option<PathBuf>,
    /// Root record type to decode.
    #[arg(long = "record", default_value = "ClassFile")]
    record: String,
    /// Log decoder activity (debug level).
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    verbose: bool,
}

fn load_schema(path: Option<&PathBuf>) -> anyhow::Result<ResolvedSchema> {
    match path {
        None => classfile::schema().map_err(|e| anyhow!(e)),
        Some(p) => {
            let src = std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
            let parsed = parse(&src).map_err(|e| anyhow!("{}: {}", p.display(), e))?;
            ResolvedSchema::resolve(parsed).map_err(|e| anyhow!("{}: {}", p.display(), e))
        }
    }
}

fn print_summary(class: &ClassFile) {
    println!("magic:      0x{:08X}", class.magic);
    println!("version:    {}.{}", class.major_version, class.minor_version);
    println!("this:       {}", class.this_class_name().unwrap_or("?"));
    println!("super:      {}", class.super_class_name().unwrap_or("?"));
    println!("constants:  {}", class.constant_pool.len());
    println!("interfaces: {}", class.interfaces.len());
    println!("fields:     {}", class.fields.len());
    println!("methods:    {}", class.methods.len());
    println!("attributes: {}", class.attributes.len());
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let schema = load_schema(cli.schema.as_ref())?;
    let file = File::open(&cli.file).with_context(|| format!("opening {}", cli.file.display()))?;
    info!(file = %cli.file.display(), record = %cli.record, "decoding");

    let mut decoder = Decoder::new(BufReader::new(file), &schema);
    let record = decoder
        .decode_record(&cli.record)
        .with_context(|| format!("decoding {}", cli.file.display()))?;
    info!(consumed = decoder.consumed(), "decoded");

    if cli.summary {
        if cli.schema.is_some() {
            return Err(anyhow!("--summary is only available with the class file schema"));
        }
        let class = ClassFile::from_record(&record)?;
        if !class.has_valid_magic() {
            warn!(magic = class.magic, "not a class file magic number");
        }
        print_summary(&class);
    } else {
        println!("{}", record_to_dump(&record, 0));
    }
    Ok(())
}
