//! heapdb - convert delimited text into heap files and scan them

use anyhow::{bail, Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use heapdb::access::encoder;
use heapdb::access::schema::{Schema, SchemaField};
use heapdb::access::value::Type;
use heapdb::config::{BufferPoolConfig, DEFAULT_MAX_PAGES};
use heapdb::database::Database;
use heapdb::executor::OpIterator;
use log::info;
use std::io::Write;
use std::path::{Path, PathBuf};

/// heapdb - a paged heap-file store
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Maximum number of pages kept in the buffer pool
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_PAGES)]
    max_pages: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pack delimited text rows into a heap file
    Convert {
        /// Delimited text input, one row per line
        input: PathBuf,
        /// Heap file to create
        output: PathBuf,
        /// Field types, e.g. `int,text(10)` or `id:int,name:text(10)`
        #[arg(short, long)]
        schema: String,
        /// Field separator
        #[arg(long, default_value_t = ',')]
        separator: char,
    },
    /// Print every row of a heap file
    Print {
        /// Heap file to scan
        file: PathBuf,
        /// Field types, e.g. `int,text(10)` or `id:int,name:text(10)`
        #[arg(short, long)]
        schema: String,
        /// Alias used to qualify field names
        #[arg(short, long)]
        alias: Option<String>,
        /// Print the qualified field names before the rows
        #[arg(long)]
        header: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match args.command {
        Command::Convert {
            input,
            output,
            schema,
            separator,
        } => {
            let schema = parse_schema(&schema)?;
            let pages = encoder::convert(&input, &output, &schema, separator)
                .with_context(|| format!("Failed to convert {}", input.display()))?;
            println!("Wrote {} pages to {}", pages, output.display());
        }
        Command::Print {
            file,
            schema,
            alias,
            header,
        } => {
            let schema = parse_schema(&schema)?;
            print_file(&file, schema, alias.as_deref(), header, args.max_pages)?;
        }
    }

    Ok(())
}

fn print_file(
    file: &Path,
    schema: Schema,
    alias: Option<&str>,
    header: bool,
    max_pages: usize,
) -> Result<()> {
    if !file.exists() {
        bail!("Heap file does not exist at {}", file.display());
    }

    let db = Database::new(BufferPoolConfig::with_max_pages(max_pages));
    let name = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("table")
        .to_string();
    let table_id = db
        .add_table(file, &name, schema)
        .with_context(|| format!("Failed to open {}", file.display()))?;

    let tid = db.begin();
    let mut scan = db.scan(tid, table_id, alias)?;
    info!("Scanning {} as {} in {}", file.display(), scan.alias(), tid);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if header {
        let names = (0..scan.schema().num_fields())
            .map(|i| -> Result<String> {
                Ok(scan.schema().field_name(i)?.unwrap_or("null").to_string())
            })
            .collect::<Result<Vec<_>>>()?;
        writeln!(out, "{}", names.join("\t"))?;
    }

    scan.open()?;
    let mut rows = 0usize;
    while scan.has_next()? {
        write!(out, "{}", scan.next()?)?;
        rows += 1;
    }
    scan.close();
    db.commit(tid)?;

    info!("Printed {} rows", rows);
    Ok(())
}

/// Parse `int,text(10)` or `id:int,name:text(10)` into a schema
fn parse_schema(text: &str) -> Result<Schema> {
    let fields = text
        .split(',')
        .map(|entry| -> Result<SchemaField> {
            let entry = entry.trim();
            match entry.split_once(':') {
                Some((name, ty)) => Ok(SchemaField::new(ty.parse::<Type>()?, name.trim())),
                None => Ok(SchemaField::unnamed(entry.parse::<Type>()?)),
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Schema::new(fields)?)
}
