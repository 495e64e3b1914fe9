//! Attribute a pprof profile to source lines and print the table.
//!
//! # Usage
//!
//! ```bash
//! pprof2csv -i cpu.pprof                  # CSV to stdout
//! pprof2csv -i cpu.pprof -o lines.csv
//! pprof2csv -i cpu.pprof --format ndjson --sample-index 0
//! ```

use clap::{Parser, ValueEnum};
use pprof2csv::analyzer::{AnalyzerConfig, load_profile_data};
use pprof2csv::logging::init_tracing;
use pprof2csv::report::{write_lines_csv, write_lines_ndjson};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// file,line,function,flat,cum
    Csv,
    /// One JSON object per line
    Ndjson,
}

#[derive(Parser, Debug)]
#[command(name = "pprof2csv")]
#[command(about = "Attribute pprof samples to source lines")]
#[command(version)]
struct Args {
    /// Input pprof profile (raw or gzip-compressed)
    #[arg(short, long)]
    input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    format: Format,

    /// Sample value to attribute (defaults to the profile's default, else the last type)
    #[arg(long)]
    sample_index: Option<usize>,

    /// Increase diagnostic output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(args.verbose);

    let config = AnalyzerConfig {
        sample_index: args.sample_index,
    };
    let lines = load_profile_data(&args.input, &config)?;

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                format!("Failed to create output file '{}': {}", path.display(), e)
            })?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    match args.format {
        Format::Csv => write_lines_csv(writer, &lines)?,
        Format::Ndjson => write_lines_ndjson(writer, &lines)?,
    }

    let destination = match &args.output {
        Some(path) => format!("'{}'", path.display()),
        None => "stdout".to_string(),
    };
    eprintln!(
        "Converted '{}' -> {} ({} lines)",
        args.input.display(),
        destination,
        lines.len()
    );

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
