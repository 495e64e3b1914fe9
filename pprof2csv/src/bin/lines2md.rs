//! Look up queried source lines in a pprof profile and write a report.
//!
//! For every query section a `<FunctionName>.csv` is written to the output
//! directory, together with a combined `collect.md`.
//!
//! # Usage
//!
//! ```bash
//! lines2md -i cpu.pprof -q queries.txt
//! lines2md -i cpu.pprof -q queries.txt --dir results/
//! ```

use clap::Parser;
use pprof2csv::analyzer::{AnalyzerConfig, load_profile_data};
use pprof2csv::logging::init_tracing;
use pprof2csv::query::{match_queries, parse_query_file};
use pprof2csv::report::{markdown_report, write_collect_md, write_function_csv_file};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "lines2md")]
#[command(about = "Report profile cost for queried source lines")]
#[command(version)]
struct Args {
    /// Input pprof profile (raw or gzip-compressed)
    #[arg(short, long)]
    input: PathBuf,

    /// Query file: a function name followed by `path:line,code` lines, per section
    #[arg(short, long)]
    queries: PathBuf,

    /// Output directory (created if missing)
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

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
    info!("attributed {} source lines", lines.len());

    let sections = parse_query_file(&args.queries).map_err(|e| {
        format!(
            "Failed to read query file '{}': {}",
            args.queries.display(),
            e
        )
    })?;
    let results = match_queries(&sections, &lines);

    fs::create_dir_all(&args.dir).map_err(|e| {
        format!(
            "Failed to create output directory '{}': {}",
            args.dir.display(),
            e
        )
    })?;

    for section in sections.iter().filter(|s| !s.queries.is_empty()) {
        match write_function_csv_file(&args.dir, section, &results) {
            Ok(path) => info!("wrote {}", path.display()),
            Err(e) => error!("failed to write results for {}: {}", section.function_name, e),
        }
    }

    write_collect_md(&args.dir, &markdown_report(&sections, &results))?;

    eprintln!("Successfully generated results in {}", args.dir.display());

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
