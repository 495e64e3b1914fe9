//! Line-level cost attribution for sampled pprof profiles.
//!
//! A profile's samples are folded into per-source-line `flat` and `cum` time,
//! which can be exported as a table or queried through a small text format
//! naming the `path:line` locations of interest.
//!
//! # Modules
//!
//! - [`analyzer`] - Attribute samples to source lines
//! - [`query`] - Parse query files and resolve them against attributed lines
//! - [`report`] - CSV, NDJSON and Markdown output, plus CSV import
//! - [`duration`] - Go duration notation
//!
//! # Example
//!
//! ```no_run
//! use pprof2csv::analyzer::{load_profile_data, AnalyzerConfig};
//! use pprof2csv::query::{match_queries, parse_query_file};
//! use pprof2csv::report::markdown_report;
//! use std::path::Path;
//!
//! let lines = load_profile_data(Path::new("cpu.pprof"), &AnalyzerConfig::default()).unwrap();
//! let sections = parse_query_file(Path::new("queries.txt")).unwrap();
//! let results = match_queries(&sections, &lines);
//! print!("{}", markdown_report(&sections, &results));
//! ```

pub mod analyzer;
pub mod duration;
pub mod logging;
pub mod query;
pub mod report;

// Re-export pprof_parse for convenience
pub use pprof_parse;

pub use analyzer::{AnalyzerConfig, SourceLine};
pub use query::{MatchKind, MatchedResults, Query, QueryKey, QuerySection};
