//! Line queries: parsing query files and resolving them against attributed lines.
//!
//! A query file groups `path:line,code` entries under the name of the function
//! they belong to. Sections are separated by blank lines:
//!
//! ```text
//! runtime.mallocgcSmallNoscan
//! src/runtime/malloc.go:1298,publicationBarrier
//! src/runtime/malloc.go:1327,c.nextSample -= int64(size)
//!
//! main.benchmarkFunction
//! test/loop/test.go:29,if data[j] > data[j+1] {
//! ```
//!
//! Paths are matched as suffixes of the paths recorded in the profile, so
//! repo-relative paths find lines recorded with absolute build paths.

use crate::analyzer::SourceLine;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur while reading a query file.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("error reading query file: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, QueryError>;

static LOCATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+):(\d+)$").expect("locator pattern compiles"));

/// A single `path:line` lookup with its code comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub filename: String,
    pub line_number: u64,
    pub function_name: String,
    /// Free text copied from the query file; never checked against the source.
    pub code: String,
}

impl Query {
    pub fn key(&self) -> QueryKey {
        QueryKey {
            filename: self.filename.clone(),
            line_number: self.line_number,
        }
    }
}

/// Result key of a query: the path and line exactly as written in the query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    pub filename: String,
    pub line_number: u64,
}

/// Queries grouped under the function they are expected to belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySection {
    pub function_name: String,
    pub queries: Vec<Query>,
}

impl QuerySection {
    /// Build a section from its function name and its `path:line,code` lines.
    ///
    /// Malformed lines are skipped with a warning.
    pub fn new(function_name: &str, lines: &[&str]) -> Self {
        let queries = lines
            .iter()
            .filter_map(|line| parse_query_line(function_name, line))
            .collect();

        Self {
            function_name: function_name.to_string(),
            queries,
        }
    }
}

fn parse_query_line(function_name: &str, line: &str) -> Option<Query> {
    let Some((locator, code)) = line.split_once(',') else {
        warn!("invalid query format: {}", line);
        return None;
    };

    let locator = locator.trim_end();
    let Some(captures) = LOCATOR.captures(locator) else {
        warn!("invalid file:line format: {}", locator);
        return None;
    };
    let Ok(line_number) = captures[2].parse::<u64>() else {
        warn!("line number out of range: {}", locator);
        return None;
    };

    Some(Query {
        filename: captures[1].to_string(),
        line_number,
        function_name: function_name.to_string(),
        code: code.to_string(),
    })
}

/// Parse query text into sections.
pub fn parse_queries(text: &str) -> Vec<QuerySection> {
    let mut blocks: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
        .iter()
        .filter_map(|block| block.split_first())
        .map(|(function_name, lines)| QuerySection::new(function_name, lines))
        .collect()
}

/// Read and parse a query file.
pub fn parse_query_file(path: &Path) -> Result<Vec<QuerySection>> {
    let text = fs::read_to_string(path)?;
    Ok(parse_queries(&text))
}

// ============================================================================
// Matching
// ============================================================================

/// Which pass resolved a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// File suffix, line and function name all matched.
    Exact,
    /// Only file suffix and line matched; other functions were substituted.
    Substituted,
    /// Nothing matched.
    Unresolved,
}

/// The attributed lines a query resolved to.
#[derive(Debug, Clone)]
pub struct QueryMatch<'a> {
    pub kind: MatchKind,
    pub lines: Vec<&'a SourceLine>,
}

impl QueryMatch<'_> {
    pub fn flat(&self) -> Duration {
        self.lines
            .iter()
            .fold(Duration::ZERO, |acc, l| acc.saturating_add(l.flat))
    }

    pub fn cum(&self) -> Duration {
        self.lines
            .iter()
            .fold(Duration::ZERO, |acc, l| acc.saturating_add(l.cum))
    }
}

fn at_location(line: &SourceLine, query: &Query) -> bool {
    line.filename.ends_with(&query.filename) && line.line_number == query.line_number
}

/// Lines matching the query's file suffix, line number and function name.
pub fn exact_matches<'a>(all_lines: &'a [SourceLine], query: &Query) -> Vec<&'a SourceLine> {
    all_lines
        .iter()
        .filter(|l| at_location(l, query) && l.function_name == query.function_name)
        .collect()
}

/// Lines matching the query's file suffix and line number, any function.
pub fn fallback_matches<'a>(all_lines: &'a [SourceLine], query: &Query) -> Vec<&'a SourceLine> {
    all_lines
        .iter()
        .filter(|l| at_location(l, query))
        .collect()
}

/// Resolve one query, relaxing the function name only if nothing matched
/// exactly. Each substituted line is reported with a warning.
pub fn find_matching_lines<'a>(all_lines: &'a [SourceLine], query: &Query) -> QueryMatch<'a> {
    let exact = exact_matches(all_lines, query);
    if !exact.is_empty() {
        return QueryMatch {
            kind: MatchKind::Exact,
            lines: exact,
        };
    }

    let fallback = fallback_matches(all_lines, query);
    if fallback.is_empty() {
        return QueryMatch {
            kind: MatchKind::Unresolved,
            lines: fallback,
        };
    }

    for line in &fallback {
        warn!(
            "using function {} instead of {} at {}:{}",
            line.function_name, query.function_name, query.filename, query.line_number
        );
    }
    QueryMatch {
        kind: MatchKind::Substituted,
        lines: fallback,
    }
}

/// Summed cost per query, keyed by the query's own path and line.
pub type MatchedResults = HashMap<QueryKey, SourceLine>;

/// Resolve every query of every section.
///
/// Queries that match nothing still get an entry with zero cost. A path and
/// line queried in several sections keeps the result of the last one.
pub fn match_queries(sections: &[QuerySection], all_lines: &[SourceLine]) -> MatchedResults {
    let mut results = MatchedResults::new();

    for section in sections {
        for query in &section.queries {
            let matched = find_matching_lines(all_lines, query);
            if matched.kind == MatchKind::Unresolved {
                warn!(
                    "no profile data for {}:{} in {}",
                    query.filename, query.line_number, query.function_name
                );
            } else {
                debug!(
                    "{}:{} resolved to {} line(s) ({:?})",
                    query.filename,
                    query.line_number,
                    matched.lines.len(),
                    matched.kind
                );
            }

            let mut result =
                SourceLine::new(&query.filename, query.line_number, &query.function_name);
            result.flat = matched.flat();
            result.cum = matched.cum();
            results.insert(query.key(), result);
        }
    }

    results
}
