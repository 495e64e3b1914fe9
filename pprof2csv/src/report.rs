//! Render attributed lines and query results as CSV, NDJSON and Markdown.

use crate::analyzer::SourceLine;
use crate::duration::{format_duration, parse_duration};
use crate::query::{MatchedResults, Query, QuerySection};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while writing or importing reports.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV import error at record {record}: {message}")]
    Import { record: usize, message: String },
}

pub type Result<T> = std::result::Result<T, ReportError>;

/// Name of the combined Markdown report written next to the per-function CSVs.
pub const COLLECT_FILE: &str = "collect.md";

const LINES_HEADER: [&str; 5] = ["file", "line", "function", "flat", "cum"];
const QUERY_HEADER: [&str; 5] = ["file", "line", "code", "flat", "cum"];

// ============================================================================
// CSV
// ============================================================================

/// Quote a CSV field if it contains a separator, quote or line break, or
/// starts with whitespace.
fn escape_field(field: &str) -> String {
    let needs_quotes = field.contains([',', '"', '\r', '\n'])
        || field.starts_with([' ', '\t']);
    if needs_quotes {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn write_record<W: Write>(writer: &mut W, fields: &[&str]) -> Result<()> {
    let row: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
    writeln!(writer, "{}", row.join(","))?;
    Ok(())
}

/// Write the full per-line table: `file,line,function,flat,cum`.
pub fn write_lines_csv<W: Write>(mut writer: W, lines: &[SourceLine]) -> Result<()> {
    write_record(&mut writer, &LINES_HEADER)?;
    for line in lines {
        let line_number = line.line_number.to_string();
        let flat = format_duration(line.flat);
        let cum = format_duration(line.cum);
        write_record(
            &mut writer,
            &[&line.filename, &line_number, &line.function_name, &flat, &cum],
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Write one section's query results: `file,line,code,flat,cum`.
///
/// Queries without an entry in `results` are left out.
pub fn write_function_csv<W: Write>(
    mut writer: W,
    section: &QuerySection,
    results: &MatchedResults,
) -> Result<()> {
    write_record(&mut writer, &QUERY_HEADER)?;
    for query in &section.queries {
        let Some(result) = results.get(&query.key()) else {
            continue;
        };
        let line_number = query.line_number.to_string();
        let flat = format_duration(result.flat);
        let cum = format_duration(result.cum);
        write_record(
            &mut writer,
            &[&query.filename, &line_number, &query.code, &flat, &cum],
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// File name of a section's CSV: the function name with path separators
/// replaced, plus `.csv`.
pub fn function_csv_name(function_name: &str) -> String {
    format!("{}.csv", function_name.replace(['/', '\\'], "_"))
}

/// Write `<dir>/<function>.csv` for a section and return its path.
pub fn write_function_csv_file(
    dir: &Path,
    section: &QuerySection,
    results: &MatchedResults,
) -> Result<PathBuf> {
    let path = dir.join(function_csv_name(&section.function_name));
    let file = File::create(&path)?;
    write_function_csv(BufWriter::new(file), section, results)?;
    Ok(path)
}

// ============================================================================
// NDJSON
// ============================================================================

// Serialization record for one line (field order is the output order).
#[derive(Serialize)]
struct LineRecord<'a> {
    file: &'a str,
    line: u64,
    function: &'a str,
    flat: String,
    cum: String,
    flat_ns: u64,
    cum_ns: u64,
}

fn saturating_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

/// Write the per-line table as one JSON object per line.
pub fn write_lines_ndjson<W: Write>(mut writer: W, lines: &[SourceLine]) -> Result<()> {
    for line in lines {
        let record = LineRecord {
            file: &line.filename,
            line: line.line_number,
            function: &line.function_name,
            flat: format_duration(line.flat),
            cum: format_duration(line.cum),
            flat_ns: saturating_nanos(line.flat),
            cum_ns: saturating_nanos(line.cum),
        };
        writeln!(writer, "{}", serde_json::to_string(&record)?)?;
    }
    writer.flush()?;
    Ok(())
}

// ============================================================================
// Markdown
// ============================================================================

fn markdown_row(query: &Query, result: Option<&SourceLine>) -> String {
    let (flat, cum) = result.map_or((Duration::ZERO, Duration::ZERO), |r| (r.flat, r.cum));
    format!(
        "| {}:{} | {} | {} | {} |\n",
        query.filename,
        query.line_number,
        query.code.replace('|', "\\|"),
        format_duration(flat),
        format_duration(cum)
    )
}

/// Render every non-empty section as a `## <function>` heading followed by a
/// `| line | code | flat | cum |` table.
pub fn markdown_report(sections: &[QuerySection], results: &MatchedResults) -> String {
    let mut content = String::new();

    for section in sections.iter().filter(|s| !s.queries.is_empty()) {
        let mut table = String::from("| line | code | flat | cum |\n|---|---|---|---|\n");
        for query in &section.queries {
            table.push_str(&markdown_row(query, results.get(&query.key())));
        }
        content.push_str(&format!("## {}\n\n{}\n", section.function_name, table));
    }

    content
}

/// Write `<dir>/collect.md` and return its path.
pub fn write_collect_md(dir: &Path, content: &str) -> Result<PathBuf> {
    let path = dir.join(COLLECT_FILE);
    fs::write(&path, content)?;
    Ok(path)
}

// ============================================================================
// Import
// ============================================================================

/// Split CSV text into records, honouring quoted fields with embedded
/// separators, doubled quotes and line breaks.
fn parse_records(text: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(ReportError::Import {
            record: records.len() + 1,
            message: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}

/// Read a per-line table previously written by [`write_lines_csv`].
///
/// Columns are located by header name, so tables with `cum` before `flat`
/// import as well.
pub fn import_lines_csv<R: Read>(mut reader: R) -> Result<Vec<SourceLine>> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let records = parse_records(&text)?;

    let Some((header, rows)) = records.split_first() else {
        return Ok(Vec::new());
    };
    let column = |name: &str| {
        header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ReportError::Import {
                record: 1,
                message: format!("missing column '{}'", name),
            })
    };
    let file_col = column("file")?;
    let line_col = column("line")?;
    let function_col = column("function")?;
    let flat_col = column("flat")?;
    let cum_col = column("cum")?;

    let mut lines = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let record = idx + 2;
        let cell = |col: usize| {
            row.get(col).map(String::as_str).ok_or_else(|| ReportError::Import {
                record,
                message: format!("expected {} fields, found {}", header.len(), row.len()),
            })
        };
        let invalid = |message: String| ReportError::Import { record, message };

        let line_number = cell(line_col)?
            .parse::<u64>()
            .map_err(|e| invalid(format!("invalid line number: {}", e)))?;
        let flat = parse_duration(cell(flat_col)?).map_err(|e| invalid(e.to_string()))?;
        let cum = parse_duration(cell(cum_col)?).map_err(|e| invalid(e.to_string()))?;

        lines.push(SourceLine {
            filename: cell(file_col)?.to_string(),
            line_number,
            function_name: cell(function_col)?.to_string(),
            flat,
            cum,
        });
    }

    Ok(lines)
}
