//! Attribute sampled cost to individual source lines.
//!
//! Every sample's stack is walked leaf first. Each attributable line behind a
//! location receives the sample's full value as cumulative cost; lines behind
//! the leaf location also receive it as flat cost.
//!
//! # Example
//!
//! ```no_run
//! use pprof2csv::analyzer::{load_profile_data, AnalyzerConfig};
//! use std::path::Path;
//!
//! let lines = load_profile_data(Path::new("cpu.pprof"), &AnalyzerConfig::default()).unwrap();
//! for line in lines.iter().take(10) {
//!     println!("{}:{} {:?}", line.filename, line.line_number, line.cum);
//! }
//! ```

use pprof_parse::{ParseError, Profile, Sample};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur while attributing a profile.
#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("failed to read profile '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse profile data: {0}")]
    Parse(#[from] ParseError),

    #[error("profile declares no sample types")]
    NoSampleTypes,

    #[error("sample index {index} out of range: profile has {available} sample types")]
    SampleIndexOutOfRange { index: usize, available: usize },
}

pub type Result<T> = std::result::Result<T, AnalyzeError>;

/// Cost attributed to one source line.
///
/// `flat <= cum` usually holds but is not an invariant of the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub filename: String,
    pub line_number: u64,
    pub function_name: String,
    /// Time spent with this line as the innermost frame.
    pub flat: Duration,
    /// Time spent with this line anywhere on the stack.
    pub cum: Duration,
}

impl SourceLine {
    pub fn new(filename: &str, line_number: u64, function_name: &str) -> Self {
        Self {
            filename: filename.to_string(),
            line_number,
            function_name: function_name.to_string(),
            flat: Duration::ZERO,
            cum: Duration::ZERO,
        }
    }
}

/// Attribution settings.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerConfig {
    /// Which of the sample values to attribute. `None` picks the profile's
    /// declared default sample type, else the last one, which for CPU profiles
    /// is the `cpu/nanoseconds` column.
    pub sample_index: Option<usize>,
}

impl AnalyzerConfig {
    fn value_index(&self, profile: &Profile) -> Result<usize> {
        let available = profile.sample_types.len();
        if available == 0 {
            return Err(AnalyzeError::NoSampleTypes);
        }
        match self.sample_index {
            Some(index) if index < available => Ok(index),
            Some(index) => Err(AnalyzeError::SampleIndexOutOfRange { index, available }),
            None => Ok(profile
                .default_sample_type
                .as_deref()
                .and_then(|kind| profile.sample_type_index(kind))
                .unwrap_or(available - 1)),
        }
    }
}

/// Time units a sample value may be declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
}

impl TimeUnit {
    /// Recognize a pprof unit label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "nanoseconds" | "nanosecond" | "ns" => Some(TimeUnit::Nanoseconds),
            "microseconds" | "microsecond" | "us" | "µs" => Some(TimeUnit::Microseconds),
            "milliseconds" | "millisecond" | "ms" => Some(TimeUnit::Milliseconds),
            "seconds" | "second" | "s" => Some(TimeUnit::Seconds),
            _ => None,
        }
    }

    pub fn to_duration(self, value: u64) -> Duration {
        match self {
            TimeUnit::Nanoseconds => Duration::from_nanos(value),
            TimeUnit::Microseconds => Duration::from_micros(value),
            TimeUnit::Milliseconds => Duration::from_millis(value),
            TimeUnit::Seconds => Duration::from_secs(value),
        }
    }
}

/// Map a declared unit onto a [`TimeUnit`], falling back to nanoseconds.
pub fn resolve_time_unit(label: &str) -> TimeUnit {
    TimeUnit::from_label(label).unwrap_or_else(|| {
        warn!("unknown time unit '{}', treating values as nanoseconds", label);
        TimeUnit::Nanoseconds
    })
}

/// Read a profile file and attribute its samples to source lines.
pub fn load_profile_data(path: &Path, config: &AnalyzerConfig) -> Result<Vec<SourceLine>> {
    let data = fs::read(path).map_err(|source| AnalyzeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    analyze(&data, config)
}

/// Decode raw (optionally gzipped) pprof bytes and attribute them.
pub fn analyze(data: &[u8], config: &AnalyzerConfig) -> Result<Vec<SourceLine>> {
    let profile = Profile::parse_data(data)?;
    attribute(&profile, config)
}

/// Attribute every sample of a decoded profile to source lines, ordered by
/// descending cumulative cost.
pub fn attribute(profile: &Profile, config: &AnalyzerConfig) -> Result<Vec<SourceLine>> {
    let value_index = config.value_index(profile)?;
    let sample_type = &profile.sample_types[value_index];
    let unit = resolve_time_unit(&sample_type.unit);
    debug!(
        "attributing {} samples by {}/{}",
        profile.samples.len(),
        sample_type.kind,
        sample_type.unit
    );

    let mut line_map: HashMap<(&str, u64, &str), SourceLine> = HashMap::new();

    for sample in &profile.samples {
        let Some(value) = sample_cost(sample, value_index, unit) else {
            debug!("skipping sample without a usable value at index {}", value_index);
            continue;
        };

        for (depth, location) in profile.resolve_stack(sample).into_iter().enumerate() {
            let Some(location) = location else {
                debug!("skipping unresolved location {}", sample.location_ids[depth]);
                continue;
            };

            // Inlined entries each receive the full value.
            for entry in &location.lines {
                if !entry.is_attributable() {
                    continue;
                }
                let Ok(line_number) = u64::try_from(entry.line) else {
                    continue;
                };

                let key = (
                    entry.filename.as_str(),
                    line_number,
                    entry.function_name.as_str(),
                );
                let source_line = line_map.entry(key).or_insert_with(|| {
                    SourceLine::new(&entry.filename, line_number, &entry.function_name)
                });
                source_line.cum = source_line.cum.saturating_add(value);
                if depth == 0 {
                    source_line.flat = source_line.flat.saturating_add(value);
                }
            }
        }
    }

    let mut result: Vec<SourceLine> = line_map.into_values().collect();
    result.sort_by(by_cum_descending);
    Ok(result)
}

fn sample_cost(sample: &Sample, value_index: usize, unit: TimeUnit) -> Option<Duration> {
    let raw = *sample.values.get(value_index)?;
    let value = u64::try_from(raw).ok()?;
    Some(unit.to_duration(value))
}

fn by_cum_descending(a: &SourceLine, b: &SourceLine) -> Ordering {
    b.cum
        .cmp(&a.cum)
        .then_with(|| a.filename.cmp(&b.filename))
        .then(a.line_number.cmp(&b.line_number))
        .then_with(|| a.function_name.cmp(&b.function_name))
}
