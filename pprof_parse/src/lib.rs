//! pprof profile decoder.
//!
//! This library decodes pprof profiles (the `profile.proto` format written by
//! Go's `runtime/pprof`, `pprof-rs` and friends) from any `Read`-able source,
//! gzip-compressed or not, and resolves the string-table indirections into
//! plain samples, locations and source lines.
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use pprof_parse::Profile;
//!
//! let file = File::open("cpu.pprof").unwrap();
//! let profile = Profile::parse(file).unwrap();
//!
//! println!("Sample types: {:?}", profile.sample_types);
//! println!("Samples: {}", profile.samples.len());
//! ```

pub mod proto;

use flate2::read::GzDecoder;
use prost::Message;
use std::collections::HashMap;
use std::io::Read;
use thiserror::Error;

/// Errors that can occur while decoding a profile.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("profile input is empty")]
    Empty,
}

/// Result type for profile decoding operations.
pub type Result<T> = std::result::Result<T, ParseError>;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

// ============================================================================
// Resolved profile types
// ============================================================================

/// Description of one of the values carried by every sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleType {
    /// What is measured, e.g. `cpu` or `alloc_space`.
    pub kind: String,
    /// Unit of the measurement, e.g. `nanoseconds` or `bytes`.
    pub unit: String,
}

/// One logical source line behind a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEntry {
    pub filename: String,
    pub function_name: String,
    pub line: i64,
}

impl LineEntry {
    /// Whether the entry names both a file and a function.
    pub fn is_attributable(&self) -> bool {
        !self.filename.is_empty() && !self.function_name.is_empty()
    }
}

/// A program-counter level stack entry.
///
/// More than one line means the entries were inlined into a single address:
/// inlined callees first, the physical caller last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub id: u64,
    pub address: u64,
    pub lines: Vec<LineEntry>,
}

/// A single observation: one value per sample type and a leaf-first stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub values: Vec<i64>,
    pub location_ids: Vec<u64>,
}

/// A decoded profile with all string references resolved.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub sample_types: Vec<SampleType>,
    /// Kind of the sample type flagged as default by the producer, if any.
    pub default_sample_type: Option<String>,
    pub period_type: Option<SampleType>,
    pub period: i64,
    pub duration_nanos: i64,
    pub samples: Vec<Sample>,
    /// Location dictionary, keyed by location ID.
    pub locations: HashMap<u64, Location>,
    pub function_count: usize,
}

impl Profile {
    /// Decode a profile from any `Read`-able source.
    pub fn parse<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::parse_data(&data)
    }

    /// Decode a profile from an in-memory buffer, gunzipping it first if needed.
    pub fn parse_data(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(ParseError::Empty);
        }

        let raw = if data.starts_with(&GZIP_MAGIC) {
            let mut inflated = Vec::new();
            GzDecoder::new(data).read_to_end(&mut inflated)?;
            proto::Profile::decode(inflated.as_slice())?
        } else {
            proto::Profile::decode(data)?
        };

        Ok(Self::from_proto(raw))
    }

    /// Resolve the string table and function references of a raw profile.
    ///
    /// Dangling references resolve to empty strings rather than failing, so a
    /// single damaged record only makes its own lines unattributable.
    pub fn from_proto(raw: proto::Profile) -> Self {
        let strings = &raw.string_table;
        let string_at = |idx: i64| -> String {
            usize::try_from(idx)
                .ok()
                .and_then(|i| strings.get(i))
                .cloned()
                .unwrap_or_default()
        };
        let value_type = |vt: &proto::ValueType| SampleType {
            kind: string_at(vt.r#type),
            unit: string_at(vt.unit),
        };

        let functions: HashMap<u64, &proto::Function> =
            raw.function.iter().map(|f| (f.id, f)).collect();

        let locations = raw
            .location
            .iter()
            .map(|loc| {
                let lines = loc
                    .line
                    .iter()
                    .map(|line| match functions.get(&line.function_id) {
                        Some(func) => LineEntry {
                            filename: string_at(func.filename),
                            function_name: string_at(func.name),
                            line: line.line,
                        },
                        None => LineEntry {
                            filename: String::new(),
                            function_name: String::new(),
                            line: line.line,
                        },
                    })
                    .collect();
                (
                    loc.id,
                    Location {
                        id: loc.id,
                        address: loc.address,
                        lines,
                    },
                )
            })
            .collect();

        let samples = raw
            .sample
            .iter()
            .map(|s| Sample {
                values: s.value.clone(),
                location_ids: s.location_id.clone(),
            })
            .collect();

        let default_sample_type =
            Some(string_at(raw.default_sample_type)).filter(|s| !s.is_empty());

        Profile {
            sample_types: raw.sample_type.iter().map(value_type).collect(),
            default_sample_type,
            period_type: raw.period_type.as_ref().map(value_type),
            period: raw.period,
            duration_nanos: raw.duration_nanos,
            samples,
            locations,
            function_count: raw.function.len(),
        }
    }

    /// Resolve a location ID to its Location record.
    pub fn resolve_location(&self, location_id: u64) -> Option<&Location> {
        self.locations.get(&location_id)
    }

    /// Get the resolved locations of a sample's stack, leaf first.
    pub fn resolve_stack(&self, sample: &Sample) -> Vec<Option<&Location>> {
        sample
            .location_ids
            .iter()
            .map(|&id| self.resolve_location(id))
            .collect()
    }

    /// Index of the sample type whose kind is `kind`, e.g. `"cpu"`.
    pub fn sample_type_index(&self, kind: &str) -> Option<usize> {
        self.sample_types.iter().position(|st| st.kind == kind)
    }
}
