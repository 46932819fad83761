//! Canonical table normalization and value-kind inference.
//!
//! Reads the canonical CSV in full, lower-cases every column identifier,
//! re-serializes the table as the normalized artifact, and infers each
//! column's native value kind by candidate elimination. The normalized table
//! is the single source for both the schema descriptor and the profile, so
//! the two always see identical column sets and ordering.
//!
//! Memory here is O(table size) by design: kind inference and profiling need
//! global column statistics, unlike the bounded-memory conversion stage.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::NaiveDateTime;
use log::info;

use crate::io_utils;
use crate::kind::NativeValueKind;

/// A column identifier together with its inferred kind.
///
/// Name and kind travel in one record so they cannot drift out of alignment.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: NativeValueKind,
}

/// The fully materialized normalized table.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Vec<String>>,
}

impl NormalizedTable {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn kinds(&self) -> Vec<NativeValueKind> {
        self.columns.iter().map(|c| c.kind).collect()
    }
}

/// Normalize the canonical table at `canonical` into `output`.
pub fn normalize(canonical: &Path, output: &Path) -> Result<NormalizedTable> {
    let mut reader =
        io_utils::open_csv_reader_from_path(canonical, io_utils::DEFAULT_DELIMITER, true)?;
    let headers = reader
        .headers()
        .with_context(|| format!("Reading header of {canonical:?}"))?
        .iter()
        .map(str::to_lowercase)
        .collect::<Vec<_>>();

    // Two source headers differing only in case would collapse into one
    // identifier and produce duplicate keys in every downstream artifact.
    let mut seen = HashSet::new();
    for name in &headers {
        if !seen.insert(name.as_str()) {
            bail!("Duplicate column name '{name}' after lower-casing in {canonical:?}");
        }
    }

    let mut rows = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("Reading row {} of {canonical:?}", row_idx + 2))?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    let mut writer = io_utils::open_csv_writer_at(output, io_utils::DEFAULT_DELIMITER)?;
    writer
        .write_record(headers.iter())
        .context("Writing normalized header")?;
    for row in &rows {
        writer.write_record(row.iter())?;
    }
    writer.flush()?;

    let columns = infer_columns(&headers, &rows);
    info!(
        "Normalized {} column(s), {} row(s) into {:?}",
        columns.len(),
        rows.len(),
        output
    );
    Ok(NormalizedTable { columns, rows })
}

#[derive(Debug, Clone)]
struct KindCandidate {
    possible_boolean: bool,
    possible_integer: bool,
    possible_float: bool,
    possible_timestamp: bool,
    observed: bool,
}

impl KindCandidate {
    fn new() -> Self {
        Self {
            possible_boolean: true,
            possible_integer: true,
            possible_float: true,
            possible_timestamp: true,
            observed: false,
        }
    }

    fn narrow(&mut self, value: &str) {
        self.observed = true;
        if self.possible_boolean
            && !matches!(
                value.to_ascii_lowercase().as_str(),
                "true" | "false" | "t" | "f" | "yes" | "no" | "y" | "n"
            )
        {
            self.possible_boolean = false;
        }
        if self.possible_integer && value.parse::<i64>().is_err() {
            self.possible_integer = false;
        }
        if self.possible_float && value.parse::<f64>().is_err() {
            self.possible_float = false;
        }
        if self.possible_timestamp && parse_timestamp(value).is_none() {
            self.possible_timestamp = false;
        }
    }

    fn decide(&self) -> NativeValueKind {
        // A column with no non-missing values carries no evidence either
        // way; it is treated as a floating-point column whose profile is an
        // all-null range.
        if !self.observed {
            return NativeValueKind::Float64;
        }
        if self.possible_boolean {
            NativeValueKind::Boolean
        } else if self.possible_integer {
            NativeValueKind::Int64
        } else if self.possible_float {
            NativeValueKind::Float64
        } else if self.possible_timestamp {
            NativeValueKind::Timestamp
        } else {
            NativeValueKind::Text
        }
    }
}

fn infer_columns(headers: &[String], rows: &[Vec<String>]) -> Vec<ColumnInfo> {
    let mut candidates = vec![KindCandidate::new(); headers.len()];
    for row in rows {
        for (idx, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            candidates[idx].narrow(value);
        }
    }
    headers
        .iter()
        .zip(&candidates)
        .map(|(name, candidate)| ColumnInfo {
            name: name.clone(),
            kind: candidate.decide(),
        })
        .collect()
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    const TIMESTAMP_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}
