//! Column profiling and the survey metadata payload.
//!
//! Numeric columns are summarized as a `[min, max]` range over every
//! non-missing value in the table; all other columns as the set of distinct
//! observed values in first-seen order. Which branch a column takes is
//! decided purely by its inferred kind, never by its name.

use std::collections::HashSet;
use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::kind::NativeValueKind;
use crate::normalize::NormalizedTable;

/// Externally supplied survey identity labels.
///
/// These annotate the payload; nothing here is derived from the data.
#[derive(Debug, Clone)]
pub struct SurveyIdentity {
    pub name: String,
    pub year: String,
    pub subset: String,
}

/// Profile of one column's values.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnProfile {
    /// Numeric range. An all-missing column yields `[null, null]`.
    Range { min: Option<f64>, max: Option<f64> },
    /// Distinct observed values in first-seen order; a missing cell
    /// contributes one literal empty-string entry.
    Values(Vec<String>),
}

impl Serialize for ColumnProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ColumnProfile::Range { min, max } => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(&RangeBound(*min))?;
                seq.serialize_element(&RangeBound(*max))?;
                seq.end()
            }
            ColumnProfile::Values(values) => values.serialize(serializer),
        }
    }
}

/// Range endpoints serialize as plain JSON numbers: integral values as
/// integers, everything else as floats. No fixed-width type metadata leaks
/// into the payload.
struct RangeBound(Option<f64>);

impl Serialize for RangeBound {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0 {
            None => serializer.serialize_none(),
            Some(v) if v.fract() == 0.0 && v.is_finite() && v.abs() < i64::MAX as f64 => {
                serializer.serialize_i64(v as i64)
            }
            Some(v) => serializer.serialize_f64(v),
        }
    }
}

/// The metadata payload handed to the external metadata store.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetadataPayload {
    pub survey_name: String,
    pub survey_year: String,
    pub survey_subset: String,
    pub survey_column_names: Vec<String>,
    pub survey_column_data_types: Vec<String>,
    #[serde(serialize_with = "serialize_data_info")]
    pub data_info: Vec<(String, ColumnProfile)>,
}

/// `data_info` serializes as a JSON object in table column order.
fn serialize_data_info<S: Serializer>(
    entries: &[(String, ColumnProfile)],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (name, profile) in entries {
        map.serialize_entry(name, profile)?;
    }
    map.end()
}

/// Build the payload from the normalized table and the survey identity.
///
/// Pure function of its inputs; every table column gets exactly one
/// `data_info` entry.
pub fn build(table: &NormalizedTable, identity: &SurveyIdentity) -> MetadataPayload {
    let data_info = table
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| (column.name.clone(), profile_column(table, idx, column.kind)))
        .collect();

    MetadataPayload {
        survey_name: identity.name.clone(),
        survey_year: identity.year.clone(),
        survey_subset: identity.subset.clone(),
        survey_column_names: table.column_names(),
        survey_column_data_types: table
            .kinds()
            .iter()
            .map(|kind| kind.sql_type().to_string())
            .collect(),
        data_info,
    }
}

fn profile_column(table: &NormalizedTable, idx: usize, kind: NativeValueKind) -> ColumnProfile {
    if kind.is_numeric() {
        numeric_range(table, idx)
    } else {
        distinct_values(table, idx)
    }
}

fn numeric_range(table: &NormalizedTable, idx: usize) -> ColumnProfile {
    let mut min: Option<f64> = None;
    let mut max: Option<f64> = None;
    for row in &table.rows {
        let raw = row.get(idx).map(String::as_str).unwrap_or("");
        if raw.is_empty() {
            continue;
        }
        let Ok(value) = raw.parse::<f64>() else {
            continue;
        };
        min = Some(match min {
            Some(current) => current.min(value),
            None => value,
        });
        max = Some(match max {
            Some(current) => current.max(value),
            None => value,
        });
    }
    ColumnProfile::Range { min, max }
}

fn distinct_values(table: &NormalizedTable, idx: usize) -> ColumnProfile {
    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for row in &table.rows {
        let raw = row.get(idx).map(String::as_str).unwrap_or("");
        if seen.insert(raw.to_string()) {
            values.push(raw.to_string());
        }
    }
    ColumnProfile::Values(values)
}

impl MetadataPayload {
    /// Write the payload as a single line of JSON, non-ASCII preserved.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating payload file {path:?}"))?;
        serde_json::to_writer(file, self).context("Writing payload JSON")
    }
}
