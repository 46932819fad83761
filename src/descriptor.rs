//! Table-creation descriptor for the destination data store.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result as IngestResult};
use crate::kind::NativeValueKind;

/// One column of the destination table: name plus mapped SQL type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: String,
}

/// The create-table descriptor handed to the destination store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaDescriptor {
    pub columns: Vec<ColumnSpec>,
    pub if_not_exists: bool,
    pub dest_table: String,
}

/// Destination naming configuration.
#[derive(Debug, Clone)]
pub struct DestinationConfig {
    /// Fully-qualified prefix, e.g. `public.hces2024_`.
    pub table_prefix: String,
    /// Identifier of this survey file, appended to the prefix.
    pub file_identifier: String,
    pub if_not_exists: bool,
}

/// Build a descriptor from aligned column names and kinds.
///
/// The two sequences must be the same length; a divergence is a
/// [`IngestError::ShapeMismatch`], which signals a programming defect rather
/// than bad input.
pub fn build(
    names: &[String],
    kinds: &[NativeValueKind],
    config: &DestinationConfig,
) -> IngestResult<SchemaDescriptor> {
    if names.len() != kinds.len() {
        return Err(IngestError::ShapeMismatch {
            names: names.len(),
            types: kinds.len(),
        });
    }
    let columns = names
        .iter()
        .zip(kinds)
        .map(|(name, kind)| ColumnSpec {
            name: name.clone(),
            sql_type: kind.sql_type().to_string(),
        })
        .collect();
    Ok(SchemaDescriptor {
        columns,
        if_not_exists: config.if_not_exists,
        dest_table: format!("{}{}", config.table_prefix, config.file_identifier),
    })
}

impl SchemaDescriptor {
    pub fn save(&self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("Creating descriptor file {path:?}"))?;
        serde_json::to_writer_pretty(file, self).context("Writing descriptor JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Opening descriptor file {path:?}"))?;
        let reader = BufReader::new(file);
        let descriptor = serde_json::from_reader(reader).context("Parsing descriptor JSON")?;
        Ok(descriptor)
    }
}
