//! Full ingestion pipeline: convert, normalize, and emit every artifact.
//!
//! Artifact layout for an input `level02.xpt`:
//!
//! - `level02.csv` — canonical table (header once, all chunks appended)
//! - `level02_normalized.csv` — lower-cased headers, inference source
//! - `level02_column_names.txt` / `level02_column_dtypes.txt` — audit lists
//! - `level02_schema.json` — create-table descriptor
//! - `level02_metadata.json` — survey metadata payload
//!
//! Either every artifact is produced or the run aborts; there is no
//! partial-success mode.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use crate::cli::IngestArgs;
use crate::descriptor::{self, DestinationConfig};
use crate::profile::{self, SurveyIdentity};
use crate::{convert, io_utils, normalize};

/// Paths of every artifact one ingest run produces.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub canonical: PathBuf,
    pub normalized: PathBuf,
    pub column_names: PathBuf,
    pub column_dtypes: PathBuf,
    pub schema: PathBuf,
    pub metadata: PathBuf,
}

impl ArtifactPaths {
    /// Derive artifact paths from the output directory and file identifier.
    pub fn new(out_dir: &Path, identifier: &str) -> Self {
        let join = |suffix: &str| out_dir.join(format!("{identifier}{suffix}"));
        Self {
            canonical: join(".csv"),
            normalized: join("_normalized.csv"),
            column_names: join("_column_names.txt"),
            column_dtypes: join("_column_dtypes.txt"),
            schema: join("_schema.json"),
            metadata: join("_metadata.json"),
        }
    }

    /// Every artifact path, in emission order.
    pub fn all(&self) -> [&Path; 6] {
        [
            &self.canonical,
            &self.normalized,
            &self.column_names,
            &self.column_dtypes,
            &self.schema,
            &self.metadata,
        ]
    }
}

pub fn execute(args: &IngestArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let identifier = resolve_identifier(&args.input, args.file_identifier.as_deref())?;
    let out_dir = resolve_out_dir(&args.input, args.out_dir.as_deref());
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Creating output directory {out_dir:?}"))?;
    let paths = ArtifactPaths::new(&out_dir, &identifier);

    // A failure at any stage must not leave earlier artifacts finalized.
    match emit_artifacts(args, &paths, encoding, &identifier) {
        Ok(()) => Ok(()),
        Err(err) => {
            for path in paths.all() {
                let _ = fs::remove_file(path);
            }
            Err(err)
        }
    }
}

fn emit_artifacts(
    args: &IngestArgs,
    paths: &ArtifactPaths,
    encoding: &'static encoding_rs::Encoding,
    identifier: &str,
) -> Result<()> {
    let outcome = convert::run(&args.input, &paths.canonical, args.chunk_size, encoding)?;
    info!(
        "Converted dataset '{}': {} row(s) in {} batch(es)",
        outcome.metadata.dataset_name, outcome.rows, outcome.batches
    );

    let table = normalize::normalize(&paths.canonical, &paths.normalized)?;

    let names = table.column_names();
    let kinds = table.kinds();
    let sql_types = kinds
        .iter()
        .map(|kind| kind.sql_type().to_string())
        .collect::<Vec<_>>();

    fs::write(&paths.column_names, names.join(","))
        .with_context(|| format!("Writing {:?}", paths.column_names))?;
    fs::write(&paths.column_dtypes, sql_types.join(","))
        .with_context(|| format!("Writing {:?}", paths.column_dtypes))?;

    let destination = DestinationConfig {
        table_prefix: args.table_prefix.clone(),
        file_identifier: identifier.to_string(),
        if_not_exists: args.if_not_exists,
    };
    let schema = descriptor::build(&names, &kinds, &destination)?;
    schema.save(&paths.schema)?;
    info!(
        "Schema descriptor for table '{}' ({} column(s)) written to {:?}",
        schema.dest_table,
        schema.columns.len(),
        paths.schema
    );

    let identity = SurveyIdentity {
        name: args.survey_name.clone(),
        year: args.survey_year.clone(),
        subset: args.survey_subset.clone(),
    };
    let payload = profile::build(&table, &identity);
    payload.save(&paths.metadata)?;
    info!(
        "Metadata payload for survey '{}' written to {:?}",
        payload.survey_name, paths.metadata
    );

    Ok(())
}

fn resolve_identifier(input: &Path, override_id: Option<&str>) -> Result<String> {
    if let Some(id) = override_id {
        return Ok(id.to_string());
    }
    input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .context("Input path has no file name")
}

fn resolve_out_dir(input: &Path, out_dir: Option<&Path>) -> PathBuf {
    match out_dir {
        Some(dir) => dir.to_path_buf(),
        None => match input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        },
    }
}
