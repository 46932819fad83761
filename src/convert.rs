//! Conversion of a transport source into the canonical CSV artifact.
//!
//! Row batches stream from the source reader into [`TabularWriter`], which
//! writes the header exactly once and appends every batch after it. Peak
//! memory is one chunk of rows, independent of file size.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::{debug, info};

use crate::cli::ConvertArgs;
use crate::error::{IngestError, Result as IngestResult};
use crate::io_utils;
use crate::transport::{RowBatch, SourceMetadata, SourceReader};

/// Appends row batches to one CSV artifact, writing the header once.
///
/// The column list of the first batch becomes the baseline; any later batch
/// with a different column set or order is a [`IngestError::SchemaMismatch`].
pub struct TabularWriter<W: Write> {
    writer: csv::Writer<W>,
    baseline: Option<Vec<String>>,
}

impl<W: Write> TabularWriter<W> {
    pub fn new(writer: csv::Writer<W>) -> Self {
        Self {
            writer,
            baseline: None,
        }
    }

    /// Append one batch, emitting the header if this is the first.
    pub fn write_batch(&mut self, batch: &RowBatch) -> IngestResult<()> {
        match &self.baseline {
            None => {
                self.writer.write_record(batch.columns.iter())?;
                self.baseline = Some(batch.columns.clone());
            }
            Some(expected) if *expected != batch.columns => {
                return Err(IngestError::SchemaMismatch {
                    expected: expected.clone(),
                    actual: batch.columns.clone(),
                });
            }
            Some(_) => {}
        }
        for row in &batch.rows {
            self.writer.write_record(row.iter().map(|cell| cell.render()))?;
        }
        Ok(())
    }

    /// Flush and close the artifact.
    ///
    /// If no batch ever arrived (an empty dataset), the header is written
    /// from `fallback_columns` so the artifact still carries the schema.
    pub fn finish(mut self, fallback_columns: &[String]) -> IngestResult<()> {
        if self.baseline.is_none() {
            self.writer.write_record(fallback_columns.iter())?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Summary of one conversion run.
#[derive(Debug)]
pub struct ConvertOutcome {
    pub rows: usize,
    pub batches: usize,
    pub metadata: SourceMetadata,
}

/// Convert `input` into the canonical CSV at `output`.
///
/// On any failure the partially written artifact is removed, so downstream
/// stages never observe a half-converted table.
pub fn run(
    input: &Path,
    output: &Path,
    chunk_size: usize,
    encoding: &'static Encoding,
) -> Result<ConvertOutcome> {
    anyhow::ensure!(chunk_size > 0, "chunk size must be at least 1");

    let mut reader = SourceReader::open(input, encoding)
        .with_context(|| format!("Reading transport file {input:?}"))?;
    let metadata = reader.metadata().clone();

    let writer = TabularWriter::new(io_utils::open_csv_writer_at(
        output,
        io_utils::DEFAULT_DELIMITER,
    )?);

    match copy_batches(&mut reader, writer, chunk_size, &metadata) {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            let _ = fs::remove_file(output);
            Err(err).with_context(|| format!("Converting {input:?}"))
        }
    }
}

fn copy_batches<R: std::io::Read, W: Write>(
    reader: &mut SourceReader<R>,
    mut writer: TabularWriter<W>,
    chunk_size: usize,
    metadata: &SourceMetadata,
) -> Result<ConvertOutcome> {
    let mut rows = 0usize;
    let mut batches = 0usize;
    while let Some(batch) = reader.next_batch(chunk_size)? {
        debug!("Batch {} with {} row(s)", batches + 1, batch.rows.len());
        writer.write_batch(&batch)?;
        rows += batch.rows.len();
        batches += 1;
    }
    writer.finish(&metadata.column_names())?;
    Ok(ConvertOutcome {
        rows,
        batches,
        metadata: metadata.clone(),
    })
}

pub fn execute(args: &ConvertArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let output = resolve_output(&args.input, args.output.as_deref());
    let outcome = run(&args.input, &output, args.chunk_size, encoding)?;
    info!(
        "Converted dataset '{}': {} row(s) in {} batch(es) written to {:?}",
        outcome.metadata.dataset_name, outcome.rows, outcome.batches, output
    );
    Ok(())
}

/// Default output path: the input path with `.csv` appended.
pub fn resolve_output(input: &Path, output: Option<&Path>) -> PathBuf {
    match output {
        Some(path) => path.to_path_buf(),
        None => {
            let mut name = input.as_os_str().to_owned();
            name.push(".csv");
            PathBuf::from(name)
        }
    }
}
