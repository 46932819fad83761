//! Chunked reader for SAS Transport (XPT) V5 survey files.
//!
//! An XPT file is a sequence of 80-byte records: a library header block,
//! a member header block describing the dataset and its variables (one
//! 140-byte NAMESTR entry per variable), an OBS header, and then fixed-width
//! observation rows packed back to back and space-padded to the final
//! 80-byte boundary.
//!
//! The reader parses the header region eagerly into [`SourceMetadata`] and
//! then streams observations through [`SourceReader::next_batch`], holding at
//! most one chunk of decoded rows in memory. Numeric fields are 8-byte IBM
//! hexadecimal floats; character fields are fixed-width byte runs decoded
//! with a configurable encoding.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use encoding_rs::Encoding;

use crate::error::{IngestError, Result};
use crate::io_utils;

/// Transport record length in bytes.
pub const RECORD_LEN: usize = 80;

/// Standard NAMESTR entry length. VAX/VMS files use 136.
const NAMESTR_LEN_STANDARD: usize = 140;
const NAMESTR_LEN_VAX: usize = 136;

const LIBRARY_HEADER_PREFIX: &[u8] = b"HEADER RECORD*******LIBRARY HEADER RECORD!!!!!!!";
const MEMBER_HEADER_PREFIX: &[u8] = b"HEADER RECORD*******MEMBER  HEADER RECORD!!!!!!!";
const DSCRPTR_HEADER_PREFIX: &[u8] = b"HEADER RECORD*******DSCRPTR HEADER RECORD!!!!!!!";
const NAMESTR_HEADER_PREFIX: &[u8] = b"HEADER RECORD*******NAMESTR HEADER RECORD!!!!!!!";
const OBS_HEADER_PREFIX: &[u8] = b"HEADER RECORD*******OBS     HEADER RECORD!!!!!!!";

/// Variable storage type in the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Numeric,
    Character,
}

impl FieldType {
    fn from_ntype(ntype: i16) -> Option<Self> {
        match ntype {
            1 => Some(FieldType::Numeric),
            2 => Some(FieldType::Character),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Numeric => "numeric",
            FieldType::Character => "character",
        }
    }
}

/// One variable definition parsed from a NAMESTR entry.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub label: Option<String>,
    pub field_type: FieldType,
    /// Field width in bytes within one observation row.
    pub length: usize,
    /// SAS display format name, if any.
    pub format: Option<String>,
}

/// File-level metadata parsed from the header region.
#[derive(Debug, Clone)]
pub struct SourceMetadata {
    pub dataset_name: String,
    pub dataset_label: Option<String>,
    pub variables: Vec<Variable>,
}

impl SourceMetadata {
    /// Column names in observation order.
    pub fn column_names(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.name.clone()).collect()
    }

    fn row_len(&self) -> usize {
        self.variables.iter().map(|v| v.length).sum()
    }
}

/// A single decoded scalar cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Render the cell for the canonical CSV artifact.
    ///
    /// Missing cells render empty; integral numbers render without a
    /// fractional part so downstream inference can recover integer columns.
    pub fn render(&self) -> String {
        match self {
            Cell::Missing => String::new(),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < i64::MAX as f64 {
                    (*n as i64).to_string()
                } else {
                    n.to_string()
                }
            }
            Cell::Text(s) => s.clone(),
        }
    }
}

/// An ordered group of rows sharing one column set.
///
/// Produced by [`SourceReader::next_batch`] and consumed exactly once by the
/// tabular writer; never retained after being written.
#[derive(Debug, Clone)]
pub struct RowBatch {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Streaming reader over the observation section of a transport file.
pub struct SourceReader<R: Read> {
    reader: BufReader<R>,
    metadata: SourceMetadata,
    encoding: &'static Encoding,
    row_len: usize,
    /// All-space rows seen but not yet classified as data or padding.
    pending_blanks: usize,
    /// Blank rows confirmed as data, still to be emitted.
    emit_blanks: usize,
    /// A decoded-pending raw row held back while blanks drain ahead of it.
    carry: Option<Vec<u8>>,
    done: bool,
}

impl SourceReader<File> {
    /// Open a transport file and parse its header region.
    pub fn open(path: &Path, encoding: &'static Encoding) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            IngestError::source_read(format!("cannot open {}: {e}", path.display()))
        })?;
        Self::new(file, encoding)
    }
}

impl<R: Read> SourceReader<R> {
    /// Wrap an arbitrary byte source and parse its header region.
    pub fn new(source: R, encoding: &'static Encoding) -> Result<Self> {
        let mut reader = BufReader::new(source);
        let metadata = parse_header_region(&mut reader, encoding)?;
        let row_len = metadata.row_len();
        if row_len == 0 {
            return Err(IngestError::source_read("observation length is zero"));
        }
        Ok(Self {
            reader,
            metadata,
            encoding,
            row_len,
            pending_blanks: 0,
            emit_blanks: 0,
            carry: None,
            done: false,
        })
    }

    /// File-level metadata parsed from the header region.
    pub fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    /// Read the next batch of at most `chunk_size` rows.
    ///
    /// Returns `None` once the observation stream is exhausted. Successive
    /// batches cover every row exactly once, in file order.
    pub fn next_batch(&mut self, chunk_size: usize) -> Result<Option<RowBatch>> {
        debug_assert!(chunk_size > 0);
        let mut rows = Vec::new();
        while rows.len() < chunk_size {
            match self.next_row()? {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(RowBatch {
            columns: self.metadata.column_names(),
            rows,
        }))
    }

    fn next_row(&mut self) -> Result<Option<Vec<Cell>>> {
        loop {
            if self.emit_blanks > 0 {
                self.emit_blanks -= 1;
                return Ok(Some(self.blank_row()));
            }
            if let Some(raw) = self.carry.take() {
                return Ok(Some(self.decode_row(&raw)));
            }
            if self.done {
                return Ok(None);
            }
            match self.read_raw_row()? {
                None => {
                    // Any buffered all-space rows were trailing padding.
                    self.pending_blanks = 0;
                    self.done = true;
                    return Ok(None);
                }
                Some(raw) => {
                    if raw.iter().all(|&b| b == b' ') {
                        self.pending_blanks += 1;
                        continue;
                    }
                    // Real data follows, so the buffered blanks were rows.
                    self.emit_blanks = self.pending_blanks;
                    self.pending_blanks = 0;
                    if self.emit_blanks > 0 {
                        self.carry = Some(raw);
                        continue;
                    }
                    return Ok(Some(self.decode_row(&raw)));
                }
            }
        }
    }

    /// Read one raw observation row, or `None` at end of data.
    ///
    /// A short tail is tolerated only if it is entirely spaces (the final
    /// 80-byte record padding); anything else is corrupt.
    fn read_raw_row(&mut self) -> Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; self.row_len];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self
                .reader
                .read(&mut buf[filled..])
                .map_err(|e| IngestError::source_read(format!("read failed: {e}")))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        if filled < buf.len() {
            if buf[..filled].iter().all(|&b| b == b' ') {
                return Ok(None);
            }
            return Err(IngestError::source_read(
                "trailing bytes after the last observation",
            ));
        }
        Ok(Some(buf))
    }

    fn decode_row(&self, raw: &[u8]) -> Vec<Cell> {
        let mut cells = Vec::with_capacity(self.metadata.variables.len());
        let mut pos = 0usize;
        for variable in &self.metadata.variables {
            let slice = &raw[pos..pos + variable.length];
            let cell = match variable.field_type {
                FieldType::Numeric => decode_numeric(slice),
                FieldType::Character => Cell::Text(decode_character(slice, self.encoding)),
            };
            cells.push(cell);
            pos += variable.length;
        }
        cells
    }

    fn blank_row(&self) -> Vec<Cell> {
        self.metadata
            .variables
            .iter()
            .map(|v| match v.field_type {
                FieldType::Numeric => Cell::Missing,
                FieldType::Character => Cell::Text(String::new()),
            })
            .collect()
    }
}

/// Walk the 80-byte header records up to and including the OBS header.
fn parse_header_region<R: Read>(
    reader: &mut BufReader<R>,
    encoding: &'static Encoding,
) -> Result<SourceMetadata> {
    let record = read_record(reader, "LIBRARY header")?;
    expect_prefix(&record, LIBRARY_HEADER_PREFIX, "LIBRARY header")?;

    // Library info records: SAS version/OS and modified datetime. Unused.
    read_record(reader, "library info")?;
    read_record(reader, "library info")?;

    let record = read_record(reader, "MEMBER header")?;
    expect_prefix(&record, MEMBER_HEADER_PREFIX, "MEMBER header")?;
    let namestr_len = parse_record_digits(&record, 74, 4, "NAMESTR length")?;
    if namestr_len != NAMESTR_LEN_STANDARD && namestr_len != NAMESTR_LEN_VAX {
        return Err(IngestError::source_read(format!(
            "unsupported NAMESTR length {namestr_len}"
        )));
    }

    let record = read_record(reader, "DSCRPTR header")?;
    expect_prefix(&record, DSCRPTR_HEADER_PREFIX, "DSCRPTR header")?;

    let record = read_record(reader, "member data record")?;
    let dataset_name = read_trimmed(&record, 8, 8, encoding);
    if dataset_name.is_empty() {
        return Err(IngestError::source_read("empty dataset name"));
    }

    let record = read_record(reader, "member info record")?;
    let dataset_label = match read_trimmed(&record, 32, 40, encoding) {
        label if label.is_empty() => None,
        label => Some(label),
    };

    let record = read_record(reader, "NAMESTR header")?;
    expect_prefix(&record, NAMESTR_HEADER_PREFIX, "NAMESTR header")?;
    let var_count = parse_record_digits(&record, 54, 4, "variable count")?;
    if var_count == 0 {
        return Err(IngestError::source_read("variable count is zero"));
    }

    let namestr_total = var_count * namestr_len;
    let mut namestr_data = vec![0u8; namestr_total];
    reader
        .read_exact(&mut namestr_data)
        .map_err(|_| IngestError::source_read("truncated NAMESTR section"))?;

    let mut variables = Vec::with_capacity(var_count);
    for index in 0..var_count {
        let entry = &namestr_data[index * namestr_len..(index + 1) * namestr_len];
        variables.push(parse_namestr(entry, index, encoding)?);
    }

    // NAMESTR data is padded out to the next record boundary.
    let padding = namestr_total.next_multiple_of(RECORD_LEN) - namestr_total;
    if padding > 0 {
        let mut skip = vec![0u8; padding];
        reader
            .read_exact(&mut skip)
            .map_err(|_| IngestError::source_read("truncated NAMESTR padding"))?;
    }

    let record = read_record(reader, "OBS header")?;
    expect_prefix(&record, OBS_HEADER_PREFIX, "OBS header")?;

    Ok(SourceMetadata {
        dataset_name,
        dataset_label,
        variables,
    })
}

/// Parse one 140-byte NAMESTR entry into a [`Variable`].
fn parse_namestr(entry: &[u8], index: usize, encoding: &'static Encoding) -> Result<Variable> {
    let ntype = read_i16(entry, 0);
    let field_type = FieldType::from_ntype(ntype).ok_or_else(|| {
        IngestError::source_read(format!("variable {index}: invalid type code {ntype}"))
    })?;

    let length = read_i16(entry, 4);
    if length <= 0 {
        return Err(IngestError::source_read(format!(
            "variable {index}: non-positive field length {length}"
        )));
    }

    let name = read_trimmed(entry, 8, 8, encoding);
    if name.is_empty() {
        return Err(IngestError::source_read(format!(
            "variable {index}: empty name"
        )));
    }

    let label = match read_trimmed(entry, 16, 40, encoding) {
        label if label.is_empty() => None,
        label => Some(label),
    };
    let format = match read_trimmed(entry, 56, 8, encoding) {
        format if format.is_empty() => None,
        format => Some(format),
    };

    Ok(Variable {
        name,
        label,
        field_type,
        length: length as usize,
        format,
    })
}

fn read_record<R: Read>(reader: &mut BufReader<R>, what: &str) -> Result<[u8; RECORD_LEN]> {
    let mut record = [0u8; RECORD_LEN];
    reader
        .read_exact(&mut record)
        .map_err(|_| IngestError::source_read(format!("missing or truncated {what}")))?;
    Ok(record)
}

fn expect_prefix(record: &[u8], prefix: &[u8], what: &str) -> Result<()> {
    if !record.starts_with(prefix) {
        return Err(IngestError::source_read(format!("expected {what}")));
    }
    Ok(())
}

/// Parse an ASCII digit field inside a header record.
fn parse_record_digits(record: &[u8], offset: usize, len: usize, what: &str) -> Result<usize> {
    let text = String::from_utf8_lossy(&record[offset..offset + len]);
    text.trim()
        .parse::<usize>()
        .map_err(|_| IngestError::source_read(format!("unparseable {what}: '{}'", text.trim())))
}

fn read_i16(data: &[u8], offset: usize) -> i16 {
    i16::from_be_bytes([data[offset], data[offset + 1]])
}

fn read_trimmed(data: &[u8], offset: usize, len: usize, encoding: &'static Encoding) -> String {
    let slice = &data[offset..offset + len];
    io_utils::decode_bytes_lossy(slice, encoding)
        .trim_end()
        .to_string()
}

fn decode_character(bytes: &[u8], encoding: &'static Encoding) -> String {
    io_utils::decode_bytes_lossy(bytes, encoding)
        .trim_end()
        .to_string()
}

/// Decode an IBM hexadecimal float field, honoring SAS missing codes.
fn decode_numeric(bytes: &[u8]) -> Cell {
    if bytes.is_empty() {
        return Cell::Missing;
    }
    if is_missing(bytes) {
        return Cell::Missing;
    }
    // Space-filled numeric fields only occur in blank padding rows that
    // turned out to be data; treat them as missing as well.
    if bytes.iter().all(|&b| b == b' ') {
        return Cell::Missing;
    }
    let mut buf = [0u8; 8];
    let len = bytes.len().min(8);
    buf[..len].copy_from_slice(&bytes[..len]);
    Cell::Number(ibm_to_ieee(buf))
}

/// SAS missing codes: `.` (0x2E), `._` (0x5F), `.A`-`.Z` in the first byte,
/// remaining bytes zero.
fn is_missing(bytes: &[u8]) -> bool {
    let tag = bytes[0];
    let tagged = tag == 0x2E || tag == 0x5F || tag.is_ascii_uppercase();
    tagged && bytes[1..].iter().all(|&b| b == 0)
}

/// Convert an 8-byte IBM System/360 hexadecimal float to IEEE 754 binary64.
///
/// Layout: sign bit, 7-bit excess-64 base-16 exponent, 56-bit fraction with
/// the radix point on the left.
pub fn ibm_to_ieee(bytes: [u8; 8]) -> f64 {
    let sign = if bytes[0] & 0x80 != 0 { -1.0 } else { 1.0 };
    let exponent = (bytes[0] & 0x7F) as i32 - 64;
    let mut fraction = 0u64;
    for &b in &bytes[1..] {
        fraction = (fraction << 8) | b as u64;
    }
    if fraction == 0 {
        return 0.0;
    }
    sign * (fraction as f64 / (1u64 << 56) as f64) * 16f64.powi(exponent)
}
