#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes raw bytes into a file under the workspace and returns the path.
    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }
}

const RECORD_LEN: usize = 80;
const NAMESTR_LEN: usize = 140;

#[derive(Debug, Clone)]
enum FixtureColumn {
    Numeric(String),
    Character(String, usize),
}

/// A cell handed to [`XptBuilder::row`].
#[derive(Debug, Clone)]
pub enum CellSpec {
    Number(f64),
    Missing,
    Text(String),
}

pub fn num(value: f64) -> CellSpec {
    CellSpec::Number(value)
}

pub fn missing() -> CellSpec {
    CellSpec::Missing
}

pub fn text(value: &str) -> CellSpec {
    CellSpec::Text(value.to_string())
}

/// Builds SAS Transport V5 files for test fixtures.
///
/// Emits the full record sequence the reader expects: library headers,
/// member headers, NAMESTR entries, OBS header, and fixed-width
/// observations space-padded to the final 80-byte record boundary.
pub struct XptBuilder {
    dataset: String,
    columns: Vec<FixtureColumn>,
    rows: Vec<Vec<CellSpec>>,
}

impl XptBuilder {
    pub fn new(dataset: &str) -> Self {
        Self {
            dataset: dataset.to_string(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn numeric(mut self, name: &str) -> Self {
        self.columns.push(FixtureColumn::Numeric(name.to_string()));
        self
    }

    pub fn character(mut self, name: &str, length: usize) -> Self {
        self.columns
            .push(FixtureColumn::Character(name.to_string(), length));
        self
    }

    pub fn row(mut self, cells: Vec<CellSpec>) -> Self {
        assert_eq!(cells.len(), self.columns.len(), "row width");
        self.rows.push(cells);
        self
    }

    pub fn write_to(&self, workspace: &TestWorkspace, name: &str) -> PathBuf {
        workspace.write_bytes(name, &self.build_bytes())
    }

    pub fn build_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();

        out.extend_from_slice(&fixed_header(
            b"HEADER RECORD*******LIBRARY HEADER RECORD!!!!!!!",
        ));
        out.extend_from_slice(&[b' '; RECORD_LEN]); // library info
        out.extend_from_slice(&[b' '; RECORD_LEN]); // modified datetime

        let mut member = fixed_header(b"HEADER RECORD*******MEMBER  HEADER RECORD!!!!!!!");
        member[64..68].copy_from_slice(b"0160");
        member[74..78].copy_from_slice(b"0140");
        out.extend_from_slice(&member);

        out.extend_from_slice(&fixed_header(
            b"HEADER RECORD*******DSCRPTR HEADER RECORD!!!!!!!",
        ));

        let mut member_data = [b' '; RECORD_LEN];
        write_padded(&mut member_data, 0, "SAS", 8);
        write_padded(&mut member_data, 8, &self.dataset, 8);
        write_padded(&mut member_data, 16, "SASDATA", 8);
        out.extend_from_slice(&member_data);

        out.extend_from_slice(&[b' '; RECORD_LEN]); // member info (label unused)

        let mut namestr_header = fixed_header(b"HEADER RECORD*******NAMESTR HEADER RECORD!!!!!!!");
        let count = format!("{:04}", self.columns.len());
        namestr_header[54..58].copy_from_slice(count.as_bytes());
        out.extend_from_slice(&namestr_header);

        for (index, column) in self.columns.iter().enumerate() {
            out.extend_from_slice(&self.namestr_entry(column, index));
        }
        let namestr_total = self.columns.len() * NAMESTR_LEN;
        let padding = namestr_total.next_multiple_of(RECORD_LEN) - namestr_total;
        out.extend(std::iter::repeat_n(b' ', padding));

        out.extend_from_slice(&fixed_header(
            b"HEADER RECORD*******OBS     HEADER RECORD!!!!!!!",
        ));

        for row in &self.rows {
            for (column, cell) in self.columns.iter().zip(row) {
                self.encode_cell(&mut out, column, cell);
            }
        }
        let obs_total: usize = self.rows.len() * self.row_len();
        let obs_padding = obs_total.next_multiple_of(RECORD_LEN) - obs_total;
        out.extend(std::iter::repeat_n(b' ', obs_padding));

        out
    }

    fn row_len(&self) -> usize {
        self.columns
            .iter()
            .map(|c| match c {
                FixtureColumn::Numeric(_) => 8,
                FixtureColumn::Character(_, len) => *len,
            })
            .sum()
    }

    fn namestr_entry(&self, column: &FixtureColumn, index: usize) -> [u8; NAMESTR_LEN] {
        let mut entry = [0u8; NAMESTR_LEN];
        let (ntype, length, name) = match column {
            FixtureColumn::Numeric(name) => (1i16, 8i16, name.as_str()),
            FixtureColumn::Character(name, len) => (2i16, *len as i16, name.as_str()),
        };
        entry[0..2].copy_from_slice(&ntype.to_be_bytes());
        entry[4..6].copy_from_slice(&length.to_be_bytes());
        entry[6..8].copy_from_slice(&((index as i16) + 1).to_be_bytes());
        let mut name_field = [b' '; 8];
        let bytes = name.as_bytes();
        name_field[..bytes.len().min(8)].copy_from_slice(&bytes[..bytes.len().min(8)]);
        entry[8..16].copy_from_slice(&name_field);
        // label, format, and the rest stay zeroed
        entry
    }

    fn encode_cell(&self, out: &mut Vec<u8>, column: &FixtureColumn, cell: &CellSpec) {
        match (column, cell) {
            (FixtureColumn::Numeric(_), CellSpec::Number(value)) => {
                out.extend_from_slice(&ieee_to_ibm(*value));
            }
            (FixtureColumn::Numeric(_), CellSpec::Missing) => {
                out.extend_from_slice(&[0x2E, 0, 0, 0, 0, 0, 0, 0]);
            }
            (FixtureColumn::Character(_, len), CellSpec::Text(value)) => {
                let mut field = vec![b' '; *len];
                let bytes = value.as_bytes();
                let copy = bytes.len().min(*len);
                field[..copy].copy_from_slice(&bytes[..copy]);
                out.extend_from_slice(&field);
            }
            (FixtureColumn::Character(_, len), CellSpec::Missing) => {
                out.extend(std::iter::repeat_n(b' ', *len));
            }
            (column, cell) => panic!("cell {cell:?} does not fit column {column:?}"),
        }
    }
}

fn fixed_header(prefix: &[u8]) -> [u8; RECORD_LEN] {
    let mut record = [b' '; RECORD_LEN];
    record[..prefix.len()].copy_from_slice(prefix);
    for byte in &mut record[48..78] {
        *byte = b'0';
    }
    record
}

fn write_padded(buf: &mut [u8], offset: usize, value: &str, len: usize) {
    let bytes = value.as_bytes();
    let copy = bytes.len().min(len);
    buf[offset..offset + copy].copy_from_slice(&bytes[..copy]);
}

/// Convert an IEEE 754 binary64 to the IBM hexadecimal float layout.
pub fn ieee_to_ibm(value: f64) -> [u8; 8] {
    if value == 0.0 {
        return [0u8; 8];
    }
    let sign = if value < 0.0 { 0x80u8 } else { 0 };
    let mut magnitude = value.abs();
    let mut exponent = 0i32;
    while magnitude >= 1.0 {
        magnitude /= 16.0;
        exponent += 1;
    }
    while magnitude < 1.0 / 16.0 {
        magnitude *= 16.0;
        exponent -= 1;
    }
    let mut fraction = (magnitude * (1u64 << 56) as f64).round() as u64;
    if fraction >= (1u64 << 56) {
        fraction >>= 4;
        exponent += 1;
    }
    let mut out = [0u8; 8];
    out[0] = sign | ((exponent + 64) as u8);
    out[1..].copy_from_slice(&fraction.to_be_bytes()[1..]);
    out
}
