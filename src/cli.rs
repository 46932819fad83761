use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Ingest SAS transport survey files into CSV, schema, and profile artifacts",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print dataset and variable metadata for a transport file
    Inspect(InspectArgs),
    /// Convert a transport file to a canonical CSV in bounded-memory chunks
    Convert(ConvertArgs),
    /// Run the full pipeline: convert, normalize, and emit schema and profile artifacts
    Ingest(IngestArgs),
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Input transport (.xpt) file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Character encoding of character fields (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Input transport (.xpt) file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output CSV file (defaults to the input path with .csv appended)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Rows per chunk; bounds peak memory, never affects output content
    #[arg(long = "chunk-size", default_value_t = 500_000)]
    pub chunk_size: usize,
    /// Character encoding of character fields (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Input transport (.xpt) file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Directory for every emitted artifact (defaults to the input's directory)
    #[arg(short = 'o', long = "out-dir")]
    pub out_dir: Option<PathBuf>,
    /// Rows per chunk; bounds peak memory, never affects output content
    #[arg(long = "chunk-size", default_value_t = 500_000)]
    pub chunk_size: usize,
    /// Character encoding of character fields (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Survey name recorded in the metadata payload
    #[arg(long = "survey-name")]
    pub survey_name: String,
    /// Survey year recorded in the metadata payload
    #[arg(long = "survey-year")]
    pub survey_year: String,
    /// Survey subset (e.g. Urban) recorded in the metadata payload
    #[arg(long = "survey-subset")]
    pub survey_subset: String,
    /// Fully-qualified destination table prefix (e.g. public.hces2024_)
    #[arg(long = "table-prefix")]
    pub table_prefix: String,
    /// Identifier appended to the table prefix (defaults to the input file stem)
    #[arg(long = "file-identifier")]
    pub file_identifier: Option<String>,
    /// Whether the create-table descriptor is idempotent
    #[arg(long = "if-not-exists", default_value_t = true, action = clap::ArgAction::Set)]
    pub if_not_exists: bool,
}
