//! Source metadata listing without conversion.

use anyhow::Result;
use log::info;

use crate::cli::InspectArgs;
use crate::transport::SourceReader;
use crate::{io_utils, table};

pub fn execute(args: &InspectArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let reader = SourceReader::open(&args.input, encoding)?;
    let metadata = reader.metadata();

    match &metadata.dataset_label {
        Some(label) => info!(
            "Dataset '{}' ({label}), {} variable(s)",
            metadata.dataset_name,
            metadata.variables.len()
        ),
        None => info!(
            "Dataset '{}', {} variable(s)",
            metadata.dataset_name,
            metadata.variables.len()
        ),
    }

    let headers = ["variable", "type", "length", "label", "format"]
        .map(str::to_string)
        .to_vec();
    let rows = metadata
        .variables
        .iter()
        .map(|v| {
            vec![
                v.name.clone(),
                v.field_type.as_str().to_string(),
                v.length.to_string(),
                v.label.clone().unwrap_or_default(),
                v.format.clone().unwrap_or_default(),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    Ok(())
}
