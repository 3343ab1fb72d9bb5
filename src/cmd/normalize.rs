use std::io::{Read, Write};

use crate::domain::error::NormalizeError;
use crate::engine::normalize::{normalize_as, normalize_document};
use crate::io::{Format, writer};

/// Execute `normalize` from input stream to output stream.
///
/// With no explicit `input_format` the format is sniffed from the body.
pub fn run<R: Read, W: Write>(
    mut input: R,
    output: W,
    input_format: Option<Format>,
    output_format: Format,
) -> Result<(), NormalizeError> {
    let mut body = Vec::new();
    input
        .read_to_end(&mut body)
        .map_err(NormalizeError::ReadInput)?;
    let document = match input_format {
        Some(format) => normalize_as(&body, format)?,
        None => normalize_document(&body, None)?,
    };
    writer::write_value(output, output_format, &document).map_err(|source| {
        NormalizeError::WriteOutput {
            format: output_format,
            source,
        }
    })
}

/// Ordered pipeline-step names used for `--emit-pipeline` diagnostics.
pub fn pipeline_steps() -> Vec<String> {
    vec![
        "read_document".to_string(),
        "normalize_document".to_string(),
        "write_document".to_string(),
    ]
}
