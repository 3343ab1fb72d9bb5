use serde_json::Value;

use crate::domain::error::MalformedDocumentError;
use crate::io::{self, Format, reader};

/// Normalizes a raw description body into the canonical tree.
///
/// The format comes from `content_type` when it names JSON or YAML; otherwise
/// it is sniffed from the body.
pub fn normalize_document(
    body: &[u8],
    content_type: Option<&str>,
) -> Result<Value, MalformedDocumentError> {
    let format = content_type
        .and_then(io::format_from_content_type)
        .unwrap_or_else(|| io::autodetect_document_format(body));
    normalize_as(body, format)
}

/// Normalizes a body whose format is already known.
pub fn normalize_as(body: &[u8], format: Format) -> Result<Value, MalformedDocumentError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(MalformedDocumentError::from_io(
            format,
            io::IoError::EmptyDocument,
        ));
    }
    reader::read_value(body, format).map_err(|error| MalformedDocumentError::from_io(format, error))
}
