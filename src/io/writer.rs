use std::io::Write;

use serde_json::Value;

use crate::io::format::{json, yaml};
use crate::io::{Format, IoError};

pub fn write_value<W: Write>(writer: W, format: Format, value: &Value) -> Result<(), IoError> {
    match format {
        Format::Json => json::write_json(writer, value),
        Format::Yaml => yaml::write_yaml(writer, value),
        Format::Toml => Err(IoError::UnsupportedFormat {
            format: "toml output".to_string(),
        }),
    }
}
