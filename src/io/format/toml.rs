use std::io::Read;

use serde_json::Value;

use crate::io::IoError;

pub fn read_toml<R: Read>(mut reader: R) -> Result<Value, IoError> {
    let mut raw = String::new();
    reader.read_to_string(&mut raw)?;
    let value: toml::Value = toml::from_str(&raw)?;
    Ok(serde_json::to_value(value)?)
}
