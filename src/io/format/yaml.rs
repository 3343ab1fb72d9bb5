use std::io::{Read, Write};

use serde_json::{Map, Number, Value};
use serde_yaml::Value as YamlValue;

use crate::io::IoError;

/// Parses YAML and converts it node by node, keeping mapping order and
/// scalar types intact.
pub fn read_yaml<R: Read>(reader: R) -> Result<Value, IoError> {
    let yaml_value: YamlValue = serde_yaml::from_reader(reader)?;
    yaml_to_json(yaml_value)
}

pub fn write_yaml<W: Write>(writer: W, value: &Value) -> Result<(), IoError> {
    serde_yaml::to_writer(writer, value)?;
    Ok(())
}

fn yaml_to_json(value: YamlValue) -> Result<Value, IoError> {
    Ok(match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(flag) => Value::Bool(flag),
        YamlValue::Number(number) => Value::Number(convert_number(&number)?),
        YamlValue::String(text) => Value::String(text),
        YamlValue::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        YamlValue::Mapping(mapping) => {
            let mut object = Map::with_capacity(mapping.len());
            for (key, child) in mapping {
                object.insert(mapping_key(key)?, yaml_to_json(child)?);
            }
            Value::Object(object)
        }
        YamlValue::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn convert_number(number: &serde_yaml::Number) -> Result<Number, IoError> {
    if let Some(unsigned) = number.as_u64() {
        return Ok(Number::from(unsigned));
    }
    if let Some(signed) = number.as_i64() {
        return Ok(Number::from(signed));
    }
    number
        .as_f64()
        .and_then(Number::from_f64)
        .ok_or_else(|| IoError::UnsupportedYamlNumber {
            value: number.to_string(),
        })
}

/// Scalar keys (`200:`, `true:`) become their textual form.
fn mapping_key(key: YamlValue) -> Result<String, IoError> {
    match key {
        YamlValue::String(text) => Ok(text),
        YamlValue::Number(number) => Ok(number.to_string()),
        YamlValue::Bool(flag) => Ok(flag.to_string()),
        YamlValue::Null => Ok("null".to_string()),
        YamlValue::Tagged(tagged) => mapping_key(tagged.value),
        YamlValue::Sequence(_) => Err(IoError::UnsupportedYamlKey { kind: "sequence" }),
        YamlValue::Mapping(_) => Err(IoError::UnsupportedYamlKey { kind: "mapping" }),
    }
}
