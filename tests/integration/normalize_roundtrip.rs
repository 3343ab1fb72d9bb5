use std::io::Cursor;

use oascheck::cmd::normalize;
use oascheck::engine::normalize::{normalize_as, normalize_document};
use oascheck::io::Format;
use serde_json::json;

const YAML: &str = r#"
openapi: 3.0.0
info:
  version: "1.0"
  title: AirlinesRatingApp API
paths:
  /reviews:
    post:
      security:
        - reviewoauth2:
            - write:reviews
      deprecated: false
      x-rate: 2.5
      x-limit: 10
      x-owner: ~
"#;

const JSON: &str = r#"{
  "openapi": "3.0.0",
  "info": {"version": "1.0", "title": "AirlinesRatingApp API"},
  "paths": {"/reviews": {"post": {
    "security": [{"reviewoauth2": ["write:reviews"]}],
    "deprecated": false,
    "x-rate": 2.5,
    "x-limit": 10,
    "x-owner": null
  }}}
}"#;

#[test]
fn yaml_and_json_encodings_yield_identical_trees() {
    let from_yaml = normalize_as(YAML.as_bytes(), Format::Yaml).expect("yaml");
    let from_json = normalize_as(JSON.as_bytes(), Format::Json).expect("json");
    assert_eq!(from_yaml, from_json);

    // Equality on maps ignores order; the serialized form does not.
    assert_eq!(
        serde_json::to_string(&from_yaml).expect("serialize"),
        serde_json::to_string(&from_json).expect("serialize")
    );
}

#[test]
fn scalar_types_survive_normalization() {
    let tree = normalize_document(YAML.as_bytes(), Some("application/yaml")).expect("yaml");
    let post = &tree["paths"]["/reviews"]["post"];
    assert_eq!(tree["info"]["version"], json!("1.0"));
    assert!(post["x-limit"].is_u64());
    assert!(post["x-rate"].is_f64());
    assert_eq!(post["deprecated"], json!(false));
    assert!(post["x-owner"].is_null());
}

#[test]
fn normalize_command_converts_between_encodings() {
    let mut as_json = Vec::new();
    normalize::run(Cursor::new(YAML), &mut as_json, None, Format::Json).expect("to json");

    let mut back_to_yaml = Vec::new();
    normalize::run(
        Cursor::new(as_json.clone()),
        &mut back_to_yaml,
        Some(Format::Json),
        Format::Yaml,
    )
    .expect("to yaml");

    let reparsed = normalize_as(&back_to_yaml, Format::Yaml).expect("reparse");
    let original = normalize_as(&as_json, Format::Json).expect("parse json");
    assert_eq!(
        serde_json::to_string(&reparsed).expect("serialize"),
        serde_json::to_string(&original).expect("serialize")
    );
}
