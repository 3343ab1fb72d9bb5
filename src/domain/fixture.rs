use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domain::doc_path::DocPath;

/// Default resource serving the full description document as JSON.
pub const DEFAULT_DOCUMENT_PATH: &str = "/proxy";

static PATH_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}/]+)\}").expect("path parameter pattern is valid"));

/// Versioned set of scenarios for one reference document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Fixture {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub scenarios: Vec<Scenario>,
}

impl Fixture {
    /// Checks the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.version.trim().is_empty() {
            return Err("fixture version must not be empty".to_string());
        }
        let mut names = BTreeSet::new();
        for scenario in &self.scenarios {
            if scenario.name.trim().is_empty() {
                return Err("scenario names must not be empty".to_string());
            }
            if !names.insert(scenario.name.as_str()) {
                return Err(format!("duplicate scenario name `{}`", scenario.name));
            }
            scenario
                .validate()
                .map_err(|reason| format!("scenario `{}`: {reason}", scenario.name))?;
        }
        Ok(())
    }

    pub fn scenario(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|scenario| scenario.name == name)
    }
}

/// Named group of expectations sharing one fetched document snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub request: RequestSpec,
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub setup: Vec<SetupRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<WaitPolicy>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub expectations: Vec<Expectation>,
}

impl Scenario {
    fn validate(&self) -> Result<(), String> {
        validate_status(self.status)?;
        self.request.render_path()?;
        for setup in &self.setup {
            setup.request.render_path()?;
            if let Some(status) = setup.status {
                validate_status(status)?;
            }
        }
        if let Some(wait) = &self.wait {
            if wait.marker.is_some() && wait.interval_ms == 0 {
                return Err("wait.interval_ms must be > 0".to_string());
            }
        }
        Ok(())
    }

    /// Whether the response body must be parsed as a document.
    ///
    /// Scenarios without expectations or a wait marker only check the status,
    /// so their body may be empty or in any format.
    pub fn needs_document(&self) -> bool {
        !self.expectations.is_empty()
            || self
                .wait
                .as_ref()
                .is_some_and(|wait| wait.marker.is_some())
    }
}

fn validate_status(status: u16) -> Result<(), String> {
    if (100..=599).contains(&status) {
        Ok(())
    } else {
        Err(format!("status {status} is not a valid HTTP status code"))
    }
}

fn default_status() -> u16 {
    200
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request issued against the reference application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestSpec {
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default = "default_document_path")]
    pub path: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub path_params: BTreeMap<String, String>,
}

impl Default for RequestSpec {
    fn default() -> Self {
        Self {
            method: HttpMethod::Get,
            path: default_document_path(),
            path_params: BTreeMap::new(),
        }
    }
}

impl RequestSpec {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            path_params: BTreeMap::new(),
        }
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            ..Self::get(path)
        }
    }

    /// Fills `{name}` placeholders from `path_params`.
    pub fn render_path(&self) -> Result<String, String> {
        if !self.path.starts_with('/') {
            return Err(format!("request path `{}` must start with `/`", self.path));
        }
        let mut missing = Vec::new();
        let rendered = PATH_PARAM.replace_all(&self.path, |captures: &Captures<'_>| {
            let name = &captures[1];
            match self.path_params.get(name) {
                Some(value) => value.clone(),
                None => {
                    missing.push(name.to_string());
                    captures[0].to_string()
                }
            }
        });
        if missing.is_empty() {
            Ok(rendered.into_owned())
        } else {
            Err(format!(
                "unresolved path parameter(s) {} in `{}`",
                missing.join(", "),
                self.path
            ))
        }
    }
}

fn default_document_path() -> String {
    DEFAULT_DOCUMENT_PATH.to_string()
}

/// Mutating request issued before the scenario fetches its document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SetupRequest {
    #[serde(flatten)]
    pub request: RequestSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// Bounded wait for the document to reflect an earlier mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WaitPolicy {
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<Expectation>,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_interval_ms() -> u64 {
    250
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// One path + predicate pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawExpectation")]
pub struct Expectation {
    pub path: DocPath,
    #[serde(flatten)]
    pub predicate: Predicate,
}

impl Expectation {
    pub fn new(path: DocPath, predicate: Predicate) -> Self {
        Self { path, predicate }
    }
}

/// Expectation as written in a fixture; exactly one predicate field may be set.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawExpectation {
    path: DocPath,
    #[serde(default, deserialize_with = "present_value")]
    equals: Option<Value>,
    #[serde(default)]
    contains_substring: Option<String>,
    #[serde(default)]
    has_size: Option<usize>,
    #[serde(default)]
    has_key: Option<String>,
    #[serde(default)]
    contains_all: Option<SequenceMatch>,
}

/// Keeps an explicit `null` distinct from an absent field.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl TryFrom<RawExpectation> for Expectation {
    type Error = String;

    fn try_from(raw: RawExpectation) -> Result<Self, Self::Error> {
        let candidates = [
            raw.equals.map(Predicate::Equals),
            raw.contains_substring.map(Predicate::ContainsSubstring),
            raw.has_size.map(Predicate::HasSize),
            raw.has_key.map(Predicate::HasKey),
            raw.contains_all.map(Predicate::ContainsAll),
        ];
        let mut predicates: Vec<Predicate> = candidates.into_iter().flatten().collect();
        match predicates.len() {
            1 => Ok(Self::new(raw.path, predicates.remove(0))),
            0 => Err(format!(
                "expectation for `{}` names no predicate (expected one of {})",
                raw.path,
                PREDICATE_NAMES.join(", ")
            )),
            _ => Err(format!(
                "expectation for `{}` names several predicates ({}); split them into separate expectations",
                raw.path,
                predicates
                    .iter()
                    .map(Predicate::name)
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

const PREDICATE_NAMES: [&str; 5] = [
    "equals",
    "contains_substring",
    "has_size",
    "has_key",
    "contains_all",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Equals(Value),
    ContainsSubstring(String),
    HasSize(usize),
    HasKey(String),
    ContainsAll(SequenceMatch),
}

impl Predicate {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Equals(_) => "equals",
            Self::ContainsSubstring(_) => "contains_substring",
            Self::HasSize(_) => "has_size",
            Self::HasKey(_) => "has_key",
            Self::ContainsAll(_) => "contains_all",
        }
    }

    /// Expected literal as rendered in reports.
    pub fn expected(&self) -> Value {
        match self {
            Self::Equals(value) => value.clone(),
            Self::ContainsSubstring(needle) => json!(needle),
            Self::HasSize(size) => json!(size),
            Self::HasKey(key) => json!(key),
            Self::ContainsAll(sequence) => json!({
                "items": sequence.items,
                "ordered": sequence.ordered,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SequenceMatch {
    pub items: Vec<Value>,
    #[serde(default = "default_ordered")]
    pub ordered: bool,
}

fn default_ordered() -> bool {
    true
}
