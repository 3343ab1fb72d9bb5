use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::ScenarioError;

/// Result of evaluating one expectation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpectationOutcome {
    pub path: String,
    pub predicate: String,
    pub expected: Value,
    pub actual: Value,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ExpectationOutcome {
    /// Passing outcome recorded for a scenario whose only check is its status.
    pub fn status_matched(request: &str, status: u16) -> Self {
        Self {
            path: request.to_string(),
            predicate: "status".to_string(),
            expected: Value::from(status),
            actual: Value::from(status),
            passed: true,
            reason: None,
            message: None,
        }
    }
}

/// Every expectation outcome of one snapshot, in fixture order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpectationReport {
    pub matched: bool,
    pub mismatch_count: usize,
    pub outcomes: Vec<ExpectationOutcome>,
}

impl ExpectationReport {
    pub fn from_outcomes(outcomes: Vec<ExpectationOutcome>) -> Self {
        let mismatch_count = outcomes.iter().filter(|outcome| !outcome.passed).count();
        Self {
            matched: mismatch_count == 0,
            mismatch_count,
            outcomes,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExpectationOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.passed)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Passed,
    Failed,
    Skipped,
    Cancelled,
}

/// Scenario-level error recorded instead of expectation outcomes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScenarioFailure {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioReport {
    pub name: String,
    pub status: ScenarioStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ScenarioFailure>,
    pub mismatch_count: usize,
    pub outcomes: Vec<ExpectationOutcome>,
}

impl ScenarioReport {
    pub fn evaluated(name: &str, http_status: Option<u16>, report: ExpectationReport) -> Self {
        Self {
            name: name.to_string(),
            status: if report.matched {
                ScenarioStatus::Passed
            } else {
                ScenarioStatus::Failed
            },
            http_status,
            error: None,
            mismatch_count: report.mismatch_count,
            outcomes: report.outcomes,
        }
    }

    pub fn errored(name: &str, error: &ScenarioError) -> Self {
        Self {
            name: name.to_string(),
            status: ScenarioStatus::Failed,
            http_status: error.http_status(),
            error: Some(ScenarioFailure {
                kind: error.kind().to_string(),
                message: error.to_string(),
            }),
            mismatch_count: 0,
            outcomes: Vec::new(),
        }
    }

    pub fn skipped(name: &str) -> Self {
        Self::without_outcomes(name, ScenarioStatus::Skipped)
    }

    pub fn cancelled(name: &str) -> Self {
        Self::without_outcomes(name, ScenarioStatus::Cancelled)
    }

    fn without_outcomes(name: &str, status: ScenarioStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
            http_status: None,
            error: None,
            mismatch_count: 0,
            outcomes: Vec::new(),
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self.status, ScenarioStatus::Passed | ScenarioStatus::Skipped)
    }
}

/// Fixture-level report printed by `run` and `check`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    pub fixture_version: String,
    pub matched: bool,
    pub scenario_count: usize,
    pub passed_count: usize,
    pub failed_count: usize,
    pub skipped_count: usize,
    pub cancelled_count: usize,
    pub scenarios: Vec<ScenarioReport>,
}

impl RunReport {
    pub fn new(fixture_version: impl Into<String>, scenarios: Vec<ScenarioReport>) -> Self {
        let count = |status: ScenarioStatus| {
            scenarios
                .iter()
                .filter(|scenario| scenario.status == status)
                .count()
        };
        let passed_count = count(ScenarioStatus::Passed);
        let failed_count = count(ScenarioStatus::Failed);
        let skipped_count = count(ScenarioStatus::Skipped);
        let cancelled_count = count(ScenarioStatus::Cancelled);
        Self {
            fixture_version: fixture_version.into(),
            matched: failed_count == 0 && cancelled_count == 0,
            scenario_count: scenarios.len(),
            passed_count,
            failed_count,
            skipped_count,
            cancelled_count,
            scenarios,
        }
    }

    pub fn scenario(&self, name: &str) -> Option<&ScenarioReport> {
        self.scenarios.iter().find(|scenario| scenario.name == name)
    }
}

/// Diagnostics report emitted when `--emit-pipeline` is enabled.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PipelineReport {
    pub command: String,
    pub input: PipelineInput,
    pub steps: Vec<String>,
}

impl PipelineReport {
    pub fn new(command: impl Into<String>, input: PipelineInput, steps: Vec<String>) -> Self {
        Self {
            command: command.into(),
            input,
            steps,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PipelineInput {
    pub sources: Vec<PipelineInputSource>,
}

impl PipelineInput {
    pub fn new(sources: Vec<PipelineInputSource>) -> Self {
        Self { sources }
    }
}

/// Single input source descriptor.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PipelineInputSource {
    pub label: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl PipelineInputSource {
    pub fn stdin(label: impl Into<String>, format: Option<&str>) -> Self {
        Self {
            label: label.into(),
            source: "stdin".to_string(),
            path: None,
            url: None,
            format: format.map(ToOwned::to_owned),
        }
    }

    pub fn path(label: impl Into<String>, path: impl Into<String>, format: Option<&str>) -> Self {
        Self {
            label: label.into(),
            source: "path".to_string(),
            path: Some(path.into()),
            url: None,
            format: format.map(ToOwned::to_owned),
        }
    }

    pub fn http(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            source: "http".to_string(),
            path: None,
            url: Some(url.into()),
            format: None,
        }
    }
}
