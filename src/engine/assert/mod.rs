pub mod predicate;

use serde_json::Value;

use crate::domain::fixture::Expectation;
use crate::domain::report::{ExpectationOutcome, ExpectationReport};
use crate::engine::resolve::resolve;

pub use predicate::{Verdict, evaluate, values_equal};

/// Evaluates every expectation against one snapshot; a failure never stops
/// the remaining expectations.
pub fn evaluate_expectations(document: &Value, expectations: &[Expectation]) -> ExpectationReport {
    ExpectationReport::from_outcomes(
        expectations
            .iter()
            .map(|expectation| evaluate_expectation(document, expectation))
            .collect(),
    )
}

pub fn evaluate_expectation(document: &Value, expectation: &Expectation) -> ExpectationOutcome {
    let path = expectation.path.to_string();
    let predicate = expectation.predicate.name().to_string();
    let expected = expectation.predicate.expected();

    match resolve(document, &expectation.path) {
        Ok(actual) => match evaluate(&actual, &expectation.predicate) {
            Verdict::Pass { observed } => ExpectationOutcome {
                path,
                predicate,
                expected,
                actual: observed,
                passed: true,
                reason: None,
                message: None,
            },
            Verdict::Mismatch(mismatch) => ExpectationOutcome {
                path,
                predicate,
                expected,
                message: Some(mismatch.to_string()),
                reason: Some(mismatch.reason.to_string()),
                actual: mismatch.actual,
                passed: false,
            },
        },
        Err(error) => ExpectationOutcome {
            path,
            predicate,
            expected,
            actual: Value::Null,
            passed: false,
            reason: Some(error.reason().to_string()),
            message: Some(error.to_string()),
        },
    }
}
