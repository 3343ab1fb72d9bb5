pub mod check;
pub mod fixture;
pub mod normalize;
pub mod resolve;
pub mod run;

use serde::Serialize;
use serde_json::{Value, json};

use crate::domain::report::RunReport;

/// Structured command response that carries exit-code mapping and JSON payload.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommandResponse {
    pub exit_code: i32,
    pub payload: Value,
}

impl CommandResponse {
    pub fn input_usage(message: impl Into<String>) -> Self {
        Self::error(3, "input_usage_error", message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::error(1, "internal_error", message.into())
    }

    fn error(exit_code: i32, error: &str, message: String) -> Self {
        Self {
            exit_code,
            payload: json!({
                "error": error,
                "message": message,
            }),
        }
    }
}

enum CommandError {
    InputUsage(String),
    Internal(String),
}

impl From<CommandError> for CommandResponse {
    fn from(error: CommandError) -> Self {
        match error {
            CommandError::InputUsage(message) => Self::input_usage(message),
            CommandError::Internal(message) => Self::internal(message),
        }
    }
}

fn run_report_response(report: &RunReport) -> CommandResponse {
    let exit_code = if report.matched { 0 } else { 2 };
    match serde_json::to_value(report) {
        Ok(payload) => CommandResponse { exit_code, payload },
        Err(_) => CommandResponse::internal("failed to serialize run report"),
    }
}
