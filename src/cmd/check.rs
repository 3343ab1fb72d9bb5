use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use serde_json::Value;

use crate::cmd::fixture::load_fixture;
use crate::cmd::{CommandError, CommandResponse, run_report_response};
use crate::domain::report::RunReport;
use crate::engine::normalize::{normalize_as, normalize_document};
use crate::engine::runner::{RunOptions, check_fixture};
use crate::io::Format;

/// Input arguments for offline fixture evaluation.
#[derive(Debug, Clone)]
pub struct CheckCommandArgs {
    pub fixture: PathBuf,
    pub input: Option<PathBuf>,
    pub from: Option<Format>,
    pub scenarios: Vec<String>,
}

/// Evaluates every selected scenario against a local document.
///
/// Reads stdin when `input` is absent; the format is sniffed unless given.
pub fn run_with_stdin<R: Read>(args: &CheckCommandArgs, stdin: R) -> CommandResponse {
    match execute(args, stdin) {
        Ok(report) => run_report_response(&report),
        Err(error) => error.into(),
    }
}

fn execute<R: Read>(args: &CheckCommandArgs, stdin: R) -> Result<RunReport, CommandError> {
    let fixture =
        load_fixture(&args.fixture).map_err(|error| CommandError::InputUsage(error.to_string()))?;
    for name in &args.scenarios {
        if fixture.scenario(name).is_none() {
            return Err(CommandError::InputUsage(format!(
                "unknown scenario `{name}` in fixture `{}`",
                args.fixture.display()
            )));
        }
    }

    let document = load_document(args, stdin)?;
    let options = RunOptions {
        scenarios: args.scenarios.clone(),
        ..RunOptions::default()
    };
    Ok(check_fixture(&document, &fixture, &options))
}

fn load_document<R: Read>(args: &CheckCommandArgs, stdin: R) -> Result<Value, CommandError> {
    let body = match &args.input {
        Some(path) => read_all(File::open(path).map_err(|error| {
            CommandError::InputUsage(format!(
                "failed to open input file `{}`: {error}",
                path.display()
            ))
        })?),
        None => read_all(stdin),
    }?;
    let from = args.from.or_else(|| {
        args.input
            .as_deref()
            .and_then(|path| crate::io::resolve_input_format(None, Some(path)).ok())
    });
    match from {
        Some(format) => normalize_as(&body, format),
        None => normalize_document(&body, None),
    }
    .map_err(|error| CommandError::InputUsage(error.to_string()))
}

fn read_all<R: Read>(mut reader: R) -> Result<Vec<u8>, CommandError> {
    let mut body = Vec::new();
    reader
        .read_to_end(&mut body)
        .map_err(|error| CommandError::InputUsage(format!("failed to read input: {error}")))?;
    Ok(body)
}

/// Ordered pipeline-step names used for `--emit-pipeline` diagnostics.
pub fn pipeline_steps() -> Vec<String> {
    vec![
        "load_fixture".to_string(),
        "read_document".to_string(),
        "normalize_document".to_string(),
        "evaluate_scenarios".to_string(),
        "write_run_report".to_string(),
    ]
}
