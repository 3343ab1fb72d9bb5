use std::path::PathBuf;

use tracing::info;

use crate::adapters::http::HttpDocumentSource;
use crate::cmd::fixture::load_fixture;
use crate::cmd::{CommandError, CommandResponse, run_report_response};
use crate::config::{ConfigInput, HarnessConfig};
use crate::domain::report::RunReport;
use crate::engine::runner::{RunOptions, run_fixture};

/// Input arguments for a live fixture run.
#[derive(Debug, Clone)]
pub struct RunCommandArgs {
    pub fixture: PathBuf,
    pub config: ConfigInput,
    pub options: RunOptions,
}

/// Runs the fixture against the configured reference application.
pub fn run(args: &RunCommandArgs) -> CommandResponse {
    match execute(args) {
        Ok(report) => run_report_response(&report),
        Err(error) => error.into(),
    }
}

fn execute(args: &RunCommandArgs) -> Result<RunReport, CommandError> {
    let fixture =
        load_fixture(&args.fixture).map_err(|error| CommandError::InputUsage(error.to_string()))?;
    for name in &args.options.scenarios {
        if fixture.scenario(name).is_none() {
            return Err(CommandError::InputUsage(format!(
                "unknown scenario `{name}` in fixture `{}`",
                args.fixture.display()
            )));
        }
    }

    let config = HarnessConfig::resolve(&args.config)
        .map_err(|error| CommandError::InputUsage(error.to_string()))?;
    info!(
        server = %config.base_url,
        authenticated = config.credentials.is_some(),
        fixture_version = %fixture.version,
        "starting fixture run"
    );
    let source =
        HttpDocumentSource::new(config).map_err(|error| CommandError::Internal(error.to_string()))?;

    let report = run_fixture(&source, &fixture, &args.options);
    info!(
        passed = report.passed_count,
        failed = report.failed_count,
        skipped = report.skipped_count,
        cancelled = report.cancelled_count,
        "fixture run finished"
    );
    Ok(report)
}

/// Ordered pipeline-step names used for `--emit-pipeline` diagnostics.
pub fn pipeline_steps() -> Vec<String> {
    vec![
        "load_fixture".to_string(),
        "resolve_config".to_string(),
        "run_scenarios_parallel".to_string(),
        "http_fetch".to_string(),
        "normalize_document".to_string(),
        "evaluate_expectations".to_string(),
        "write_run_report".to_string(),
    ]
}
