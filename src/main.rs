use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand, ValueEnum};
use oascheck::cmd::{self, CommandResponse, check, normalize, resolve};
use oascheck::config::{
    ConfigInput, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_SERVER_URL, DEFAULT_TIMEOUT_MS,
};
use oascheck::domain::error::NormalizeError;
use oascheck::domain::report::{PipelineInput, PipelineInputSource, PipelineReport};
use oascheck::engine::runner::RunOptions;
use oascheck::io::{self as oascheck_io, Format, IoError};
use serde::Serialize;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "oascheck",
    version,
    about = "Conformance checks for generated OpenAPI documents"
)]
struct Cli {
    #[arg(long, global = true, default_value_t = false)]
    emit_pipeline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run fixture scenarios against a live server.
    Run(RunArgs),
    /// Evaluate fixture scenarios against a local document.
    Check(CheckArgs),
    /// Print a document in canonical form.
    Normalize(NormalizeArgs),
    /// Resolve one path expression against a local document.
    Resolve(ResolveArgs),
}

#[derive(Debug, clap::Args)]
struct RunArgs {
    #[arg(long)]
    fixture: PathBuf,

    #[arg(long, env = "OASCHECK_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server_url: String,

    #[arg(long, env = "OASCHECK_USER")]
    user: Option<String>,

    #[arg(long, env = "OASCHECK_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(long, env = "OASCHECK_CONNECT_TIMEOUT_MS", default_value_t = DEFAULT_CONNECT_TIMEOUT_MS)]
    connect_timeout_ms: u64,

    #[arg(long, env = "OASCHECK_TIMEOUT_MS", default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Worker threads; 0 uses available parallelism.
    #[arg(long, default_value_t = 0)]
    jobs: usize,

    /// Scenarios not started within this budget are cancelled.
    #[arg(long)]
    deadline_ms: Option<u64>,

    #[arg(long = "scenario")]
    scenarios: Vec<String>,
}

#[derive(Debug, clap::Args)]
struct CheckArgs {
    #[arg(long)]
    fixture: PathBuf,

    #[arg(long)]
    input: Option<PathBuf>,

    #[arg(long, value_enum)]
    from: Option<CliDocumentFormat>,

    #[arg(long = "scenario")]
    scenarios: Vec<String>,
}

#[derive(Debug, clap::Args)]
struct NormalizeArgs {
    #[arg(long)]
    input: Option<PathBuf>,

    #[arg(long, value_enum)]
    from: Option<CliDocumentFormat>,

    #[arg(long, value_enum, default_value_t = CliDocumentFormat::Json)]
    to: CliDocumentFormat,
}

#[derive(Debug, clap::Args)]
struct ResolveArgs {
    #[arg(long)]
    input: Option<PathBuf>,

    #[arg(long)]
    path: String,

    #[arg(long, value_enum)]
    from: Option<CliDocumentFormat>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliDocumentFormat {
    Json,
    Yaml,
}

impl From<CliDocumentFormat> for Format {
    fn from(value: CliDocumentFormat) -> Self {
        match value {
            CliDocumentFormat::Json => Self::Json,
            CliDocumentFormat::Yaml => Self::Yaml,
        }
    }
}

#[derive(Serialize)]
struct CliError<'a> {
    error: &'a str,
    message: String,
    code: i32,
    details: Value,
}

fn main() {
    process::exit(run());
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => return handle_parse_error(error),
    };
    init_tracing();

    let emit_pipeline = cli.emit_pipeline;
    match cli.command {
        Commands::Run(args) => run_fixture(args, emit_pipeline),
        Commands::Check(args) => run_check(args, emit_pipeline),
        Commands::Normalize(args) => run_normalize(args, emit_pipeline),
        Commands::Resolve(args) => run_resolve(args, emit_pipeline),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("OASCHECK_LOG").unwrap_or_else(|_| EnvFilter::new("off"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn handle_parse_error(error: clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            print!("{error}");
            0
        }
        _ => {
            emit_error(
                "input_usage_error",
                error.to_string(),
                json!({"kind": "cli_parse_error"}),
                3,
            );
            3
        }
    }
}

fn run_fixture(args: RunArgs, emit_pipeline: bool) -> i32 {
    let pipeline_report = PipelineReport::new(
        "run",
        PipelineInput::new(vec![
            PipelineInputSource::path(
                "fixture",
                args.fixture.display().to_string(),
                path_format_label(&args.fixture),
            ),
            PipelineInputSource::http("document", args.server_url.clone()),
        ]),
        cmd::run::pipeline_steps(),
    );
    let command_args = cmd::run::RunCommandArgs {
        fixture: args.fixture,
        config: ConfigInput {
            server_url: args.server_url,
            user: args.user,
            password: args.password,
            connect_timeout_ms: args.connect_timeout_ms,
            timeout_ms: args.timeout_ms,
        },
        options: RunOptions {
            jobs: args.jobs,
            deadline: args.deadline_ms.map(Duration::from_millis),
            scenarios: args.scenarios,
        },
    };

    let response = cmd::run::run(&command_args);
    let exit_code = emit_response("run", &response);
    if emit_pipeline {
        emit_pipeline_report(&pipeline_report);
    }
    exit_code
}

fn run_check(args: CheckArgs, emit_pipeline: bool) -> i32 {
    let input_format = args.from.map(Format::from);
    let pipeline_report = PipelineReport::new(
        "check",
        PipelineInput::new(vec![
            PipelineInputSource::path(
                "fixture",
                args.fixture.display().to_string(),
                path_format_label(&args.fixture),
            ),
            document_source(args.input.as_deref(), input_format),
        ]),
        check::pipeline_steps(),
    );
    let command_args = check::CheckCommandArgs {
        fixture: args.fixture,
        input: args.input,
        from: input_format,
        scenarios: args.scenarios,
    };

    let stdin = io::stdin();
    let response = check::run_with_stdin(&command_args, stdin.lock());
    let exit_code = emit_response("check", &response);
    if emit_pipeline {
        emit_pipeline_report(&pipeline_report);
    }
    exit_code
}

fn run_normalize(args: NormalizeArgs, emit_pipeline: bool) -> i32 {
    let input_format = args.from.map(Format::from);
    let output_format: Format = args.to.into();
    let pipeline_report = PipelineReport::new(
        "normalize",
        PipelineInput::new(vec![document_source(args.input.as_deref(), input_format)]),
        normalize::pipeline_steps(),
    );

    let stdout = io::stdout();
    let mut output = stdout.lock();
    let result = match &args.input {
        Some(path) => match File::open(path) {
            Ok(file) => normalize::run(file, &mut output, input_format, output_format),
            Err(err) => {
                emit_error(
                    "input_usage_error",
                    format!("failed to open input file `{}`: {err}", path.display()),
                    json!({"command": "normalize", "input": path}),
                    3,
                );
                if emit_pipeline {
                    emit_pipeline_report(&pipeline_report);
                }
                return 3;
            }
        },
        None => {
            let stdin = io::stdin();
            normalize::run(stdin.lock(), &mut output, input_format, output_format)
        }
    };

    let exit_code = match result {
        Ok(()) => 0,
        Err(error) => {
            let (exit_code, error_kind) = map_normalize_error(&error);
            emit_error(
                error_kind,
                error.to_string(),
                json!({"command": "normalize"}),
                exit_code,
            );
            exit_code
        }
    };
    if emit_pipeline {
        emit_pipeline_report(&pipeline_report);
    }
    exit_code
}

fn run_resolve(args: ResolveArgs, emit_pipeline: bool) -> i32 {
    let input_format = args.from.map(Format::from);
    let pipeline_report = PipelineReport::new(
        "resolve",
        PipelineInput::new(vec![document_source(args.input.as_deref(), input_format)]),
        resolve::pipeline_steps(),
    );
    let command_args = resolve::ResolveCommandArgs {
        input: args.input,
        from: input_format,
        path: args.path,
    };

    let stdin = io::stdin();
    let response = resolve::run_with_stdin(&command_args, stdin.lock());
    let exit_code = emit_response("resolve", &response);
    if emit_pipeline {
        emit_pipeline_report(&pipeline_report);
    }
    exit_code
}

fn map_normalize_error(error: &NormalizeError) -> (i32, &'static str) {
    match error {
        NormalizeError::ReadInput(_) | NormalizeError::Malformed(_) => (3, "input_usage_error"),
        NormalizeError::WriteOutput { source, .. } => match source {
            IoError::Io(_) => (1, "internal_error"),
            _ => (3, "input_usage_error"),
        },
    }
}

fn document_source(input: Option<&Path>, format: Option<Format>) -> PipelineInputSource {
    match input {
        Some(path) => {
            let format = format.or_else(|| oascheck_io::resolve_input_format(None, Some(path)).ok());
            PipelineInputSource::path(
                "document",
                path.display().to_string(),
                format.map(Format::as_str),
            )
        }
        None => PipelineInputSource::stdin("document", format.map(Format::as_str)),
    }
}

fn path_format_label(path: &Path) -> Option<&'static str> {
    oascheck_io::resolve_input_format(None, Some(path))
        .ok()
        .map(Format::as_str)
}

fn emit_response(command: &str, response: &CommandResponse) -> i32 {
    match response.exit_code {
        0 | 2 => {
            if emit_json_stdout(&response.payload) {
                response.exit_code
            } else {
                emit_error(
                    "internal_error",
                    format!("failed to serialize {command} response"),
                    json!({"command": command}),
                    1,
                );
                1
            }
        }
        3 | 1 => {
            if emit_json_stderr(&response.payload) {
                response.exit_code
            } else {
                emit_error(
                    "internal_error",
                    format!("failed to serialize {command} error"),
                    json!({"command": command}),
                    1,
                );
                1
            }
        }
        other => {
            emit_error(
                "internal_error",
                format!("unexpected {command} exit code: {other}"),
                json!({"command": command}),
                1,
            );
            1
        }
    }
}

fn emit_json_stdout(value: &Value) -> bool {
    match serde_json::to_string(value) {
        Ok(serialized) => {
            println!("{serialized}");
            true
        }
        Err(_) => false,
    }
}

fn emit_json_stderr(value: &Value) -> bool {
    match serde_json::to_string(value) {
        Ok(serialized) => {
            eprintln!("{serialized}");
            true
        }
        Err(_) => false,
    }
}

fn emit_pipeline_report(report: &PipelineReport) {
    match serde_json::to_string(report) {
        Ok(serialized) => eprintln!("{serialized}"),
        Err(error) => emit_error(
            "internal_error",
            format!("failed to serialize pipeline report: {error}"),
            json!({"command": "emit_pipeline"}),
            1,
        ),
    }
}

fn emit_error(error: &'static str, message: String, details: Value, code: i32) {
    let payload = CliError {
        error,
        message,
        code,
        details,
    };
    match serde_json::to_string(&payload) {
        Ok(serialized) => eprintln!("{serialized}"),
        Err(_) => eprintln!(
            "{{\"error\":\"internal_error\",\"message\":\"failed to serialize error\",\"code\":1}}"
        ),
    }
}
