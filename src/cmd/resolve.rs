use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use serde_json::json;

use crate::cmd::{CommandError, CommandResponse};
use crate::domain::doc_path::DocPath;
use crate::engine::normalize::{normalize_as, normalize_document};
use crate::engine::resolve::{node_kind, resolve};
use crate::io::{self, Format};

#[derive(Debug, Clone)]
pub struct ResolveCommandArgs {
    pub input: Option<PathBuf>,
    pub from: Option<Format>,
    pub path: String,
}

/// Resolves one path expression against a local document.
///
/// An unresolvable path maps to exit code 2 with the resolution reason.
pub fn run_with_stdin<R: Read>(args: &ResolveCommandArgs, stdin: R) -> CommandResponse {
    match execute(args, stdin) {
        Ok(response) => response,
        Err(error) => error.into(),
    }
}

fn execute<R: Read>(args: &ResolveCommandArgs, stdin: R) -> Result<CommandResponse, CommandError> {
    let path = DocPath::parse(&args.path).map_err(|error| CommandError::InputUsage(error.to_string()))?;

    let mut body = Vec::new();
    match &args.input {
        Some(input) => File::open(input)
            .map_err(|error| {
                CommandError::InputUsage(format!(
                    "failed to open input file `{}`: {error}",
                    input.display()
                ))
            })?
            .read_to_end(&mut body),
        None => {
            let mut stdin = stdin;
            stdin.read_to_end(&mut body)
        }
    }
    .map_err(|error| CommandError::InputUsage(format!("failed to read input: {error}")))?;

    let from = args.from.or_else(|| {
        args.input
            .as_deref()
            .and_then(|input| io::resolve_input_format(None, Some(input)).ok())
    });
    let document = match from {
        Some(format) => normalize_as(&body, format),
        None => normalize_document(&body, None),
    }
    .map_err(|error| CommandError::InputUsage(error.to_string()))?;

    let response = match resolve(&document, &path) {
        Ok(node) => CommandResponse {
            exit_code: 0,
            payload: json!({
                "path": path.to_string(),
                "kind": node_kind(&node),
                "value": node.into_owned(),
            }),
        },
        Err(error) => CommandResponse {
            exit_code: 2,
            payload: json!({
                "path": path.to_string(),
                "error": "resolution_error",
                "reason": error.reason(),
                "message": error.to_string(),
            }),
        },
    };
    Ok(response)
}

/// Ordered pipeline-step names used for `--emit-pipeline` diagnostics.
pub fn pipeline_steps() -> Vec<String> {
    vec![
        "parse_path_expression".to_string(),
        "read_document".to_string(),
        "normalize_document".to_string(),
        "resolve_path".to_string(),
    ]
}
