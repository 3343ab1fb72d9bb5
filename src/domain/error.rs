use serde_json::Value;
use thiserror::Error;

use crate::io::{Format, IoError};

/// Network-level failure while talking to the reference application.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} error for {method} {url}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub method: String,
    pub url: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    InvalidUrl,
    Connect,
    Timeout,
    Request,
    Body,
}

impl TransportErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid_url",
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Request => "request",
            Self::Body => "body",
        }
    }
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A description document that could not be parsed in its declared format.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed {format} document{}: {message}", location_suffix(.line, .column))]
pub struct MalformedDocumentError {
    pub format: Format,
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl MalformedDocumentError {
    pub fn new(format: Format, message: impl Into<String>) -> Self {
        Self {
            format,
            message: message.into(),
            line: None,
            column: None,
        }
    }

    pub fn from_io(format: Format, error: IoError) -> Self {
        let (line, column) = match &error {
            IoError::JsonParse(source) if source.line() > 0 => {
                (Some(source.line()), Some(source.column()))
            }
            IoError::YamlParse(source) => match source.location() {
                Some(location) => (Some(location.line()), Some(location.column())),
                None => (None, None),
            },
            _ => (None, None),
        };
        Self {
            format,
            message: error.to_string(),
            line,
            column,
        }
    }
}

fn location_suffix(line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!(" at line {line}, column {column}"),
        (Some(line), None) => format!(" at line {line}"),
        _ => String::new(),
    }
}

/// A path expression that does not resolve against the document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("key `{key}` not found at `{at}`")]
    MissingKey { at: String, key: String },

    #[error("index {index} out of range at `{at}` (length {len})")]
    IndexOutOfRange { at: String, index: usize, len: usize },

    #[error("cannot apply `{step}` to {kind} at `{at}`")]
    NotTraversable {
        at: String,
        step: String,
        kind: &'static str,
    },
}

impl ResolutionError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingKey { .. } => "missing_key",
            Self::IndexOutOfRange { .. } => "index_out_of_range",
            Self::NotTraversable { .. } => "not_traversable",
        }
    }
}

/// A resolved value that does not satisfy its predicate.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{reason}: expected {expected}, got {actual}")]
pub struct AssertionMismatch {
    pub reason: &'static str,
    pub expected: Value,
    pub actual: Value,
}

/// Errors that abort a whole scenario before or while fetching its snapshot.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScenarioError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    MalformedDocument(#[from] MalformedDocumentError),

    #[error("unexpected status for {method} {path}: expected {expected}, got {actual}")]
    UnexpectedStatus {
        method: String,
        path: String,
        expected: u16,
        actual: u16,
    },

    #[error("document did not propagate within {waited_ms} ms: marker `{marker}` still failing ({last})")]
    TimeoutWaitingForPropagation {
        waited_ms: u64,
        marker: String,
        last: String,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("run deadline elapsed after {elapsed_ms} ms")]
    DeadlineElapsed { elapsed_ms: u64 },

    #[error("scenario aborted: {0}")]
    Internal(String),
}

impl ScenarioError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport_error",
            Self::MalformedDocument(_) => "malformed_document",
            Self::UnexpectedStatus { .. } => "unexpected_status",
            Self::TimeoutWaitingForPropagation { .. } => "timeout_waiting_for_propagation",
            Self::InvalidRequest(_) => "invalid_request",
            Self::DeadlineElapsed { .. } => "deadline_elapsed",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { actual, .. } => Some(*actual),
            _ => None,
        }
    }
}

/// Errors produced while loading or validating a fixture file.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("unable to resolve fixture format from `{path}`: {source}")]
    ResolveFormat {
        path: String,
        #[source]
        source: IoError,
    },

    #[error("failed to open fixture file `{path}`: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {format} fixture: {source}")]
    Read {
        format: Format,
        #[source]
        source: IoError,
    },

    #[error("invalid fixture schema: {0}")]
    Schema(String),

    #[error("invalid fixture: {0}")]
    Invalid(String),
}

/// Errors produced by the `normalize` command boundary.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("failed to read input: {0}")]
    ReadInput(#[source] std::io::Error),

    #[error(transparent)]
    Malformed(#[from] MalformedDocumentError),

    #[error("failed to write {format} output: {source}")]
    WriteOutput {
        format: Format,
        #[source]
        source: IoError,
    },
}
