use crate::domain::error::TransportError;
use crate::domain::fixture::HttpMethod;

/// Rendered request against the reference application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: HttpMethod,
    pub path: String,
}

impl FetchRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

/// Raw response as returned by a [`DocumentSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchedDocument {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Anything that can answer a single request with a status and a body.
///
/// Implementations must not retry: an unreachable application is a setup
/// failure, not a transient condition.
pub trait DocumentSource {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchedDocument, TransportError>;
}
