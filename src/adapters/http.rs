use reqwest::Method;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use thiserror::Error;
use tracing::debug;

use crate::config::{Credentials, HarnessConfig};
use crate::domain::error::{TransportError, TransportErrorKind};
use crate::domain::fetch::{DocumentSource, FetchRequest, FetchedDocument};
use crate::domain::fixture::HttpMethod;

const ACCEPT_DOCUMENTS: &str = "application/json, application/yaml;q=0.9, */*;q=0.1";

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// Fetches documents from the reference application over HTTP(S).
///
/// Every request is issued exactly once; failures surface as
/// [`TransportError`] without retrying.
#[derive(Debug, Clone)]
pub struct HttpDocumentSource {
    client: Client,
    config: HarnessConfig,
}

impl HttpDocumentSource {
    pub fn new(config: HarnessConfig) -> Result<Self, HttpError> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout);
        if config.relaxed_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder.build().map_err(HttpError::ClientBuild)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    fn send(&self, request: &FetchRequest, url: &str) -> Result<Response, reqwest::Error> {
        let mut builder = self
            .client
            .request(method(request.method), url)
            .header(ACCEPT, ACCEPT_DOCUMENTS);
        if let Some(Credentials { username, password }) = &self.config.credentials {
            builder = builder.basic_auth(username, Some(password));
        }
        builder.send()
    }
}

impl DocumentSource for HttpDocumentSource {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchedDocument, TransportError> {
        let url = self.config.url_for(&request.path).map_err(|error| TransportError {
            kind: TransportErrorKind::InvalidUrl,
            method: request.method.to_string(),
            url: request.path.clone(),
            message: error.to_string(),
        })?;
        let url = url.as_str();

        let response = self
            .send(request, url)
            .map_err(|error| transport_error(request, url, &error))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);
        let body = response
            .bytes()
            .map_err(|error| TransportError {
                kind: TransportErrorKind::Body,
                method: request.method.to_string(),
                url: url.to_string(),
                message: error.to_string(),
            })?
            .to_vec();

        debug!(
            method = %request.method,
            url,
            status,
            content_type = content_type.as_deref().unwrap_or("-"),
            bytes = body.len(),
            "fetched document"
        );
        Ok(FetchedDocument {
            status,
            content_type,
            body,
        })
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn transport_error(request: &FetchRequest, url: &str, error: &reqwest::Error) -> TransportError {
    let kind = if error.is_timeout() {
        TransportErrorKind::Timeout
    } else if error.is_connect() {
        TransportErrorKind::Connect
    } else if error.is_builder() {
        TransportErrorKind::InvalidUrl
    } else {
        TransportErrorKind::Request
    };
    TransportError {
        kind,
        method: request.method.to_string(),
        url: url.to_string(),
        message: error_chain(error),
    }
}

fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    message
}
