use std::fmt;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:9080";
pub const DEFAULT_PORT: u16 = 9080;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

const REDACTED: &str = "<redacted>";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &REDACTED)
            .finish()
    }
}

/// Raw settings as collected from flags and environment.
#[derive(Clone, PartialEq, Eq)]
pub struct ConfigInput {
    pub server_url: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub connect_timeout_ms: u64,
    pub timeout_ms: u64,
}

impl fmt::Debug for ConfigInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigInput")
            .field("server_url", &self.server_url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl Default for ConfigInput {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            user: None,
            password: None,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Validated connection settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// `scheme://host:port/`; any path in the configured URL is dropped.
    pub base_url: Url,
    pub credentials: Option<Credentials>,
    /// Certificate verification is skipped when credentials are configured.
    pub relaxed_tls: bool,
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid server url `{url}`: {reason}")]
    InvalidServerUrl { url: String, reason: String },

    #[error("unsupported server url scheme `{0}` (expected http or https)")]
    UnsupportedScheme(String),

    #[error("`{0}` must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("cannot join `{path}` onto the server url: {reason}")]
    InvalidRequestPath { path: String, reason: String },
}

impl HarnessConfig {
    pub fn resolve(input: &ConfigInput) -> Result<Self, ConfigError> {
        let base_url = normalize_base_url(&input.server_url)?;
        if input.connect_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("connect-timeout-ms"));
        }
        if input.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("timeout-ms"));
        }

        let credentials = match (present(&input.user), input.password.as_deref()) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.to_string(),
                password: password.to_string(),
            }),
            _ => None,
        };

        Ok(Self {
            base_url,
            relaxed_tls: credentials.is_some(),
            credentials,
            connect_timeout: Duration::from_millis(input.connect_timeout_ms),
            timeout: Duration::from_millis(input.timeout_ms),
        })
    }

    /// Absolute URL for a rendered request path.
    ///
    /// The path replaces the base path verbatim, so a `:` in its first
    /// segment is never read as a scheme.
    pub fn url_for(&self, path: &str) -> Result<Url, ConfigError> {
        if !path.starts_with('/') {
            return Err(ConfigError::InvalidRequestPath {
                path: path.to_string(),
                reason: "path must start with `/`".to_string(),
            });
        }
        let (path_part, query) = match path.split_once('?') {
            Some((path_part, query)) => (path_part, Some(query)),
            None => (path, None),
        };
        let mut url = self.base_url.clone();
        url.set_path(path_part);
        url.set_query(query);
        Ok(url)
    }
}

/// Blank values count as absent; present values are used verbatim.
fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .filter(|value| !value.trim().is_empty())
}

/// Port written in the authority of `raw`, if any.
fn has_explicit_port(raw: &str) -> bool {
    let Some((_, rest)) = raw.split_once("://") else {
        return false;
    };
    let authority = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or_default();
    let after_host = match host_port.rfind(']') {
        Some(end) => &host_port[end + 1..],
        None => host_port,
    };
    after_host.contains(':')
}

fn normalize_base_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).map_err(|error| ConfigError::InvalidServerUrl {
        url: trimmed.to_string(),
        reason: error.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::UnsupportedScheme(parsed.scheme().to_string()));
    }
    let Some(host) = parsed.host_str() else {
        return Err(ConfigError::InvalidServerUrl {
            url: trimmed.to_string(),
            reason: "missing host".to_string(),
        });
    };
    let port = if has_explicit_port(trimmed) {
        parsed.port_or_known_default().unwrap_or(DEFAULT_PORT)
    } else {
        DEFAULT_PORT
    };
    let base = format!("{}://{host}:{port}/", parsed.scheme());
    Url::parse(&base).map_err(|error| ConfigError::InvalidServerUrl {
        url: trimmed.to_string(),
        reason: error.to_string(),
    })
}
