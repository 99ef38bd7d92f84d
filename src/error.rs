use thiserror::Error;

/// Substrings that mark a tracker failure as an authorization problem
const AUTHORIZATION_MARKERS: [&str; 2] = ["forbidden", "unauthorized"];

/// Errors raised while loading or validating the configuration.
///
/// Any of these aborts the run before a ticket is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config override '{0}' (expected key.path=value)")]
    InvalidOverride(String),
    #[error("custom field '{name}' has no type (expected text or select)")]
    MissingFieldType { name: String },
    #[error("custom field '{name}' has unsupported type '{kind}' (expected text or select)")]
    UnsupportedFieldType { name: String, kind: String },
    #[error("custom field '{name}' is bound to unknown field code '{code}'")]
    UnknownFieldCode { name: String, code: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failure to derive a fingerprint for a single record
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("unparseable action date '{value}': {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Errors raised by the tracker collaborator.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: String,
        url: String,
        status: String,
        body: String,
    },
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Other(String),
}

impl TrackerError {
    /// Whether the tracker rejected the credentials.
    ///
    /// HTTP failures are judged on their status line only; response bodies and URLs
    /// are never inspected.
    pub fn is_authorization(&self) -> bool {
        match self {
            Self::Status { status, .. } => contains_marker(status),
            Self::Transport { source, .. } => {
                let mut cause = Some(source as &dyn std::error::Error);
                while let Some(err) = cause {
                    if contains_marker(&err.to_string()) {
                        return true;
                    }
                    cause = err.source();
                }
                false
            }
            Self::Other(message) => contains_marker(message),
            Self::Decode { .. } | Self::NotFound(_) => false,
        }
    }
}

fn contains_marker(text: &str) -> bool {
    let text = text.to_lowercase();
    AUTHORIZATION_MARKERS.iter().any(|m| text.contains(m))
}

/// A configured name that the tracker does not know about
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("no transition matching '{0}'")]
    Transition(String),
    #[error("no resolution named '{0}'")]
    Resolution(String),
}

/// Run-level failures: the only errors that escape the driver.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("tracker rejected credentials, aborting run: {0}")]
    Unauthorized(#[source] TrackerError),
}
