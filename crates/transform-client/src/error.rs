use reqwest::{Method, StatusCode};
use std::fmt;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Which kind of artifact an operation targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Transformation,
    Library,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transformation => "transformation",
            Self::Library => "library",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid server endpoint (expected http(s)://...): {url}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: Option<url::ParseError>,
    },

    #[error("missing credentials: set {0}")]
    MissingCredentials(&'static str),

    #[error("credentials cannot be sent as an HTTP header")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("failed to encode request body")]
    Encode(#[source] serde_json::Error),

    #[error("failed to call server")]
    Transport(#[from] reqwest::Error),

    #[error("server returned HTTP {} for {method} {url}.\n{body}", .status.as_u16())]
    Status {
        method: Method,
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("Failed to delete {kind} {id}: It may be connected to a destination.")]
    Conflict { kind: ArtifactKind, id: String },

    #[error("failed to decode {what} from response body")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    /// HTTP status of the server response that caused this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Conflict { .. } => Some(StatusCode::BAD_REQUEST),
            Self::Transport(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Map a failed delete onto the domain error.
///
/// Only `400` is rewritten; any other failure is returned untouched.
pub(crate) fn translate_delete_error(
    kind: ArtifactKind,
    id: &str,
    err: ClientError,
) -> ClientError {
    match err {
        ClientError::Status { status, .. } if status == StatusCode::BAD_REQUEST => {
            ClientError::Conflict {
                kind,
                id: id.to_string(),
            }
        }
        other => other,
    }
}
