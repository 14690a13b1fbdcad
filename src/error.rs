use route_query_keys::{KeyError, Verb};
use thiserror::Error;

use crate::client::ClientError;

/// Error type produced by user-supplied HTTP error factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Default error raised for unsuccessful responses; displays as the status text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status_text}")]
pub struct HttpError {
    pub status: u16,
    pub status_text: String,
}

/// Navigation and contract violations, raised synchronously.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("`{name}` under `{path}` is not a route segment")]
    NotARoute { path: String, name: String },
    #[error("route `{path}` does not declare `{verb}`")]
    UndeclaredVerb { path: String, verb: Verb },
    #[error("route `{path}` accepts no parameters for `{verb}`")]
    UnexpectedParams { path: String, verb: Verb },
    #[error("route `{path}` does not accept `{part}` for `{verb}`")]
    UnsupportedPart {
        path: String,
        verb: Verb,
        part: String,
    },
    #[error("`{part}` for route `{path}` must be an object")]
    PartNotObject { path: String, part: &'static str },
}

/// Everything that can reach the fetch runtime's error channel.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Unsuccessful response, built by the configured error factory.
    #[error("{0}")]
    Http(BoxError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Misuse(#[from] ProxyError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error("failed to decode {target} body: {reason}")]
    Decode {
        target: &'static str,
        reason: String,
    },
}

impl QueryError {
    pub(crate) fn decode(target: &'static str, reason: impl Into<String>) -> Self {
        Self::Decode {
            target,
            reason: reason.into(),
        }
    }

    /// The default [`HttpError`], when the HTTP policy produced one.
    #[must_use]
    pub fn http_error(&self) -> Option<&HttpError> {
        match self {
            QueryError::Http(inner) => inner.downcast_ref::<HttpError>(),
            _ => None,
        }
    }

    /// True for transport aborts triggered by a cancellation signal.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, QueryError::Client(ClientError::Aborted { .. }))
    }
}
