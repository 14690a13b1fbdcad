use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::client::{ClientError, RawResponse};
use crate::error::{BoxError, HttpError, QueryError};

/// Builds the error raised for an unsuccessful response.
pub type HttpErrorFactory = Arc<dyn Fn(&dyn RawResponse) -> BoxError + Send + Sync>;

/// Process-wide adapter policy, fixed when the proxy tree is created.
#[derive(Clone)]
pub struct ProxyConfig {
    pub throw_on_http_error: bool,
    pub http_error_factory: HttpErrorFactory,
}

impl ProxyConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn throw_on_http_error(mut self, enabled: bool) -> Self {
        self.throw_on_http_error = enabled;
        self
    }

    #[must_use]
    pub fn http_error_factory(
        mut self,
        factory: impl Fn(&dyn RawResponse) -> BoxError + Send + Sync + 'static,
    ) -> Self {
        self.http_error_factory = Arc::new(factory);
        self
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            throw_on_http_error: true,
            http_error_factory: Arc::new(default_http_error),
        }
    }
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("throw_on_http_error", &self.throw_on_http_error)
            .finish_non_exhaustive()
    }
}

/// [`HttpError`] carrying the response status and status text.
#[must_use]
pub fn default_http_error(response: &dyn RawResponse) -> BoxError {
    Box::new(HttpError {
        status: response.status(),
        status_text: response.status_text().to_string(),
    })
}

/// Fail with the configured HTTP error when the response is unsuccessful and
/// the policy asks for it; otherwise hand the response back untouched.
pub fn apply_http_policy(
    response: Box<dyn RawResponse>,
    config: &ProxyConfig,
) -> Result<Box<dyn RawResponse>, QueryError> {
    if !response.ok() && config.throw_on_http_error {
        return Err(QueryError::Http((config.http_error_factory)(
            response.as_ref(),
        )));
    }
    Ok(response)
}

/// Response body parsing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnwrapTarget {
    Json,
    Text,
    Blob,
    FormData,
    ArrayBuffer,
}

impl UnwrapTarget {
    pub const ALL: [UnwrapTarget; 5] = [
        UnwrapTarget::Json,
        UnwrapTarget::Text,
        UnwrapTarget::Blob,
        UnwrapTarget::FormData,
        UnwrapTarget::ArrayBuffer,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            UnwrapTarget::Json => "json",
            UnwrapTarget::Text => "text",
            UnwrapTarget::Blob => "blob",
            UnwrapTarget::FormData => "formData",
            UnwrapTarget::ArrayBuffer => "arrayBuffer",
        }
    }
}

impl fmt::Display for UnwrapTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown unwrap target `{0}` (expected json, text, blob, formData or arrayBuffer)")]
pub struct ParseUnwrapTargetError(String);

impl FromStr for UnwrapTarget {
    type Err = ParseUnwrapTargetError;

    /// Accepts the camel-case names as well as `form-data`/`array-buffer`
    /// spellings used on the command line.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .chars()
            .filter(|ch| *ch != '-' && *ch != '_')
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL
            .into_iter()
            .find(|target| target.as_str().to_lowercase() == normalized)
            .ok_or_else(|| ParseUnwrapTargetError(value.to_string()))
    }
}

/// Parsed response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Text(String),
    Blob(Bytes),
    FormData(Vec<(String, String)>),
    ArrayBuffer(Bytes),
}

impl Body {
    #[must_use]
    pub fn target(&self) -> UnwrapTarget {
        match self {
            Body::Json(_) => UnwrapTarget::Json,
            Body::Text(_) => UnwrapTarget::Text,
            Body::Blob(_) => UnwrapTarget::Blob,
            Body::FormData(_) => UnwrapTarget::FormData,
            Body::ArrayBuffer(_) => UnwrapTarget::ArrayBuffer,
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_json(self) -> Option<Value> {
        match self {
            Body::Json(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Body::Blob(bytes) | Body::ArrayBuffer(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Decode the body into `T`. JSON, text and byte bodies are read as JSON;
    /// form data is read as a string map.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, QueryError> {
        let target = self.target().as_str();
        let decoded = match self {
            Body::Json(value) => T::deserialize(value),
            Body::Text(text) => serde_json::from_str(text),
            Body::Blob(bytes) | Body::ArrayBuffer(bytes) => serde_json::from_slice(bytes),
            Body::FormData(pairs) => {
                let map = pairs
                    .iter()
                    .map(|(name, value)| (name.clone(), Value::String(value.clone())))
                    .collect();
                T::deserialize(Value::Object(map))
            }
        };
        decoded.map_err(|err| QueryError::decode(target, err.to_string()))
    }
}

impl Serialize for Body {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Body::Json(value) => value.serialize(serializer),
            Body::Text(text) => serializer.serialize_str(text),
            Body::Blob(bytes) | Body::ArrayBuffer(bytes) => serializer.serialize_bytes(bytes),
            Body::FormData(pairs) => {
                let mut map = serializer.serialize_map(Some(pairs.len()))?;
                for (name, value) in pairs {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
        }
    }
}

/// Read the response body in the requested format.
pub async fn unwrap_body(
    response: &dyn RawResponse,
    target: UnwrapTarget,
) -> Result<Body, ClientError> {
    Ok(match target {
        UnwrapTarget::Json => Body::Json(response.json().await?),
        UnwrapTarget::Text => Body::Text(response.text().await?),
        UnwrapTarget::Blob => Body::Blob(response.blob().await?),
        UnwrapTarget::FormData => Body::FormData(response.form_data().await?),
        UnwrapTarget::ArrayBuffer => Body::ArrayBuffer(response.array_buffer().await?),
    })
}
