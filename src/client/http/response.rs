use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use crate::client::{ClientError, RawResponse};

/// Fully buffered HTTP response.
///
/// The body is read once when the exchange completes, so every accessor can
/// be called any number of times.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: u16,
    status_text: String,
    content_type: Option<String>,
    bytes: Bytes,
}

// Non-standard codes have no canonical reason; the number stands in for it.
fn reason_phrase(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map_or_else(|| status.as_u16().to_string(), str::to_string)
}

impl HttpResponse {
    pub(super) async fn read(response: reqwest::Response) -> Result<Self, ClientError> {
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;

        Ok(Self {
            status: status.as_u16(),
            status_text: reason_phrase(status),
            content_type,
            bytes,
        })
    }

    /// Build a response from parts; used by alternative transports and tests.
    #[must_use]
    pub fn from_parts(status: u16, status_text: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            content_type: None,
            bytes: body.into(),
        }
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

#[async_trait]
impl RawResponse for HttpResponse {
    fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn status(&self) -> u16 {
        self.status
    }

    fn status_text(&self) -> &str {
        &self.status_text
    }

    async fn json(&self) -> Result<Value, ClientError> {
        serde_json::from_slice(&self.bytes).map_err(|err| ClientError::body("json", err.to_string()))
    }

    async fn text(&self) -> Result<String, ClientError> {
        Ok(String::from_utf8_lossy(&self.bytes).into_owned())
    }

    async fn blob(&self) -> Result<Bytes, ClientError> {
        Ok(self.bytes.clone())
    }

    async fn form_data(&self) -> Result<Vec<(String, String)>, ClientError> {
        if self
            .content_type
            .as_deref()
            .is_some_and(|value| value.starts_with("multipart/"))
        {
            return Err(ClientError::body(
                "formData",
                "multipart bodies are not supported",
            ));
        }
        Ok(url::form_urlencoded::parse(&self.bytes)
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect())
    }

    async fn array_buffer(&self) -> Result<Bytes, ClientError> {
        Ok(self.bytes.clone())
    }
}
