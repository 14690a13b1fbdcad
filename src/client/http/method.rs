use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, COOKIE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use route_query_keys::Verb;
use serde_json::Value;
use tracing::debug;

use super::response::HttpResponse;
use super::route::scalar_text;
use crate::client::{
    ArgsBag, ClientError, ClientNode, InputShape, RawResponse, RequestFn, RequestOptions,
};

/// Shared HTTP machinery for every verb callable of one client.
#[derive(Debug)]
pub(super) struct Transport {
    pub(super) client: Client,
    pub(super) default_headers: BTreeMap<String, String>,
}

/// The callable behind a `$verb` member.
///
/// It holds no route information of its own; the URL always comes from the
/// receiver passed to [`RequestFn::call`].
pub(super) struct HttpMethod {
    verb: Verb,
    shape: InputShape,
    transport: Arc<Transport>,
}

impl HttpMethod {
    pub(super) fn new(verb: Verb, shape: InputShape, transport: Arc<Transport>) -> Self {
        Self {
            verb,
            shape,
            transport,
        }
    }

    fn method(&self) -> Method {
        match self.verb {
            Verb::Get => Method::GET,
            Verb::Put => Method::PUT,
            Verb::Post => Method::POST,
            Verb::Patch => Method::PATCH,
            Verb::Delete => Method::DELETE,
        }
    }

    fn headers(
        &self,
        args: Option<&ArgsBag>,
        options: Option<&RequestOptions>,
    ) -> Result<HeaderMap, ClientError> {
        let mut headers = HeaderMap::new();

        let from_args = args
            .and_then(|bag| bag.get("header"))
            .and_then(Value::as_object)
            .into_iter()
            .flatten()
            .map(|(name, value)| (name.clone(), scalar_text(value)));
        let from_options = options
            .into_iter()
            .flat_map(|options| options.headers.iter())
            .map(|(name, value)| (name.clone(), value.clone()));

        // Later sources win: defaults, then the bag, then request options.
        let ordered = self
            .transport
            .default_headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .chain(from_args)
            .chain(from_options);
        for (name, value) in ordered {
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| ClientError::header(&name, err.to_string()))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|err| ClientError::header(&name, err.to_string()))?;
            headers.insert(header, value);
        }

        if let Some(cookies) = args
            .and_then(|bag| bag.get("cookie"))
            .and_then(Value::as_object)
            .filter(|map| !map.is_empty())
        {
            let joined = cookies
                .iter()
                .map(|(name, value)| format!("{name}={}", scalar_text(value)))
                .collect::<Vec<_>>()
                .join("; ");
            let value = HeaderValue::from_str(&joined)
                .map_err(|err| ClientError::header("cookie", err.to_string()))?;
            headers.insert(COOKIE, value);
        }

        Ok(headers)
    }
}

#[async_trait]
impl RequestFn for HttpMethod {
    fn input_shape(&self) -> InputShape {
        self.shape
    }

    async fn call(
        &self,
        receiver: &dyn ClientNode,
        args: Option<ArgsBag>,
        options: Option<RequestOptions>,
    ) -> Result<Box<dyn RawResponse>, ClientError> {
        let url = receiver.url(args.as_ref())?;
        let headers = self.headers(args.as_ref(), options.as_ref())?;

        let mut request = self
            .transport
            .client
            .request(self.method(), url.clone())
            .headers(headers);

        if let Some(body) = args.as_ref().and_then(|bag| bag.get("json")) {
            request = request.json(body);
        } else if let Some(form) = args
            .as_ref()
            .and_then(|bag| bag.get("form"))
            .and_then(Value::as_object)
        {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(form.iter().map(|(name, value)| (name, scalar_text(value))))
                .finish();
            request = request
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(encoded);
        }

        debug!(verb = %self.verb, url = %url, "dispatching request");

        let exchange = async {
            let response = request.send().await?;
            HttpResponse::read(response).await
        };

        let response = match options.as_ref().filter(|options| !options.signals.is_empty()) {
            Some(options) => tokio::select! {
                biased;
                () = options.aborted() => {
                    debug!(verb = %self.verb, url = %url, "request aborted");
                    return Err(ClientError::Aborted { url: url.to_string() });
                }
                response = exchange => response?,
            },
            None => exchange.await?,
        };

        debug!(
            verb = %self.verb,
            url = %url,
            status = response.status(),
            "received response"
        );
        Ok(Box::new(response))
    }
}
