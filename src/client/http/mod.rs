//! `reqwest`-backed route client.
//!
//! Routes are declared up front (`verb`, path template, accepted input
//! parts) and folded into a tree of [`ClientNode`]s the same way typed RPC
//! clients expose them: `/` becomes the `index` member, `/params/:id`
//! becomes `params` → `:id`, and each leaf carries one member per declared
//! verb token.

mod method;
mod response;
mod route;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use route_query_keys::Verb;
use url::Url;

use super::{ClientError, ClientNode, InputShape};

pub use response::HttpResponse;
pub use route::member_path;

use method::Transport;
use route::{RouteDraft, RouteNode};

/// Route client talking HTTP through `reqwest`.
#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    root: Arc<RouteNode>,
}

impl HttpClient {
    pub fn builder(base_url: &str) -> Result<HttpClientBuilder, ClientError> {
        HttpClientBuilder::new(base_url)
    }

    pub fn user_agent() -> &'static str {
        concat!("route-query/", env!("CARGO_PKG_VERSION"))
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Root node of the route tree.
    #[must_use]
    pub fn root(&self) -> Arc<dyn ClientNode> {
        self.root.clone()
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct HttpClientBuilder {
    base: Url,
    timeout: Option<Duration>,
    user_agent: String,
    default_headers: BTreeMap<String, String>,
    routes: RouteDraft,
}

impl HttpClientBuilder {
    fn new(base_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            base: Url::parse(base_url)?,
            timeout: None,
            user_agent: HttpClient::user_agent().to_string(),
            default_headers: BTreeMap::new(),
            routes: RouteDraft::default(),
        })
    }

    /// Declare `verb` on the route at `path`.
    ///
    /// Declaring the same verb twice on one path keeps the last shape.
    #[must_use]
    pub fn route(mut self, verb: Verb, path: &str, shape: InputShape) -> Self {
        self.routes.insert(path, verb, shape);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Header sent with every request unless the call overrides it.
    #[must_use]
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> Result<HttpClient, ClientError> {
        let mut client = Client::builder().user_agent(self.user_agent);
        if let Some(timeout) = self.timeout {
            client = client.timeout(timeout);
        }

        let transport = Arc::new(Transport {
            client: client.build()?,
            default_headers: self.default_headers,
        });
        let root = self.routes.freeze(&self.base, &transport, Vec::new(), Vec::new());

        Ok(HttpClient {
            base: self.base,
            root,
        })
    }
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;
    use serde_json::json;

    use super::*;
    use crate::client::{ArgsBag, Member, RawResponse, RequestFn, RequestOptions};

    fn bag(value: serde_json::Value) -> ArgsBag {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn client(base: &str) -> HttpClient {
        HttpClient::builder(base)
            .expect("base url")
            .route(Verb::Get, "/", InputShape::NONE)
            .route(Verb::Post, "/", InputShape::NONE)
            .route(Verb::Get, "/:id", InputShape::PARAM)
            .route(Verb::Put, "/params/:id", InputShape::PARAM | InputShape::JSON)
            .route(Verb::Get, "/search", InputShape::QUERY)
            .build()
            .expect("client")
    }

    fn node(root: &Arc<dyn ClientNode>, path: &[&str]) -> Arc<dyn ClientNode> {
        let mut current = root.clone();
        for segment in path {
            current = match current.member(segment) {
                Member::Node(next) => next,
                other => panic!("`{segment}` is not a node: {other:?}"),
            };
        }
        current
    }

    fn call_fn(node: &Arc<dyn ClientNode>, verb: Verb) -> Arc<dyn RequestFn> {
        match node.member(verb.token()) {
            Member::Function(function) => function,
            other => panic!("`{verb}` is not a function: {other:?}"),
        }
    }

    #[test]
    fn root_path_is_exposed_as_index() {
        let client = client("https://example.com");
        let root = client.root();
        let index = node(&root, &["index"]);

        assert_eq!(index.url(None).unwrap().as_str(), "https://example.com/");
        assert!(matches!(index.member("$get"), Member::Function(_)));
        assert!(matches!(index.member("$post"), Member::Function(_)));
        assert!(matches!(index.member("$delete"), Member::Absent));
    }

    #[test]
    fn member_names_list_children_and_verbs() {
        let client = client("https://example.com");
        let root = client.root();
        let names = root.member_names();
        assert!(names.contains(&"index".to_string()));
        assert!(names.contains(&":id".to_string()));
        assert!(names.contains(&"params".to_string()));

        let index = node(&root, &["index"]);
        assert_eq!(index.member_names(), vec!["$get", "$post"]);
    }

    #[test]
    fn path_params_are_substituted() {
        let client = client("https://example.com");
        let leaf = node(&client.root(), &["params", ":id"]);

        let url = leaf.url(Some(&bag(json!({"param": {"id": "hello"}})))).unwrap();
        assert_eq!(url.as_str(), "https://example.com/params/hello");

        let url = leaf.url(Some(&bag(json!({"param": {"id": 7}})))).unwrap();
        assert_eq!(url.as_str(), "https://example.com/params/7");
    }

    #[test]
    fn missing_params_keep_the_template_segment() {
        let client = client("https://example.com");
        let leaf = node(&client.root(), &["params", ":id"]);
        assert_eq!(
            leaf.url(None).unwrap().as_str(),
            "https://example.com/params/:id"
        );
    }

    #[test]
    fn param_values_are_percent_encoded() {
        let client = client("https://example.com");
        let leaf = node(&client.root(), &[":id"]);
        let url = leaf.url(Some(&bag(json!({"param": {"id": "a b/c"}})))).unwrap();
        assert_eq!(url.as_str(), "https://example.com/a%20b%2Fc");
    }

    #[test]
    fn query_values_are_appended() {
        let client = client("https://example.com/api/");
        let leaf = node(&client.root(), &["search"]);
        let url = leaf
            .url(Some(&bag(json!({"query": {"page": 2, "q": "rust", "tag": ["a", "b"]}}))))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/api/search?page=2&q=rust&tag=a&tag=b"
        );
    }

    #[tokio::test]
    async fn put_sends_json_body_and_resolves_params_from_receiver() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("PUT")
                .path("/params/1")
                .json_body(json!({"param": "body param"}));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"id": "1", "param": "body param"}));
        });

        let client = client(&server.base_url());
        let leaf = node(&client.root(), &["params", ":id"]);
        let put = call_fn(&leaf, Verb::Put);
        let args = bag(json!({"param": {"id": "1"}, "json": {"param": "body param"}}));

        let response = put.call(leaf.as_ref(), Some(args), None).await.unwrap();
        assert!(response.ok());
        assert_eq!(
            response.json().await.unwrap(),
            json!({"id": "1", "param": "body param"})
        );
        mock.assert();
    }

    #[tokio::test]
    async fn request_option_headers_are_sent() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("GET").path("/").header("x-custom-header", "header");
            then.status(200).body("plain");
        });

        let client = client(&server.base_url());
        let index = node(&client.root(), &["index"]);
        let get = call_fn(&index, Verb::Get);
        let options = RequestOptions::new().header("x-custom-header", "header");

        let response = get.call(index.as_ref(), None, Some(options)).await.unwrap();
        assert_eq!(response.text().await.unwrap(), "plain");
        mock.assert();
    }

    #[tokio::test]
    async fn non_success_status_is_reported_not_raised() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/");
            then.status(404);
        });

        let client = client(&server.base_url());
        let index = node(&client.root(), &["index"]);
        let response = call_fn(&index, Verb::Get)
            .call(index.as_ref(), None, None)
            .await
            .unwrap();

        assert!(!response.ok());
        assert_eq!(response.status(), 404);
        assert_eq!(response.status_text(), "Not Found");
    }

    #[tokio::test]
    async fn cancelled_signal_aborts_the_request() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/");
            then.status(200).delay(Duration::from_secs(5));
        });

        let client = client(&server.base_url());
        let index = node(&client.root(), &["index"]);
        let signal = tokio_util::sync::CancellationToken::new();
        signal.cancel();
        let options = RequestOptions::new().with_signal(signal);

        let err = call_fn(&index, Verb::Get)
            .call(index.as_ref(), None, Some(options))
            .await
            .err()
            .expect("aborted");
        assert!(matches!(err, ClientError::Aborted { .. }));
    }
}
