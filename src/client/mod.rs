//! Boundary with the route client.
//!
//! A route client is a tree of [`ClientNode`]s. Nodes expose named members:
//! child nodes (route segments), functions (verb callables such as `$get`)
//! and plain values. Nothing in these traits says whether a node is a leaf;
//! the interception layer decides that purely from member names.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

pub use route_query_keys::ArgsBag;

pub mod http;

/// Transport-level failures. These reach callers unchanged.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("request to {url} was aborted")]
    Aborted { url: String },
    #[error("failed to decode response body as {target}: {reason}")]
    Body {
        target: &'static str,
        reason: String,
    },
    #[error("invalid header `{name}`: {reason}")]
    Header { name: String, reason: String },
    #[error("invalid route `{path}`: {reason}")]
    Route { path: String, reason: String },
}

impl ClientError {
    pub fn body(target: &'static str, reason: impl Into<String>) -> Self {
        Self::Body {
            target,
            reason: reason.into(),
        }
    }

    pub fn header(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Header {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn route(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Route {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// One navigable position in a route client.
pub trait ClientNode: Send + Sync {
    /// Route path of this node relative to the client root, for diagnostics.
    fn path(&self) -> &str;

    /// Resolve the request URL for this node, substituting path parameters
    /// from `args.param` and appending `args.query`.
    fn url(&self, args: Option<&ArgsBag>) -> Result<Url, ClientError>;

    /// Look up a member by name.
    fn member(&self, name: &str) -> Member;

    /// Names of every member this node exposes.
    fn member_names(&self) -> Vec<String>;
}

/// Result of a member lookup on a [`ClientNode`].
#[derive(Clone)]
pub enum Member {
    Absent,
    Node(Arc<dyn ClientNode>),
    Function(Arc<dyn RequestFn>),
    Value(Value),
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Absent => f.write_str("Absent"),
            Member::Node(node) => f.debug_tuple("Node").field(&node.path()).finish(),
            Member::Function(function) => f
                .debug_tuple("Function")
                .field(&function.input_shape())
                .finish(),
            Member::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

/// A callable exposed by a node.
///
/// Implementations receive their owning node as `receiver` on every call so
/// that a single callable can be shared between nodes and still resolve the
/// right URL.
#[async_trait]
pub trait RequestFn: Send + Sync {
    /// Request parts this callable accepts in its argument bag.
    fn input_shape(&self) -> InputShape;

    async fn call(
        &self,
        receiver: &dyn ClientNode,
        args: Option<ArgsBag>,
        options: Option<RequestOptions>,
    ) -> Result<Box<dyn RawResponse>, ClientError>;
}

/// Raw network response, body not yet consumed.
#[async_trait]
pub trait RawResponse: Send + Sync {
    fn ok(&self) -> bool;

    fn status(&self) -> u16;

    fn status_text(&self) -> &str;

    async fn json(&self) -> Result<Value, ClientError>;

    async fn text(&self) -> Result<String, ClientError>;

    async fn blob(&self) -> Result<Bytes, ClientError>;

    async fn form_data(&self) -> Result<Vec<(String, String)>, ClientError>;

    async fn array_buffer(&self) -> Result<Bytes, ClientError>;
}

/// Named part of a request argument bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InputPart {
    Param,
    Query,
    Json,
    Form,
    Header,
    Cookie,
}

impl InputPart {
    pub const ALL: [InputPart; 6] = [
        InputPart::Param,
        InputPart::Query,
        InputPart::Json,
        InputPart::Form,
        InputPart::Header,
        InputPart::Cookie,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            InputPart::Param => "param",
            InputPart::Query => "query",
            InputPart::Json => "json",
            InputPart::Form => "form",
            InputPart::Header => "header",
            InputPart::Cookie => "cookie",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|part| part.as_str() == name)
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for InputPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of [`InputPart`]s a leaf+verb declares.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InputShape(u8);

impl InputShape {
    pub const NONE: InputShape = InputShape(0);
    pub const PARAM: InputShape = InputShape::of(InputPart::Param);
    pub const QUERY: InputShape = InputShape::of(InputPart::Query);
    pub const JSON: InputShape = InputShape::of(InputPart::Json);
    pub const FORM: InputShape = InputShape::of(InputPart::Form);
    pub const HEADER: InputShape = InputShape::of(InputPart::Header);
    pub const COOKIE: InputShape = InputShape::of(InputPart::Cookie);

    #[must_use]
    pub const fn of(part: InputPart) -> Self {
        Self(part.bit())
    }

    #[must_use]
    pub const fn with(self, part: InputPart) -> Self {
        Self(self.0 | part.bit())
    }

    #[must_use]
    pub const fn union(self, other: InputShape) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn accepts(self, part: InputPart) -> bool {
        self.0 & part.bit() != 0
    }

    /// True when the leaf takes no arguments at all.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn parts(self) -> impl Iterator<Item = InputPart> {
        InputPart::ALL
            .into_iter()
            .filter(move |part| self.accepts(*part))
    }
}

impl std::ops::BitOr for InputShape {
    type Output = InputShape;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl FromIterator<InputPart> for InputShape {
    fn from_iter<T: IntoIterator<Item = InputPart>>(iter: T) -> Self {
        iter.into_iter().fold(Self::NONE, InputShape::with)
    }
}

impl fmt::Debug for InputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.parts()).finish()
    }
}

/// Transport-level overrides applied on top of the argument bag.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: BTreeMap<String, String>,
    /// Abort signals observed while the request is in flight; any one of
    /// them firing aborts the request.
    pub signals: Vec<CancellationToken>,
}

impl RequestOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_signal(mut self, signal: CancellationToken) -> Self {
        self.signals.push(signal);
        self
    }

    /// Thread a runtime-supplied cancellation token into these options.
    /// Caller-supplied signals stay in effect.
    pub fn merge_signal(&mut self, signal: &CancellationToken) {
        self.signals.push(signal.clone());
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.signals.iter().any(CancellationToken::is_cancelled)
    }

    /// Completes once any signal is cancelled; never completes without signals.
    pub async fn aborted(&self) {
        if self.signals.is_empty() {
            return futures::future::pending().await;
        }
        let waiting = self.signals.iter().map(|signal| Box::pin(signal.cancelled()));
        futures::future::select_all(waiting).await;
    }
}
