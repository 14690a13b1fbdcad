//! Recursive interception over a route client.
//!
//! A [`Proxy`] wraps one [`ClientNode`] and classifies every member read
//! through it. Verb tokens become adapters built by the active
//! [`Interceptor`]; every other member is forwarded, with nodes re-wrapped
//! so the classification applies at every depth. Wrappers are built on
//! demand and never cached.

mod leaf;

use std::sync::Arc;

use route_query_keys::{THENABLE_PROBE, Verb};
use serde_json::Value;
use tracing::trace;

use crate::client::{
    ArgsBag, ClientError, ClientNode, InputShape, Member, RawResponse, RequestFn, RequestOptions,
};
use crate::error::ProxyError;

pub use leaf::Leaf;

/// Front-end seam: turns verb leaves into adapters.
pub trait Interceptor: Clone + Send + Sync {
    /// Adapter produced for `$get`.
    type Query;
    /// Adapter produced for `$put`, `$post`, `$patch` and `$delete`.
    type Mutation;

    fn query(&self, leaf: Leaf) -> Self::Query;

    fn mutation(&self, leaf: Leaf) -> Self::Mutation;
}

/// Outcome of reading one member through a [`Proxy`].
pub enum Access<I: Interceptor> {
    /// Missing member, or the thenable probe.
    Absent,
    Query(I::Query),
    Mutation(I::Mutation),
    Node(Proxy<I>),
    Function(BoundFn),
    Value(Value),
}

impl<I: Interceptor> Access<I> {
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Access::Absent)
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Access::Absent => "absent",
            Access::Query(_) => "query",
            Access::Mutation(_) => "mutation",
            Access::Node(_) => "node",
            Access::Function(_) => "function",
            Access::Value(_) => "value",
        }
    }
}

/// Navigable wrapper around a route client node.
#[derive(Clone)]
pub struct Proxy<I> {
    node: Arc<dyn ClientNode>,
    interceptor: I,
}

impl<I: Interceptor> Proxy<I> {
    pub fn new(node: Arc<dyn ClientNode>, interceptor: I) -> Self {
        Self { node, interceptor }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.node.path()
    }

    #[must_use]
    pub fn node(&self) -> &Arc<dyn ClientNode> {
        &self.node
    }

    /// Read member `name`.
    pub fn prop(&self, name: &str) -> Access<I> {
        if name == THENABLE_PROBE {
            trace!(path = self.path(), "thenable probe suppressed");
            return Access::Absent;
        }

        let member = self.node.member(name);

        if let Some(verb) = Verb::from_token(name) {
            let method = match member {
                Member::Function(method) => Some(method),
                _ => None,
            };
            let leaf = Leaf::new(verb, self.node.clone(), method);
            return if verb.is_mutation() {
                Access::Mutation(self.interceptor.mutation(leaf))
            } else {
                Access::Query(self.interceptor.query(leaf))
            };
        }

        match member {
            Member::Node(node) => Access::Node(Proxy::new(node, self.interceptor.clone())),
            Member::Function(function) => Access::Function(BoundFn {
                receiver: self.node.clone(),
                function,
            }),
            Member::Value(value) => Access::Value(value),
            Member::Absent => Access::Absent,
        }
    }

    /// Step into the child segment `name`.
    pub fn at(&self, name: &str) -> Result<Proxy<I>, ProxyError> {
        match self.prop(name) {
            Access::Node(proxy) => Ok(proxy),
            _ => Err(ProxyError::NotARoute {
                path: self.path().to_string(),
                name: name.to_string(),
            }),
        }
    }

    /// Step through several segments, e.g. `["params", ":id"]`.
    pub fn route<S: AsRef<str>>(&self, segments: &[S]) -> Result<Proxy<I>, ProxyError> {
        segments
            .iter()
            .try_fold(self.clone(), |proxy, segment| proxy.at(segment.as_ref()))
    }

    pub fn verb(&self, verb: Verb) -> Access<I> {
        self.prop(verb.token())
    }

    pub fn get(&self) -> I::Query {
        self.interceptor.query(self.leaf(Verb::Get))
    }

    pub fn put(&self) -> I::Mutation {
        self.interceptor.mutation(self.leaf(Verb::Put))
    }

    pub fn post(&self) -> I::Mutation {
        self.interceptor.mutation(self.leaf(Verb::Post))
    }

    pub fn patch(&self) -> I::Mutation {
        self.interceptor.mutation(self.leaf(Verb::Patch))
    }

    pub fn delete(&self) -> I::Mutation {
        self.interceptor.mutation(self.leaf(Verb::Delete))
    }

    fn leaf(&self, verb: Verb) -> Leaf {
        let method = match self.node.member(verb.token()) {
            Member::Function(method) => Some(method),
            _ => None,
        };
        Leaf::new(verb, self.node.clone(), method)
    }
}

impl<I> std::fmt::Debug for Proxy<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("path", &self.node.path())
            .finish_non_exhaustive()
    }
}

/// A non-verb callable together with the node it belongs to.
#[derive(Clone)]
pub struct BoundFn {
    receiver: Arc<dyn ClientNode>,
    function: Arc<dyn RequestFn>,
}

impl BoundFn {
    #[must_use]
    pub fn input_shape(&self) -> InputShape {
        self.function.input_shape()
    }

    pub async fn call(
        &self,
        args: Option<ArgsBag>,
        options: Option<RequestOptions>,
    ) -> Result<Box<dyn RawResponse>, ClientError> {
        self.function
            .call(self.receiver.as_ref(), args, options)
            .await
    }
}

#[cfg(test)]
mod tests;
