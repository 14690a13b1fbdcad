//! Typed cache keys and query/mutation adapters over route-shaped RPC clients.
//!
//! A route client ([`client::ClientNode`]) is wrapped by [`create_proxy`];
//! reading `$get` on any node yields a [`QueryAdapter`], reading a mutating
//! verb yields a [`MutationAdapter`]. Adapter calls derive a deterministic
//! cache key and a deferred operation that a [`FetchRuntime`] executes.
//! [`create_key_builder`] exposes the key derivation alone.

pub mod adapters;
pub mod client;
pub mod config;
pub mod error;
pub mod proxy;
pub mod runtime;
pub mod telemetry;

pub use adapters::{
    Body, KeyBuilder, MutationAdapter, MutationDescriptor, MutationRequest, ProxyConfig,
    QueryAdapter, QueryDescriptor, QueryRequest, RouteProxy, UnwrapTarget, create_key_builder,
    create_proxy,
};
pub use error::{BoxError, HttpError, ProxyError, QueryError};
pub use proxy::{Access, Interceptor, Leaf, Proxy};
pub use route_query_keys::{
    ArgsBag, KeyError, QueryKey, THENABLE_PROBE, Verb, derive_key, stable_stringify,
};
pub use runtime::{
    DirectRuntime, FetchRuntime, MutationExtras, MutationHandle, QueryExtras, QueryResult, Status,
};
