//! Front-ends built on the interception layer.
//!
//! [`create_proxy`] yields the options-builder front: `$get` produces a
//! [`QueryAdapter`], mutating verbs produce a [`MutationAdapter`], and each
//! adapter call returns a descriptor with the derived options plus a lazy
//! invoker. [`create_key_builder`] yields the pure key front.

mod keys;
mod mutation;
mod policy;
mod query;

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};

use crate::client::{ArgsBag, ClientNode, RequestOptions};
use crate::error::QueryError;
use crate::proxy::{Interceptor, Leaf, Proxy};

pub use keys::{KeyFn, KeyFront};
pub use mutation::{MutationAdapter, MutationDescriptor, MutationRequest};
pub use policy::{
    Body, HttpErrorFactory, ParseUnwrapTargetError, ProxyConfig, UnwrapTarget,
    apply_http_policy, default_http_error, unwrap_body,
};
pub use query::{QueryAdapter, QueryDescriptor, QueryRequest};

pub(crate) const METRIC_REQUESTS: &str = "route_query_requests_total";
pub(crate) const METRIC_HTTP_ERRORS: &str = "route_query_http_errors_total";

/// Proxy whose verb members are query and mutation adapters.
pub type RouteProxy = Proxy<AdapterFront>;

/// Proxy whose verb members only derive cache keys.
pub type KeyBuilder = Proxy<KeyFront>;

/// Interceptor for the options-builder front.
#[derive(Debug, Clone)]
pub struct AdapterFront {
    config: Arc<ProxyConfig>,
}

impl AdapterFront {
    #[must_use]
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

impl Interceptor for AdapterFront {
    type Query = QueryAdapter;
    type Mutation = MutationAdapter;

    fn query(&self, leaf: Leaf) -> QueryAdapter {
        QueryAdapter::new(leaf, self.config.clone())
    }

    fn mutation(&self, leaf: Leaf) -> MutationAdapter {
        MutationAdapter::new(leaf, self.config.clone())
    }
}

/// Wrap a route client so verb members become adapters.
pub fn create_proxy(root: Arc<dyn ClientNode>, config: ProxyConfig) -> RouteProxy {
    Proxy::new(root, AdapterFront::new(config))
}

/// Wrap a route client so verb members only derive cache keys.
pub fn create_key_builder(root: Arc<dyn ClientNode>) -> KeyBuilder {
    Proxy::new(root, KeyFront)
}

/// Invoke, apply the HTTP policy, unwrap. Shared by query and mutation fns.
async fn execute(
    leaf: &Leaf,
    config: &ProxyConfig,
    args: Option<ArgsBag>,
    options: Option<RequestOptions>,
    unwrap_to: UnwrapTarget,
) -> Result<Body, QueryError> {
    let verb = leaf.verb().token();
    counter!(METRIC_REQUESTS, "verb" => verb).increment(1);

    let response = leaf.invoke(args, options).await?;
    debug!(
        verb,
        path = leaf.path(),
        status = response.status(),
        "request completed"
    );

    let response = apply_http_policy(response, config).inspect_err(|err| {
        counter!(METRIC_HTTP_ERRORS, "verb" => verb).increment(1);
        warn!(verb, path = leaf.path(), error = %err, "unsuccessful response");
    })?;

    Ok(unwrap_body(response.as_ref(), unwrap_to).await?)
}
