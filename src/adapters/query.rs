use std::sync::Arc;

use futures::FutureExt;
use route_query_keys::derive_key;
use tracing::{debug, instrument};

use super::{ProxyConfig, UnwrapTarget, execute};
use crate::client::{ArgsBag, RequestOptions};
use crate::error::QueryError;
use crate::proxy::Leaf;
use crate::runtime::{FetchRuntime, QueryContext, QueryExtras, QueryFn, QueryOptions, QueryResult};

/// Arguments for one `$get` adapter call.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub params: Option<ArgsBag>,
    pub request_options: Option<RequestOptions>,
    pub unwrap_to: UnwrapTarget,
    pub extras: QueryExtras,
}

impl QueryRequest {
    #[must_use]
    pub fn new(unwrap_to: UnwrapTarget) -> Self {
        Self {
            params: None,
            request_options: None,
            unwrap_to,
            extras: QueryExtras::default(),
        }
    }

    #[must_use]
    pub fn params(mut self, params: ArgsBag) -> Self {
        self.params = Some(params);
        self
    }

    #[must_use]
    pub fn request_options(mut self, options: RequestOptions) -> Self {
        self.request_options = Some(options);
        self
    }

    #[must_use]
    pub fn extras(mut self, extras: QueryExtras) -> Self {
        self.extras = extras;
        self
    }
}

/// Adapter produced for `$get`.
#[derive(Debug, Clone)]
pub struct QueryAdapter {
    leaf: Leaf,
    config: Arc<ProxyConfig>,
}

impl QueryAdapter {
    pub(super) fn new(leaf: Leaf, config: Arc<ProxyConfig>) -> Self {
        Self { leaf, config }
    }

    #[must_use]
    pub fn leaf(&self) -> &Leaf {
        &self.leaf
    }

    /// Derive the key and deferred fetch for `request`.
    ///
    /// Misuse (undeclared verb, params the route cannot take) fails here,
    /// before anything is handed to a runtime.
    #[instrument(skip_all, fields(verb = %self.leaf.verb(), path = self.leaf.path()))]
    pub fn call(&self, request: QueryRequest) -> Result<QueryDescriptor, QueryError> {
        let QueryRequest {
            params,
            request_options,
            unwrap_to,
            extras,
        } = request;

        self.leaf.ensure_declared()?;
        self.leaf.validate_args(params.as_ref())?;

        let url = self.leaf.resolve_url(params.as_ref())?;
        let query_key = derive_key(self.leaf.verb(), url.as_str(), params.as_ref())?;
        debug!(key = %query_key, "derived query key");

        let leaf = self.leaf.clone();
        let config = self.config.clone();
        let query_fn: QueryFn = Arc::new(move |context: QueryContext| {
            let leaf = leaf.clone();
            let config = config.clone();
            let params = params.clone();
            let mut options = request_options.clone().unwrap_or_default();
            options.merge_signal(&context.signal);
            async move { execute(&leaf, &config, params, Some(options), unwrap_to).await }.boxed()
        });

        Ok(QueryDescriptor {
            query_options: QueryOptions::new(query_key, query_fn, extras),
        })
    }
}

/// Derived query options plus a lazy invoker.
#[derive(Debug, Clone)]
pub struct QueryDescriptor {
    pub query_options: QueryOptions,
}

impl QueryDescriptor {
    /// Run the query on `runtime` with the derived options.
    pub async fn use_query<R: FetchRuntime + ?Sized>(&self, runtime: &R) -> QueryResult {
        runtime.run_query(self.query_options.clone()).await
    }
}
