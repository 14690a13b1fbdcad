use std::sync::Arc;

use futures::FutureExt;
use route_query_keys::derive_key;
use tracing::{debug, instrument};

use super::{ProxyConfig, UnwrapTarget, execute};
use crate::client::{ArgsBag, RequestOptions};
use crate::error::QueryError;
use crate::proxy::Leaf;
use crate::runtime::{FetchRuntime, MutationExtras, MutationFn, MutationHandle, MutationOptions};

/// Arguments for one mutating-verb adapter call.
#[derive(Debug, Clone)]
pub struct MutationRequest {
    pub unwrap_to: UnwrapTarget,
    pub extras: MutationExtras,
}

impl MutationRequest {
    #[must_use]
    pub fn new(unwrap_to: UnwrapTarget) -> Self {
        Self {
            unwrap_to,
            extras: MutationExtras::default(),
        }
    }

    #[must_use]
    pub fn extras(mut self, extras: MutationExtras) -> Self {
        self.extras = extras;
        self
    }
}

/// Adapter produced for `$put`, `$post`, `$patch` and `$delete`.
#[derive(Debug, Clone)]
pub struct MutationAdapter {
    leaf: Leaf,
    config: Arc<ProxyConfig>,
}

impl MutationAdapter {
    pub(super) fn new(leaf: Leaf, config: Arc<ProxyConfig>) -> Self {
        Self { leaf, config }
    }

    #[must_use]
    pub fn leaf(&self) -> &Leaf {
        &self.leaf
    }

    /// Derive the mutation key and deferred operation.
    ///
    /// The key is verb and URL only; variables arrive per invocation and
    /// are checked against the route's declared shape at that point.
    #[instrument(skip_all, fields(verb = %self.leaf.verb(), path = self.leaf.path()))]
    pub fn call(&self, request: MutationRequest) -> Result<MutationDescriptor, QueryError> {
        let MutationRequest { unwrap_to, extras } = request;

        self.leaf.ensure_declared()?;
        let url = self.leaf.resolve_url(None)?;
        let mutation_key = derive_key(self.leaf.verb(), url.as_str(), None)?;
        debug!(key = %mutation_key, "derived mutation key");

        let leaf = self.leaf.clone();
        let config = self.config.clone();
        let mutation_fn: MutationFn = Arc::new(move |variables: Option<ArgsBag>, signal| {
            let leaf = leaf.clone();
            let config = config.clone();
            let options = RequestOptions::new().with_signal(signal);
            async move {
                leaf.validate_args(variables.as_ref())?;
                execute(&leaf, &config, variables, Some(options), unwrap_to).await
            }
            .boxed()
        });

        Ok(MutationDescriptor {
            mutation_options: MutationOptions::new(mutation_key, mutation_fn, extras),
        })
    }
}

/// Derived mutation options plus a lazy invoker.
#[derive(Debug, Clone)]
pub struct MutationDescriptor {
    pub mutation_options: MutationOptions,
}

impl MutationDescriptor {
    /// Bind the derived options to `runtime` as a mutation handle.
    pub fn use_mutation<'r, R: FetchRuntime + ?Sized>(
        &self,
        runtime: &'r R,
    ) -> MutationHandle<'r, R> {
        MutationHandle::new(runtime, self.mutation_options.clone())
    }
}
