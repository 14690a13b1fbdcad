use route_query_keys::{QueryKey, Verb, derive_key};
use tracing::debug;

use crate::client::ArgsBag;
use crate::error::QueryError;
use crate::proxy::{Interceptor, Leaf};

/// Interceptor for the pure key-builder front.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyFront;

impl Interceptor for KeyFront {
    type Query = KeyFn;
    type Mutation = KeyFn;

    fn query(&self, leaf: Leaf) -> KeyFn {
        KeyFn { leaf }
    }

    fn mutation(&self, leaf: Leaf) -> KeyFn {
        KeyFn { leaf }
    }
}

/// Derives the cache key a verb member would use, without any I/O.
#[derive(Debug, Clone)]
pub struct KeyFn {
    leaf: Leaf,
}

impl KeyFn {
    #[must_use]
    pub fn verb(&self) -> Verb {
        self.leaf.verb()
    }

    /// `[verb, url, args?]`, with `args` folded in for every verb.
    pub fn call(&self, args: Option<&ArgsBag>) -> Result<QueryKey, QueryError> {
        let url = self.leaf.resolve_url(args)?;
        let key = derive_key(self.leaf.verb(), url.as_str(), args)?;
        debug!(key = %key, "built key");
        Ok(key)
    }
}
