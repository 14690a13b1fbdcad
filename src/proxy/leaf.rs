use std::fmt;
use std::sync::Arc;

use route_query_keys::Verb;
use serde_json::Value;
use url::Url;

use crate::client::{
    ArgsBag, ClientError, ClientNode, InputPart, InputShape, RawResponse, RequestFn,
    RequestOptions,
};
use crate::error::ProxyError;

/// A verb member bound to the node it was read from.
///
/// The callable is optional: reading `$post` on a node that never declared
/// it still yields a leaf, and the omission surfaces as
/// [`ProxyError::UndeclaredVerb`] once the leaf is used.
#[derive(Clone)]
pub struct Leaf {
    verb: Verb,
    node: Arc<dyn ClientNode>,
    method: Option<Arc<dyn RequestFn>>,
}

impl Leaf {
    pub(crate) fn new(
        verb: Verb,
        node: Arc<dyn ClientNode>,
        method: Option<Arc<dyn RequestFn>>,
    ) -> Self {
        Self { verb, node, method }
    }

    #[must_use]
    pub fn verb(&self) -> Verb {
        self.verb
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.node.path()
    }

    #[must_use]
    pub fn is_declared(&self) -> bool {
        self.method.is_some()
    }

    /// Parts the underlying callable accepts; empty when undeclared.
    #[must_use]
    pub fn input_shape(&self) -> InputShape {
        self.method
            .as_ref()
            .map_or(InputShape::NONE, |method| method.input_shape())
    }

    pub fn resolve_url(&self, params: Option<&ArgsBag>) -> Result<Url, ClientError> {
        self.node.url(params)
    }

    pub fn ensure_declared(&self) -> Result<&Arc<dyn RequestFn>, ProxyError> {
        self.method.as_ref().ok_or_else(|| ProxyError::UndeclaredVerb {
            path: self.path().to_string(),
            verb: self.verb,
        })
    }

    /// Reject argument bags the declared shape cannot carry.
    ///
    /// An empty or missing bag is always accepted. Every part other than
    /// `json` must be an object.
    pub fn validate_args(&self, args: Option<&ArgsBag>) -> Result<(), ProxyError> {
        let Some(args) = args.filter(|bag| !bag.is_empty()) else {
            return Ok(());
        };

        let shape = self.input_shape();
        if shape.is_empty() {
            return Err(ProxyError::UnexpectedParams {
                path: self.path().to_string(),
                verb: self.verb,
            });
        }

        for (name, value) in args {
            let part = InputPart::from_name(name)
                .filter(|part| shape.accepts(*part))
                .ok_or_else(|| ProxyError::UnsupportedPart {
                    path: self.path().to_string(),
                    verb: self.verb,
                    part: name.clone(),
                })?;
            if part != InputPart::Json && !matches!(value, Value::Object(_)) {
                return Err(ProxyError::PartNotObject {
                    path: self.path().to_string(),
                    part: part.as_str(),
                });
            }
        }
        Ok(())
    }

    /// Call the bound callable with its owning node as receiver.
    pub async fn invoke(
        &self,
        args: Option<ArgsBag>,
        options: Option<RequestOptions>,
    ) -> Result<Box<dyn RawResponse>, crate::QueryError> {
        let method = self.ensure_declared()?;
        Ok(method.call(self.node.as_ref(), args, options).await?)
    }
}

impl fmt::Debug for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Leaf")
            .field("verb", &self.verb)
            .field("path", &self.path())
            .field("shape", &self.input_shape())
            .finish()
    }
}
