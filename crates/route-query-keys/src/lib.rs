//! Cache key derivation for route-query.
//!
//! This crate is the leaf of the workspace: it knows nothing about HTTP,
//! route trees or fetch runtimes. It provides
//!
//! - [`Verb`]: the fixed set of verb tokens (`$get`, `$put`, ...),
//! - [`stable_stringify`]: JSON text that does not depend on object key order,
//! - [`derive_key`]: the `[verb, url, args?]` key shape shared by every front-end.

#![deny(clippy::all, clippy::pedantic)]

mod error;
mod key;
mod stable;
mod verb;

pub use error::KeyError;
pub use key::{QueryKey, derive_key};
pub use stable::{Sorted, stable_stringify, stable_stringify_serialize};
pub use verb::{ParseVerbError, THENABLE_PROBE, Verb};

/// Request argument bag: a JSON object whose top-level keys name the
/// request parts (`param`, `query`, `json`, ...).
pub type ArgsBag = serde_json::Map<String, serde_json::Value>;
