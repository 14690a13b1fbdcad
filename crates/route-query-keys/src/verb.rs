use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Property name probed by await-style orchestration to detect pending values.
pub const THENABLE_PROBE: &str = "then";

/// HTTP verb exposed by a route leaf.
///
/// Leaves are recognised only by a literal match of a member name against
/// [`Verb::token`]; nothing about a node's structure marks it as a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Get,
    Put,
    Post,
    Patch,
    Delete,
}

impl Verb {
    pub const ALL: [Verb; 5] = [Verb::Get, Verb::Put, Verb::Post, Verb::Patch, Verb::Delete];

    /// Literal member name used by route clients (`$get`, `$post`, ...).
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Verb::Get => "$get",
            Verb::Put => "$put",
            Verb::Post => "$post",
            Verb::Patch => "$patch",
            Verb::Delete => "$delete",
        }
    }

    #[must_use]
    pub const fn http_method(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Put => "PUT",
            Verb::Post => "POST",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        }
    }

    /// Every verb except `GET` is routed to the mutation adapter.
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        !matches!(self, Verb::Get)
    }

    /// Match a member name against the verb tokens. Exact, case-sensitive.
    #[must_use]
    pub fn from_token(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|verb| verb.token() == name)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown verb `{0}` (expected one of get, put, post, patch, delete)")]
pub struct ParseVerbError(pub String);

impl FromStr for Verb {
    type Err = ParseVerbError;

    /// Accepts `$get`, `get` or `GET`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(verb) = Self::from_token(s) {
            return Ok(verb);
        }
        Self::ALL
            .into_iter()
            .find(|verb| verb.http_method().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseVerbError(s.to_string()))
    }
}
