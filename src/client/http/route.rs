use std::collections::BTreeMap;
use std::sync::Arc;

use route_query_keys::Verb;
use serde_json::Value;
use url::Url;

use super::method::{HttpMethod, Transport};
use crate::client::{ArgsBag, ClientError, ClientNode, InputShape, Member};

/// Member name under which the `/` route of a segment is exposed.
const INDEX_SEGMENT: &str = "index";

/// Mutable route tree collected by the builder.
#[derive(Debug, Default)]
pub(super) struct RouteDraft {
    verbs: BTreeMap<Verb, InputShape>,
    children: BTreeMap<String, RouteDraft>,
}

impl RouteDraft {
    pub(super) fn insert(&mut self, path: &str, verb: Verb, shape: InputShape) {
        let mut current = self;
        for name in member_path(path) {
            current = current.children.entry(name).or_default();
        }
        current.verbs.insert(verb, shape);
    }

    /// Turn the draft into shared nodes. `names` are member names from the
    /// root; `template` are the URL path segments they map to.
    pub(super) fn freeze(
        self,
        base: &Url,
        transport: &Arc<Transport>,
        names: Vec<String>,
        template: Vec<String>,
    ) -> Arc<RouteNode> {
        let children = self
            .children
            .into_iter()
            .map(|(name, draft)| {
                let mut child_names = names.clone();
                child_names.push(name.clone());
                let mut child_template = template.clone();
                if name != INDEX_SEGMENT {
                    child_template.push(name.clone());
                }
                let child = draft.freeze(base, transport, child_names, child_template);
                (name, child)
            })
            .collect();

        let verbs = self
            .verbs
            .into_iter()
            .map(|(verb, shape)| {
                let method = Arc::new(HttpMethod::new(verb, shape, transport.clone()));
                (verb, method)
            })
            .collect();

        Arc::new(RouteNode {
            path: format!("/{}", names.join("/")),
            base: base.clone(),
            template,
            verbs,
            children,
        })
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// Member names leading from the client root to the route at `path`.
///
/// `/` maps to `["index"]`, `/params/:id` to `["params", ":id"]`.
pub fn member_path(path: &str) -> Vec<String> {
    let names = split_path(path);
    if names.is_empty() {
        return vec![INDEX_SEGMENT.to_string()];
    }
    names.into_iter().map(str::to_string).collect()
}

/// Immutable route node handed out to the interception layer.
pub(crate) struct RouteNode {
    path: String,
    base: Url,
    template: Vec<String>,
    verbs: BTreeMap<Verb, Arc<HttpMethod>>,
    children: BTreeMap<String, Arc<RouteNode>>,
}

impl ClientNode for RouteNode {
    fn path(&self) -> &str {
        &self.path
    }

    fn url(&self, args: Option<&ArgsBag>) -> Result<Url, ClientError> {
        let params = args.and_then(|bag| bag.get("param")).and_then(Value::as_object);
        let mut url = self.base.clone();

        if !self.template.is_empty() {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| ClientError::route(&self.path, "base URL cannot carry a path"))?;
            segments.pop_if_empty();
            for segment in &self.template {
                match param_name(segment).and_then(|name| params.and_then(|map| map.get(name))) {
                    Some(value) => segments.push(&scalar_text(value)),
                    None => segments.push(segment),
                };
            }
        }

        let query = args.and_then(|bag| bag.get("query")).and_then(Value::as_object);
        if let Some(query) = query.filter(|map| !map.is_empty()) {
            let mut entries: Vec<(&String, &Value)> = query.iter().collect();
            entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

            let mut pairs = url.query_pairs_mut();
            for (name, value) in entries {
                match value {
                    Value::Null => {}
                    Value::Array(items) => {
                        for item in items.iter().filter(|item| !item.is_null()) {
                            pairs.append_pair(name, &scalar_text(item));
                        }
                    }
                    other => {
                        pairs.append_pair(name, &scalar_text(other));
                    }
                }
            }
        }

        Ok(url)
    }

    fn member(&self, name: &str) -> Member {
        if let Some(method) = Verb::from_token(name).and_then(|verb| self.verbs.get(&verb)) {
            return Member::Function(method.clone());
        }
        match self.children.get(name) {
            Some(child) => Member::Node(child.clone()),
            None => Member::Absent,
        }
    }

    fn member_names(&self) -> Vec<String> {
        self.verbs
            .keys()
            .map(|verb| verb.token().to_string())
            .chain(self.children.keys().cloned())
            .collect()
    }
}

/// `:id`, `:id?` and `:id{[0-9]+}` all name the parameter `id`.
fn param_name(segment: &str) -> Option<&str> {
    let name = segment.strip_prefix(':')?;
    let name = name.split('{').next().unwrap_or(name);
    Some(name.trim_end_matches('?'))
}

pub(super) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
