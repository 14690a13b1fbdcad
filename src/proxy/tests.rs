use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use route_query_keys::Verb;
use serde_json::{Value, json};
use url::Url;

use super::*;
use crate::client::http::HttpResponse;

struct StubNode {
    path: String,
    members: BTreeMap<String, Member>,
}

impl StubNode {
    fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            members: BTreeMap::new(),
        }
    }

    fn with(mut self, name: &str, member: Member) -> Self {
        self.members.insert(name.to_string(), member);
        self
    }

    fn build(self) -> Arc<dyn ClientNode> {
        Arc::new(self)
    }
}

impl ClientNode for StubNode {
    fn path(&self) -> &str {
        &self.path
    }

    fn url(&self, _args: Option<&ArgsBag>) -> Result<Url, ClientError> {
        Ok(Url::parse(&format!("https://stub.test{}", self.path))?)
    }

    fn member(&self, name: &str) -> Member {
        self.members.get(name).cloned().unwrap_or(Member::Absent)
    }

    fn member_names(&self) -> Vec<String> {
        self.members.keys().cloned().collect()
    }
}

/// Echoes the receiver path so tests can observe the binding.
struct EchoReceiver(InputShape);

#[async_trait]
impl RequestFn for EchoReceiver {
    fn input_shape(&self) -> InputShape {
        self.0
    }

    async fn call(
        &self,
        receiver: &dyn ClientNode,
        _args: Option<ArgsBag>,
        _options: Option<RequestOptions>,
    ) -> Result<Box<dyn RawResponse>, ClientError> {
        Ok(Box::new(HttpResponse::from_parts(
            200,
            "OK",
            receiver.path().to_string(),
        )))
    }
}

/// Records which leaves were built.
#[derive(Clone)]
struct Recorder;

impl Interceptor for Recorder {
    type Query = Leaf;
    type Mutation = Leaf;

    fn query(&self, leaf: Leaf) -> Leaf {
        leaf
    }

    fn mutation(&self, leaf: Leaf) -> Leaf {
        leaf
    }
}

fn echo(shape: InputShape) -> Member {
    Member::Function(Arc::new(EchoReceiver(shape)))
}

fn tree() -> Proxy<Recorder> {
    let leaf = StubNode::new("/posts/:id")
        .with("$get", echo(InputShape::PARAM))
        .with("$delete", echo(InputShape::PARAM))
        .with("$url", echo(InputShape::PARAM | InputShape::QUERY))
        .with("version", Member::Value(json!(3)))
        .build();
    let posts = StubNode::new("/posts")
        .with("$get", echo(InputShape::QUERY))
        .with(":id", Member::Node(leaf))
        .build();
    let root = StubNode::new("/")
        .with("posts", Member::Node(posts))
        .with("name", Member::Value(json!("stub")))
        .build();
    Proxy::new(root, Recorder)
}

#[test]
fn get_token_yields_query_adapter() {
    let proxy = tree().at("posts").unwrap();
    match proxy.prop("$get") {
        Access::Query(leaf) => {
            assert_eq!(leaf.verb(), Verb::Get);
            assert_eq!(leaf.path(), "/posts");
            assert!(leaf.is_declared());
        }
        other => panic!("expected query adapter, got {}", other.kind()),
    }
}

#[test]
fn mutating_tokens_yield_mutation_adapters() {
    let proxy = tree().route(&["posts", ":id"]).unwrap();
    for verb in [Verb::Put, Verb::Post, Verb::Patch, Verb::Delete] {
        match proxy.verb(verb) {
            Access::Mutation(leaf) => assert_eq!(leaf.verb(), verb),
            other => panic!("{verb} produced {}", other.kind()),
        }
    }
}

#[test]
fn undeclared_verbs_still_produce_adapters() {
    let proxy = tree().route(&["posts", ":id"]).unwrap();
    let leaf = proxy.put();
    assert!(!leaf.is_declared());
    assert!(matches!(
        leaf.ensure_declared(),
        Err(ProxyError::UndeclaredVerb { verb: Verb::Put, .. })
    ));
}

#[test]
fn thenable_probe_is_absent_at_every_depth() {
    let root = tree();
    assert!(root.prop(THENABLE_PROBE).is_absent());
    assert!(root.at("posts").unwrap().prop("then").is_absent());
    assert!(
        root.route(&["posts", ":id"])
            .unwrap()
            .prop("then")
            .is_absent()
    );
}

#[test]
fn scalars_pass_through_unchanged() {
    let root = tree();
    assert!(matches!(root.prop("name"), Access::Value(Value::String(name)) if name == "stub"));
    let leaf = root.route(&["posts", ":id"]).unwrap();
    assert!(matches!(leaf.prop("version"), Access::Value(value) if value == json!(3)));
    assert!(root.prop("missing").is_absent());
}

#[test]
fn nested_nodes_are_rewrapped() {
    let root = tree();
    match root.prop("posts") {
        Access::Node(posts) => {
            assert_eq!(posts.path(), "/posts");
            assert!(matches!(posts.prop(":id"), Access::Node(_)));
        }
        other => panic!("expected node, got {}", other.kind()),
    }
}

#[test]
fn navigating_into_a_non_node_fails() {
    let err = tree().route(&["name", "deeper"]).unwrap_err();
    assert!(matches!(err, ProxyError::NotARoute { name, .. } if name == "name"));
}

#[tokio::test]
async fn non_verb_functions_keep_their_receiver() {
    let leaf = tree().route(&["posts", ":id"]).unwrap();
    let Access::Function(bound) = leaf.prop("$url") else {
        panic!("expected a bound function");
    };
    assert_eq!(bound.input_shape(), InputShape::PARAM | InputShape::QUERY);

    let response = bound.call(None, None).await.unwrap();
    assert_eq!(response.text().await.unwrap(), "/posts/:id");
}

#[tokio::test]
async fn leaf_invocation_uses_the_owning_node() {
    let proxy = tree().route(&["posts", ":id"]).unwrap();
    let leaf = proxy.delete();
    let response = leaf.invoke(None, None).await.unwrap();
    assert_eq!(response.text().await.unwrap(), "/posts/:id");
}

#[test]
fn args_are_checked_against_the_declared_shape() {
    let proxy = tree().route(&["posts", ":id"]).unwrap();
    let leaf = proxy.get();

    let ok: ArgsBag = serde_json::from_value(json!({"param": {"id": "1"}})).unwrap();
    assert!(leaf.validate_args(Some(&ok)).is_ok());
    assert!(leaf.validate_args(Some(&ArgsBag::new())).is_ok());

    let unsupported: ArgsBag = serde_json::from_value(json!({"json": {"a": 1}})).unwrap();
    assert!(matches!(
        leaf.validate_args(Some(&unsupported)),
        Err(ProxyError::UnsupportedPart { part, .. }) if part == "json"
    ));

    let scalar: ArgsBag = serde_json::from_value(json!({"param": "1"})).unwrap();
    assert!(matches!(
        leaf.validate_args(Some(&scalar)),
        Err(ProxyError::PartNotObject { part: "param", .. })
    ));
}

#[test]
fn params_on_a_parameterless_leaf_are_rejected() {
    let root = StubNode::new("/")
        .with("$get", echo(InputShape::NONE))
        .build();
    let leaf = Proxy::new(root, Recorder).get();
    let args: ArgsBag = serde_json::from_value(json!({"query": {"a": 1}})).unwrap();
    assert!(matches!(
        leaf.validate_args(Some(&args)),
        Err(ProxyError::UnexpectedParams { .. })
    ));
}
