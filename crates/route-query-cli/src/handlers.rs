#![deny(clippy::all, clippy::pedantic)]

use std::sync::Arc;

use route_query::client::http::member_path;
use route_query::client::{ClientNode, InputPart, Member};
use route_query::{Access, DirectRuntime, MutationRequest, QueryRequest, Verb};
use serde_json::{Value, json};

use crate::args::{FetchArgs, KeyArgs, MutateArgs};
use crate::client::{CliError, Ctx};
use crate::io::{read_bag, request_options};

/// Every declared route as `{method, path, accepts}`.
pub fn routes(ctx: &Ctx) -> Value {
    let mut found = Vec::new();
    collect_routes(&ctx.root, &mut Vec::new(), &mut found);
    Value::Array(found)
}

fn collect_routes(node: &Arc<dyn ClientNode>, names: &mut Vec<String>, found: &mut Vec<Value>) {
    for name in node.member_names() {
        match node.member(&name) {
            Member::Function(function) => {
                if let Some(verb) = Verb::from_token(&name) {
                    let accepts: Vec<&str> =
                        function.input_shape().parts().map(InputPart::as_str).collect();
                    found.push(json!({
                        "method": verb.http_method(),
                        "path": template_path(names),
                        "accepts": accepts,
                    }));
                }
            }
            Member::Node(child) => {
                names.push(name);
                collect_routes(&child, names, found);
                names.pop();
            }
            Member::Absent | Member::Value(_) => {}
        }
    }
}

fn template_path(names: &[String]) -> String {
    let segments: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| *name != "index")
        .collect();
    format!("/{}", segments.join("/"))
}

pub fn key(ctx: &Ctx, args: KeyArgs) -> Result<Value, CliError> {
    let bag = read_bag(args.input)?;
    let node = ctx.keys.route(&member_path(&args.path))?;
    let key_fn = match node.verb(args.verb) {
        Access::Query(key_fn) | Access::Mutation(key_fn) => key_fn,
        other => {
            return Err(CliError::InvalidInput(format!(
                "`{}` on {} resolved to {}",
                args.verb,
                args.path,
                other.kind()
            )));
        }
    };
    let key = key_fn.call(bag.as_ref())?;
    Ok(json!(key))
}

pub async fn fetch(ctx: &Ctx, args: FetchArgs) -> Result<Value, CliError> {
    let bag = read_bag(args.input)?;
    let node = ctx.proxy.route(&member_path(&args.path))?;

    let mut request = QueryRequest::new(args.unwrap);
    if let Some(bag) = bag {
        request = request.params(bag);
    }
    if let Some(options) = request_options(&args.headers)? {
        request = request.request_options(options);
    }

    let descriptor = node.get().call(request)?;
    let result = descriptor.use_query(&DirectRuntime::new()).await;
    if let Some(err) = result.error {
        return Err(CliError::Request(err));
    }

    Ok(json!({
        "key": descriptor.query_options.query_key(),
        "data": result.data,
    }))
}

pub async fn mutate(ctx: &Ctx, args: MutateArgs) -> Result<Value, CliError> {
    if !args.verb.is_mutation() {
        return Err(CliError::InvalidInput(format!(
            "`{}` is not a mutating verb; use `fetch` instead",
            args.verb
        )));
    }

    let bag = read_bag(args.input)?;
    let node = ctx.proxy.route(&member_path(&args.path))?;
    let Access::Mutation(adapter) = node.verb(args.verb) else {
        return Err(CliError::InvalidInput(format!(
            "`{}` on {} is not a mutation",
            args.verb, args.path
        )));
    };

    let descriptor = adapter.call(MutationRequest::new(args.unwrap))?;
    let runtime = DirectRuntime::new();
    let handle = descriptor.use_mutation(&runtime);
    let data = handle.mutate(bag).await.map_err(CliError::Request)?;

    Ok(json!({
        "key": descriptor.mutation_options.mutation_key(),
        "data": data,
    }))
}
