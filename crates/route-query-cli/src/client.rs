#![deny(clippy::all, clippy::pedantic)]

use std::sync::Arc;

use route_query::client::http::HttpClient;
use route_query::client::{ClientError, ClientNode};
use route_query::config::{LoadError, Settings};
use route_query::telemetry::TelemetryError;
use route_query::{
    KeyBuilder, ProxyConfig, ProxyError, QueryError, RouteProxy, create_key_builder, create_proxy,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] LoadError),
    #[error("logging setup failed: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("client error: {0}")]
    Client(#[from] ClientError),
    #[error("{0}")]
    Proxy(#[from] ProxyError),
    #[error("{0}")]
    Query(#[from] QueryError),
    #[error("request failed: {0}")]
    Request(Arc<QueryError>),
    #[error("failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to render output: {0}")]
    Output(String),
}

/// Everything a command needs: the raw route tree and both fronts over it.
#[derive(Clone)]
pub struct Ctx {
    pub root: Arc<dyn ClientNode>,
    pub proxy: RouteProxy,
    pub keys: KeyBuilder,
}

impl Ctx {
    pub fn new(client: &HttpClient, config: ProxyConfig) -> Self {
        let root = client.root();
        Self {
            proxy: create_proxy(root.clone(), config),
            keys: create_key_builder(root.clone()),
            root,
        }
    }
}

pub fn build_ctx(settings: &Settings) -> Result<Ctx, CliError> {
    let client = settings.build_client()?;
    tracing::debug!(
        base_url = %client.base_url(),
        routes = settings.routes.len(),
        "route client ready"
    );
    Ok(Ctx::new(&client, settings.proxy_config()))
}
