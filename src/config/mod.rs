//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{path::Path, str::FromStr, time::Duration};

use clap::{Args, builder::BoolishValueParser};
use config::{Config, Environment, File};
use route_query_keys::Verb;
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::adapters::ProxyConfig;
use crate::client::http::HttpClient;
use crate::client::{ClientError, InputPart, InputShape};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "route-query";
const ENV_PREFIX: &str = "ROUTE_QUERY";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Command-line overrides applied on top of file and environment sources.
#[derive(Debug, Args, Default, Clone)]
pub struct ConfigOverrides {
    /// Override the base URL every route is resolved against.
    #[arg(long = "base-url", value_name = "URL")]
    pub base_url: Option<String>,

    /// Override the request timeout in milliseconds.
    #[arg(long = "timeout-ms", value_name = "MILLIS")]
    pub timeout_ms: Option<u64>,

    /// Override the User-Agent header.
    #[arg(long = "user-agent", value_name = "AGENT")]
    pub user_agent: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Return unsuccessful responses as data instead of failing.
    #[arg(long = "no-throw-on-http-error", action = clap::ArgAction::SetTrue)]
    pub no_throw_on_http_error: bool,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client: ClientSettings,
    pub proxy: ProxySettings,
    pub logging: LoggingSettings,
    pub routes: Vec<RouteSettings>,
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: Url,
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct ProxySettings {
    pub throw_on_http_error: bool,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// One declared route: verb, path template and accepted input parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSettings {
    pub verb: Verb,
    pub path: String,
    pub accepts: InputShape,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(config_file: Option<&Path>, overrides: &ConfigOverrides) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = config_file {
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(overrides);

    Settings::from_raw(raw)
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            client,
            proxy,
            logging,
            routes,
        } = raw;

        let client = build_client_settings(client)?;
        let proxy = ProxySettings {
            throw_on_http_error: proxy.throw_on_http_error.unwrap_or(true),
        };
        let logging = build_logging_settings(logging)?;
        let routes = routes
            .into_iter()
            .map(build_route_settings)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            client,
            proxy,
            logging,
            routes,
        })
    }

    /// Build the HTTP route client described by these settings.
    pub fn build_client(&self) -> Result<HttpClient, ClientError> {
        let mut builder =
            HttpClient::builder(self.client.base_url.as_str())?.timeout(self.client.timeout);
        if let Some(agent) = self.client.user_agent.as_ref() {
            builder = builder.user_agent(agent.clone());
        }
        for route in &self.routes {
            builder = builder.route(route.verb, &route.path, route.accepts);
        }
        builder.build()
    }

    #[must_use]
    pub fn proxy_config(&self) -> ProxyConfig {
        ProxyConfig::new().throw_on_http_error(self.proxy.throw_on_http_error)
    }
}

fn build_client_settings(client: RawClientSettings) -> Result<ClientSettings, LoadError> {
    let raw_url = client
        .base_url
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| LoadError::invalid("client.base_url", "is required"))?;
    let base_url = Url::parse(&raw_url)
        .map_err(|err| LoadError::invalid("client.base_url", format!("failed to parse: {err}")))?;
    if base_url.cannot_be_a_base() {
        return Err(LoadError::invalid(
            "client.base_url",
            "must be a hierarchical URL",
        ));
    }

    let timeout_ms = client.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(LoadError::invalid(
            "client.timeout_ms",
            "must be greater than zero",
        ));
    }

    let user_agent = client.user_agent.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    Ok(ClientSettings {
        base_url,
        timeout: Duration::from_millis(timeout_ms),
        user_agent,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_route_settings(route: RawRouteSettings) -> Result<RouteSettings, LoadError> {
    let verb = Verb::from_str(&route.method)
        .map_err(|err| LoadError::invalid("routes.method", err.to_string()))?;

    if !route.path.starts_with('/') {
        return Err(LoadError::invalid(
            "routes.path",
            format!("`{}` must start with `/`", route.path),
        ));
    }

    let accepts = route
        .accepts
        .iter()
        .map(|name| {
            InputPart::from_name(name).ok_or_else(|| {
                LoadError::invalid("routes.accepts", format!("unknown input part `{name}`"))
            })
        })
        .collect::<Result<InputShape, _>>()?;

    Ok(RouteSettings {
        verb,
        path: route.path,
        accepts,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    client: RawClientSettings,
    proxy: RawProxySettings,
    logging: RawLoggingSettings,
    routes: Vec<RawRouteSettings>,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(url) = overrides.base_url.as_ref() {
            self.client.base_url = Some(url.clone());
        }
        if let Some(timeout) = overrides.timeout_ms {
            self.client.timeout_ms = Some(timeout);
        }
        if let Some(agent) = overrides.user_agent.as_ref() {
            self.client.user_agent = Some(agent.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if overrides.no_throw_on_http_error {
            self.proxy.throw_on_http_error = Some(false);
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawClientSettings {
    base_url: Option<String>,
    timeout_ms: Option<u64>,
    user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawProxySettings {
    throw_on_http_error: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawRouteSettings {
    method: String,
    path: String,
    #[serde(default)]
    accepts: Vec<String>,
}

#[cfg(test)]
mod tests;
