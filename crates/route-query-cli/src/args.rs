//! Command-line surface for `route-query`.

#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use route_query::config::ConfigOverrides;
use route_query::{UnwrapTarget, Verb};

#[derive(Parser, Debug)]
#[command(
    name = "route-query",
    version,
    about = "Derive cache keys and call declared routes",
    long_about = None
)]
pub struct Cli {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "ROUTE_QUERY_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List declared routes with their accepted input parts
    Routes,
    /// Derive the cache key for a verb and route without sending anything
    Key(KeyArgs),
    /// Run a GET through the query adapter
    Fetch(FetchArgs),
    /// Run a PUT/POST/PATCH/DELETE through the mutation adapter
    Mutate(MutateArgs),
}

/// Argument bag supplied inline or from a file.
#[derive(Args, Debug, Default, Clone)]
pub struct BagInput {
    /// JSON object with `param`, `query`, `json`, `form`, `header` or `cookie` parts
    #[arg(long = "args", value_name = "JSON")]
    pub args: Option<String>,

    /// Read the argument bag from a file (takes precedence over --args)
    #[arg(long = "args-file", value_name = "PATH")]
    pub args_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Verb token or method name, e.g. `$get` or `GET`
    pub verb: Verb,

    /// Route path template, e.g. `/params/:id`
    pub path: String,

    #[command(flatten)]
    pub input: BagInput,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Route path template, e.g. `/posts/:id`
    pub path: String,

    #[command(flatten)]
    pub input: BagInput,

    /// Body format: json, text, blob, formData or arrayBuffer
    #[arg(long, default_value = "json")]
    pub unwrap: UnwrapTarget,

    /// Extra request header, repeatable
    #[arg(long = "header", value_name = "NAME:VALUE")]
    pub headers: Vec<String>,
}

#[derive(Args, Debug)]
pub struct MutateArgs {
    /// Mutating verb token or method name, e.g. `$post` or `POST`
    pub verb: Verb,

    /// Route path template, e.g. `/params/:id`
    pub path: String,

    #[command(flatten)]
    pub input: BagInput,

    /// Body format: json, text, blob, formData or arrayBuffer
    #[arg(long, default_value = "json")]
    pub unwrap: UnwrapTarget,
}
