//! route-query: derive cache keys and call declared routes from the shell.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod client;
mod handlers;
mod io;
mod print;


use clap::Parser;
use route_query::{config, telemetry};

use args::{Cli, Commands};
use client::{CliError, build_ctx};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let settings = config::load(cli.config_file.as_deref(), &cli.overrides)?;
    telemetry::init(&settings.logging)?;
    let ctx = build_ctx(&settings)?;

    let output = match cli.command {
        Commands::Routes => handlers::routes(&ctx),
        Commands::Key(args) => handlers::key(&ctx, args)?,
        Commands::Fetch(args) => handlers::fetch(&ctx, args).await?,
        Commands::Mutate(args) => handlers::mutate(&ctx, args).await?,
    };
    print::print_json(&output)
}
