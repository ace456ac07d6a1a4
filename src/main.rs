mod cli;
mod commands;

use std::io::IsTerminal;

use clap::Parser;
use cli::Cli;
use templ::config::StoreConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level comes from `--debug`, then `RUST_LOG`, then defaults to warnings.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("templ=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("templ=warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    tracing::debug!("templ starting with args: {cli:?}");

    let store = StoreConfig::from_env()?;
    store.ensure_exists()?;

    // Piped input is the template; arguments are NAME=VALUE pairs. An empty
    // stdin (non-interactive shells, CI) falls through to normal handling.
    if !std::io::stdin().is_terminal() {
        if let Some(input) = commands::pipe::read_stdin()? {
            return commands::pipe::run(&input, &cli.templates, cli.variables);
        }
    }

    if cli.list {
        commands::list::run(&store)?;
    }

    if let Some(origin) = &cli.fetch {
        commands::fetch::run(&store, origin)?;
    }

    if cli.update {
        commands::update::run(&store)?;
    }

    if cli.variables {
        return commands::variables::run(&store, &cli.templates);
    }

    if cli.templates.is_empty() {
        if !(cli.list || cli.update || cli.fetch.is_some()) {
            commands::render::print_hint();
        }
        return Ok(());
    }

    commands::render::run(&store, &cli.templates)
}
