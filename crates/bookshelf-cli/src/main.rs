//! Bookshelf CLI - library circulation tracker.

mod cli;
mod commands;
mod server;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use cli::{Cli, Commands, ConfigCommand};
use commands::Context;

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "bookshelf=debug,bookshelf_cli=debug,tower_http=debug"
    } else {
        "bookshelf=info,bookshelf_cli=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = Context::load(&cli).and_then(|ctx| match cli.command {
        Commands::Status {
            table,
            page,
            on_loan,
            recent,
            newest,
            json,
        } => commands::status::run(&ctx, table, page, (on_loan, recent, newest), json),

        Commands::Search {
            query,
            table,
            page,
            json,
        } => commands::status::search(&ctx, table, &query, page, json),

        Commands::Sort {
            column,
            table,
            descending,
            page,
            json,
        } => commands::status::sort(&ctx, table, &column, descending, page, json),

        Commands::History { code, json } => commands::history::run(&ctx, &code, json),

        Commands::Link { code } => commands::link::run(&ctx, &code),

        Commands::AddLink => commands::link::add_book(&ctx),

        Commands::Sync { dry_run } => commands::sync::run(&ctx, dry_run),

        Commands::TestConnection => commands::sync::test_connection(&ctx),

        Commands::Watch { interval, once } => commands::watch::run(&ctx, interval, once),

        Commands::Config { command } => match command {
            ConfigCommand::Show { json } => commands::config::show(&ctx, json),
            ConfigCommand::Set { key, value } => commands::config::set(&ctx, &key, &value),
            ConfigCommand::Path => commands::config::path(&ctx),
        },

        Commands::Serve { port } => commands::serve::run(&ctx, port),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
