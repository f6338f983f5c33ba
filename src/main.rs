//! CheapChomp CLI entry point.

use chomp::cli::commands;
use chomp::cli::{Cli, Commands};
use chomp::error::Error;
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective JSON mode: --json OR non-TTY stdout
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    let db = cli.db.as_ref();
    let remote = cli.remote.as_ref();

    match &cli.command {
        Commands::Version => commands::version::execute(json),

        // Account
        Commands::Register {
            email,
            password,
            confirm,
        } => commands::account::register(email, password, confirm.as_deref(), remote, json),
        Commands::Login { email, password } => commands::account::login(email, password, remote, json),
        Commands::Logout => commands::account::logout(json),
        Commands::Whoami => commands::account::whoami(db, json),

        // Catalog
        Commands::Store {
            latitude,
            longitude,
        } => commands::catalog::store(*latitude, *longitude, db, remote, json),
        Commands::Search { term, no_cache } => {
            commands::catalog::search(term, *no_cache, db, remote, json)
        }

        // Grocery list
        Commands::List { offline } => commands::list::list(*offline, db, remote, json),
        Commands::Add {
            name,
            price,
            qty,
            store,
        } => commands::list::add(name, price, *qty, store.as_deref(), db, remote, json),
        Commands::Remove { name, store } => {
            commands::list::remove(name, store.as_deref(), db, remote, json)
        }
        Commands::Qty { item_id, quantity } => {
            commands::list::quantity(item_id, *quantity, db, remote, json)
        }
        Commands::Check { item_id } => commands::list::check(item_id, db, remote, json),
        Commands::Delete { item_id } => commands::list::delete(item_id, db, remote, json),
        Commands::Undo => commands::list::undo(db, remote, json),

        // Favorites & cache
        Commands::Fav { command } => commands::favorites::execute_fav(command, db, remote, json),
        Commands::Cache { command } => commands::favorites::execute_cache(command, db, remote, json),

        // Sync
        Commands::Sync { command } => commands::sync::execute(command, db, remote, json),
        Commands::Mode { mode } => commands::sync::mode(*mode, db, remote, json),

        Commands::Expenses => commands::expenses::execute(db, remote, json),

        // Shell completions
        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}
