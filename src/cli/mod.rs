//! CLI definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;
mod context;

pub use context::CommandContext;

/// CheapChomp - grocery prices and an offline-first grocery list
#[derive(Parser, Debug)]
#[command(name = "chomp", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Cache database path (default: ~/.cheapchomp/data/cache.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Remote store path (default: ~/.cheapchomp/data/remote.db)
    #[arg(long, global = true)]
    pub remote: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print version information
    Version,

    // Account
    /// Create an account and sign in
    Register {
        email: String,

        /// Password (at least 6 characters)
        #[arg(long, env = "CHOMP_PASSWORD", hide_env_values = true)]
        password: String,

        /// Password confirmation (defaults to --password)
        #[arg(long)]
        confirm: Option<String>,
    },

    /// Sign in
    Login {
        email: String,

        #[arg(long, env = "CHOMP_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in account
    Whoami,

    // Catalog
    /// Select the store nearest to a location
    #[command(allow_negative_numbers = true)]
    Store {
        latitude: f64,
        longitude: f64,
    },

    /// Search the selected store's catalog
    Search {
        term: String,

        /// Do not remember results for offline browsing
        #[arg(long)]
        no_cache: bool,
    },

    // Grocery list
    /// Show the grocery list and its total
    List {
        /// Read from the local cache regardless of mode
        #[arg(long)]
        offline: bool,
    },

    /// Add a product to the grocery list
    Add {
        name: String,
        price: String,

        /// How many to add
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        qty: u32,

        /// Store id (default: selected store)
        #[arg(long)]
        store: Option<String>,
    },

    /// Take a product off the grocery list
    Remove {
        name: String,

        /// Store id (default: selected store)
        #[arg(long)]
        store: Option<String>,
    },

    /// Change an item's quantity (0 deletes it)
    Qty {
        /// Item id from `chomp list`
        item_id: String,
        quantity: u32,
    },

    /// Check an item off and record it as an expense
    Check {
        /// Item id from `chomp list`
        item_id: String,
    },

    /// Delete an item by id (can be undone)
    Delete {
        /// Item id from `chomp list`
        item_id: String,
    },

    /// Undo the last delete or quantity change
    Undo,

    // Favorites & cache
    /// Favorite products
    Fav {
        #[command(subcommand)]
        command: FavCommands,
    },

    /// Cached products
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    // Sync
    /// Push offline changes to the remote store
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },

    /// Switch between online and offline mode
    Mode {
        #[arg(value_enum)]
        mode: ModeArg,
    },

    /// Show monthly expenses
    Expenses,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    Online,
    Offline,
}

// ============================================================================
// Favorites & Cache Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum FavCommands {
    /// Mark a product as favorite
    Add {
        name: String,
        price: String,

        /// Store id (default: selected store)
        #[arg(long)]
        store: Option<String>,
    },

    /// Clear a favorite
    Remove { name: String },

    /// List favorites
    List,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// List every cached product
    List,

    /// Drop cached products that are neither favorites nor listed
    Clear,
}

// ============================================================================
// Sync Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum SyncCommands {
    /// Run one reconciliation pass
    Run,

    /// Show pending changes
    Status,

    /// Keep syncing in the background until interrupted
    Watch {
        /// Stop once nothing is pending
        #[arg(long)]
        until_idle: bool,

        /// Skip the network probe and assume online
        #[arg(long)]
        assume_online: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_store_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from(["chomp", "store", "39.10", "-84.51"]).unwrap();
        match cli.command {
            Commands::Store { latitude, longitude } => {
                assert!((latitude - 39.10).abs() < 1e-9);
                assert!((longitude + 84.51).abs() < 1e-9);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_add_rejects_zero_quantity() {
        assert!(Cli::try_parse_from(["chomp", "add", "Milk", "3.49", "--qty", "0"]).is_err());
        let cli = Cli::try_parse_from(["chomp", "add", "Milk", "3.49", "--qty", "2"]).unwrap();
        assert!(matches!(cli.command, Commands::Add { qty: 2, .. }));
    }
}
