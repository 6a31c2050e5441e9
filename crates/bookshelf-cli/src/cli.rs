//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bookshelf::TableId;

/// Bookshelf: library circulation tracker
#[derive(Parser)]
#[command(name = "bookshelf")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file (default: the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Sheet API and notification backend URL (overrides the settings file)
    #[arg(long, global = true, env = "BOOKSHELF_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Directory holding books.csv and library.csv (overrides the settings file)
    #[arg(long, global = true, env = "BOOKSHELF_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a page of the catalog or the loan log
    Status {
        /// Table to show (catalog or loans)
        #[arg(short, long, default_value = "catalog")]
        table: TableId,

        /// Page to show
        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Only books currently on loan
        #[arg(long)]
        on_loan: bool,

        /// Only books registered in the last 30 days
        #[arg(long)]
        recent: bool,

        /// Newest catalog rows first
        #[arg(long)]
        newest: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search a table (case-insensitive, any cell)
    Search {
        /// Text to look for
        #[arg(value_name = "QUERY")]
        query: String,

        /// Table to search (catalog or loans)
        #[arg(short, long, default_value = "catalog")]
        table: TableId,

        /// Page of the results to show
        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sort a table by a column
    Sort {
        /// Column header or zero-based index
        #[arg(value_name = "COLUMN")]
        column: String,

        /// Table to sort (catalog or loans)
        #[arg(short, long, default_value = "catalog")]
        table: TableId,

        /// Sort descending
        #[arg(short, long)]
        descending: bool,

        /// Page to show
        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show every loan log entry for a book
    History {
        /// Book code
        #[arg(value_name = "CODE")]
        code: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the pre-filled intake form link for a book
    Link {
        /// Book code
        #[arg(value_name = "CODE")]
        code: String,
    },

    /// Print the link for registering a new book
    AddLink,

    /// Publish the status report to the wiki page
    Sync {
        /// Print the report without sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// Check that the notification backend answers
    TestConnection,

    /// Reload and sync periodically
    Watch {
        /// Interval in milliseconds (default: sync_interval_ms from settings)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Serve the JSON API
    Serve {
        /// Port for web server
        #[arg(short, long, default_value = "3142")]
        port: u16,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change one setting and save
    Set {
        /// Setting key, e.g. backend_url or page_size
        #[arg(value_name = "KEY")]
        key: String,

        /// New value; an empty string clears optional settings
        #[arg(value_name = "VALUE")]
        value: String,
    },

    /// Print the settings file location
    Path,
}
