//! CLI command implementations.

pub mod config;
pub mod history;
pub mod link;
pub mod serve;
pub mod status;
pub mod sync;
pub mod watch;

use std::path::PathBuf;

use bookshelf::{Bookshelf, Settings};
use colored::Colorize;

use crate::cli::Cli;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Settings shared by every command.
pub struct Context {
    /// Settings file location.
    pub settings_path: PathBuf,
    /// Settings from the file with command-line and environment overrides.
    pub settings: Settings,
    pub verbose: bool,
}

impl Context {
    /// Read the settings file and apply overrides from `cli`.
    pub fn load(cli: &Cli) -> Result<Self, Box<dyn std::error::Error>> {
        let settings_path = cli.config.clone().unwrap_or_else(Settings::default_path);
        let mut settings = Settings::load(&settings_path)?;

        if let Some(url) = &cli.backend_url {
            settings.set("backend_url", url)?;
        }
        if let Some(dir) = &cli.data_dir {
            settings.data_dir = dir.clone();
        }

        Ok(Self {
            settings_path,
            settings,
            verbose: cli.verbose,
        })
    }

    /// Load the library as configured.
    pub fn shelf(&self, runtime: &tokio::runtime::Runtime) -> Result<Bookshelf, Box<dyn std::error::Error>> {
        let shelf = runtime.block_on(Bookshelf::load(self.settings.clone()))?;
        if let Some(reason) = &shelf.load_info().fallback_error {
            eprintln!(
                "{} sheet API unavailable, using CSV files ({})",
                "Warning:".yellow().bold(),
                reason
            );
        }
        Ok(shelf)
    }
}

/// Runtime for commands that talk to the network.
pub fn runtime() -> Result<tokio::runtime::Runtime, Box<dyn std::error::Error>> {
    Ok(tokio::runtime::Builder::new_multi_thread().enable_all().build()?)
}
