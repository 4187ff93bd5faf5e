//! Command-line interface implementation

use clap::Parser;
use std::error::Error;
use std::path::PathBuf;

use crate::config::Settings;

/// Command-line arguments for r-jukebox
#[derive(Parser, Debug)]
#[command(author, version, about = "Per-session jukebox driven from stdin", long_about = None)]
pub struct Args {
    /// Config file path
    #[arg(short, long, env = "JUKEBOX_CONFIG")]
    pub config: Option<String>,

    /// JSON track catalog (overrides the config file)
    #[arg(long, env = "JUKEBOX_CATALOG")]
    pub catalog: Option<String>,

    /// Session used when a command line does not name one
    #[arg(short, long, default_value_t = 1, env = "JUKEBOX_SESSION")]
    pub session: u64,

    /// Progress reporting interval in milliseconds (overrides the config file)
    #[arg(long, env = "JUKEBOX_PROGRESS_INTERVAL_MS")]
    pub progress_interval_ms: Option<u64>,

    /// Emit logs as JSON
    #[arg(long, env = "JUKEBOX_LOG_JSON")]
    pub log_json: bool,
}

impl Args {
    /// Path of the settings file: `--config` or the default location.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(Settings::default_path)
    }

    /// Applies command-line overrides on top of file settings.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(catalog) = &self.catalog {
            settings.catalog_path = Some(PathBuf::from(catalog));
        }
        if let Some(ms) = self.progress_interval_ms {
            settings.progress_interval_ms = ms;
        }
    }
}

/// CLI user interface for interacting with the application
pub struct Cli {
    pub args: Args,
}

impl Cli {
    /// Create a new CLI instance
    pub fn new() -> Self {
        Cli {
            args: Args::parse(),
        }
    }

    pub fn display_banner(&self, track_count: usize) {
        println!("r-jukebox ready: {} tracks in catalog, default session {}.", track_count, self.args.session);
        println!("Type 'help' for commands, 'quit' to exit.");
    }

    pub fn display_reply(&self, reply: &str) {
        if !reply.is_empty() {
            println!("{}", reply);
        }
    }

    /// Display error messages
    pub fn display_error(&self, error: &dyn Error) {
        eprintln!("Error: {}", error);
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self::new()
    }
}
