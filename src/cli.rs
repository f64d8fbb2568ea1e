//! Command-line Arguments

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use zimview_cache::ClearScope;

#[derive(Debug, Parser)]
#[command(name = "zimview", version, about = "Read articles from extracted offline archives")]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON).
    #[arg(long, global = true, env = "ZIMVIEW_CONFIG")]
    pub config: Option<PathBuf>,
    /// More log output; repeat for more.
    #[arg(short, long, global = true, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,
    /// Only log errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render an article and print the resulting document.
    Open {
        /// Directory the archive was extracted to.
        archive: PathBuf,
        /// Article title (`A/Some_page.html`). Defaults to the last page
        /// visited in this archive.
        title: Option<String>,
    },
    /// Inspect or clear the asset cache.
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
    /// Show or change the cache preferences.
    Prefs {
        #[arg(long, value_name = "on|off")]
        cache_assets: Option<Switch>,
        #[arg(long, value_name = "on|off")]
        remember_last_page: Option<Switch>,
    },
}

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Show the selected storage tier and how many items it holds.
    Status,
    /// Remove cached items.
    Clear {
        /// `lastpages` for remembered documents only, `all` for everything.
        scope: ClearScope,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}
impl From<Switch> for bool {
    fn from(value: Switch) -> Self {
        value == Switch::On
    }
}

/// Default log filter for the verbosity flags. `RUST_LOG` takes precedence.
pub fn log_filter(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    }
}
