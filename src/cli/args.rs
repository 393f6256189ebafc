//! Command line argument definitions.

use crate::models::config::Platform;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Media Renamer - Match episode files to canonical titles and plan renames
#[derive(Parser, Debug)]
#[command(name = "media-renamer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: <config dir>/media_renamer/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a rename plan
    Plan(PlanArgs),

    /// Manage the provider cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Options of the `plan` command.
#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Source directory to scan
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Library root for target paths (default: <SOURCE>_organized)
    #[arg(short, long, value_name = "TARGET")]
    pub target: Option<PathBuf>,

    /// Output path for plan.json
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Show name, overriding what filenames say
    #[arg(long)]
    pub show: Option<String>,

    /// Season number, overriding what filenames say
    #[arg(long)]
    pub season: Option<u16>,

    /// TMDB series id, skipping the show search
    #[arg(long, value_name = "ID")]
    pub tmdb_id: Option<String>,

    /// Naming convention
    #[arg(long, value_enum)]
    pub platform: Option<PlatformArg>,

    /// Treat every file as a potential anthology
    #[arg(long)]
    pub anthology: bool,

    /// Accept only SxxEyy markers
    #[arg(long)]
    pub strict: bool,

    /// Record source checksums in the plan
    #[arg(long)]
    pub verify: bool,

    /// Bypass the provider cache
    #[arg(long)]
    pub no_cache: bool,

    /// Never consult the language model
    #[arg(long)]
    pub no_llm: bool,

    /// Language model to use
    #[arg(long)]
    pub model: Option<String>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum CacheAction {
    /// Delete expired cache entries
    Purge,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformArg {
    Plex,
    Jellyfin,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Plex => Platform::Plex,
            PlatformArg::Jellyfin => Platform::Jellyfin,
        }
    }
}
