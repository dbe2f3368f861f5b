//! Command-line definitions
//!
//! `rank` ranks the documents of a fixture against a query; `thread` rebuilds
//! the comment trees of fixture posts, picked by id or by forum search. Both print to stdout in the
//! selected output format; logs go to stderr.

use clap::{Parser, Subcommand, ValueEnum};
use contextforge_common::output::OutputFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "contextforge",
    about = "Rank long-form transcripts and rebuild quoted forum threads",
    version
)]
pub struct Cli {
    /// Configuration file, used instead of the config/ directory
    #[arg(long, global = true, env = "CONTEXTFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rank fixture documents against a query
    Rank {
        /// Free-text query
        #[arg(short, long)]
        query: String,

        /// Fixture file with documents and transcripts
        #[arg(short, long)]
        input: PathBuf,

        /// Documents to return (defaults to ranking.top_n)
        #[arg(short = 'n', long)]
        top_n: Option<usize>,

        /// Candidate documents requested from the search provider
        #[arg(long, default_value = "50")]
        search_limit: usize,

        #[arg(short, long, value_enum, default_value = "slim-json")]
        format: Format,
    },

    /// Rebuild the comment threads of fixture posts
    Thread {
        /// Fixture file with posts and their comments
        #[arg(short, long)]
        input: PathBuf,

        /// Post ids or URLs; every fixture post when omitted
        #[arg(short, long = "post", conflicts_with = "search")]
        posts: Vec<String>,

        /// Pick posts from the forum search results for this query
        #[arg(short, long)]
        search: Option<String>,

        /// Posts kept from the search results
        #[arg(long, default_value = "5")]
        limit: usize,

        /// Root-level branches to keep per post (defaults to threads.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        #[arg(short, long, value_enum, default_value = "slim-json")]
        format: Format,
    },
}

/// Output format flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Raw,
    SlimJson,
    SlimXml,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Raw => OutputFormat::Raw,
            Format::SlimJson => OutputFormat::SlimJson,
            Format::SlimXml => OutputFormat::SlimXml,
        }
    }
}
