//! Command-line argument structures and enums

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lexicon")]
#[command(version)]
#[command(about = "Validate, convert, merge and publish PLS pronunciation lexicons", long_about = None)]
pub struct Cli {
    /// Override the lexicon store directory
    #[arg(short, long, global = true)]
    pub store: Option<PathBuf>,

    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check every entry of a PLS, CSV or TSV file
    Validate {
        /// File to check
        file: PathBuf,
    },

    /// Convert between PLS XML, CSV and TSV (format chosen by extension)
    Convert {
        /// Source file
        input: PathBuf,

        /// Destination file (.xml, .csv or .tsv)
        output: PathBuf,

        /// Language for CSV/TSV input (default: config's default_language)
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Merge one lexicon file into another
    Merge {
        /// Lexicon to merge into
        master: PathBuf,

        /// Lexicon to merge from
        incoming: PathBuf,

        /// Resolution for conflicts: master, merge or both
        #[arg(short, long)]
        resolve: Option<String>,

        /// Only apply --resolve to conflicts of this type: additional_alias or conflict
        #[arg(long, requires = "resolve")]
        only: Option<String>,

        /// Write the result here instead of over the master file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List lexicons in the store
    #[command(alias = "ls")]
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Add a stored lexicon to the published settings
    Publish {
        /// Lexicon file name in the store
        name: String,

        /// Public URL prefix (default: config's lexicon_base_url)
        #[arg(short, long)]
        url: Option<String>,

        /// Skip the HTTP reachability check
        #[arg(long)]
        no_check: bool,
    },

    /// Remove a stored lexicon from the published settings
    Unpublish {
        /// Lexicon file name in the store
        name: String,
    },

    /// Move a stored lexicon into the store's deleted/ folder
    #[command(alias = "rm")]
    Delete {
        /// Lexicon file name in the store
        name: String,
    },

    /// Print the TTS preview URL and SSML for one entry of a stored lexicon
    Preview {
        /// Lexicon file name in the store
        name: String,

        /// Grapheme of the entry to preview (case-insensitive)
        grapheme: String,

        /// Preview service URL (default: config's preview_url)
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the current configuration
    Show,

    /// Write a configuration file
    Init {
        /// Store directory (default: ~/lexicons)
        #[arg(short = 'd', long)]
        store_dir: Option<PathBuf>,

        /// Public URL prefix lexicons are published under
        #[arg(long)]
        base_url: Option<String>,

        /// Language for new lexicons and CSV/TSV files
        #[arg(short, long)]
        language: Option<String>,
    },
}
