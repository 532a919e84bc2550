//! `lexicon`: command-line front end for lexicon_core

/// CLI module - command-line interface for lexicon
mod cli;

fn main() {
    cli::run_cli();
}
