/// Clap argument definitions
mod args;

/// Config command handlers
mod config;

/// `validate` and `convert`
mod lexicon;

/// `merge` between two lexicon files
mod merge;

/// `list`, `publish`, `unpublish`, `delete`, `preview` against the store
mod store;

/// Shared CLI utilities
mod util;

use clap::Parser;

use args::{Cli, Commands};

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

/// Main entry point for the CLI
pub fn run_cli() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = util::load_config(cli.store);
    log::debug!("Using store {}", config.store_dir.display());

    // Execute commands and track success
    let success = match cli.command {
        Commands::Validate { file } => lexicon::handle_validate(&config, &file),

        Commands::Convert {
            input,
            output,
            language,
        } => lexicon::handle_convert(&config, &input, &output, language),

        Commands::Merge {
            master,
            incoming,
            resolve,
            only,
            output,
        } => merge::handle_merge(&config, &master, &incoming, resolve, only, output),

        Commands::List { json } => store::handle_list(config, json),

        Commands::Publish {
            name,
            url,
            no_check,
        } => store::handle_publish(config, &name, url, no_check),

        Commands::Unpublish { name } => store::handle_unpublish(config, &name),

        Commands::Delete { name } => store::handle_delete(config, &name),

        Commands::Preview {
            name,
            grapheme,
            url,
        } => store::handle_preview(config, &name, &grapheme, url),

        Commands::Config { command } => config::handle_config_command(command, &config),
    };

    if !success {
        std::process::exit(1);
    }
}
