//! Config command handlers

use std::path::PathBuf;

use lexicon_core::config::LexiconConfig;

use crate::cli::args::ConfigCommands;
use crate::cli::util::SETTINGS_DIR;

pub fn handle_config_command(command: Option<ConfigCommands>, config: &LexiconConfig) -> bool {
    match command {
        None | Some(ConfigCommands::Show) => {
            show_config(config);
            true
        }
        Some(ConfigCommands::Init {
            store_dir,
            base_url,
            language,
        }) => handle_init(store_dir, base_url, language),
    }
}

fn show_config(config: &LexiconConfig) {
    println!("Lexicon Configuration");
    println!("=====================");
    println!("Store directory: {}", config.store_dir.display());
    println!(
        "Settings:        {}",
        config.store_dir.join(SETTINGS_DIR).display()
    );
    println!("Default language: {}", config.default_language);
    match &config.lexicon_base_url {
        Some(url) => println!("Publish URL:     {}", url),
        None => println!("Publish URL:     (not set)"),
    }
    if let Some(url) = &config.preview_url {
        println!("Preview URL:     {}", url);
    }
    println!(
        "List retries:    {} (base delay {} ms)",
        config.list_retry.attempts, config.list_retry.base_delay_ms
    );
    println!("Settings backups kept: {}", config.max_settings_backups);
    match LexiconConfig::config_path() {
        Some(path) if path.exists() => println!("Config file:     {}", path.display()),
        Some(path) => println!("Config file:     {} (not created)", path.display()),
        None => {}
    }
}

/// Handle `config init`
/// Returns true on success, false on error
fn handle_init(
    store_dir: Option<PathBuf>,
    base_url: Option<String>,
    language: Option<String>,
) -> bool {
    let dir = store_dir.unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lexicons")
    });

    let mut config = LexiconConfig::new(dir.clone());
    config.lexicon_base_url = base_url;
    if let Some(language) = language {
        config.default_language = language;
    }

    if let Err(e) = config.save() {
        eprintln!("✗ Error initializing config: {}", e);
        return false;
    }
    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("✗ Could not create {}: {}", dir.display(), e);
        return false;
    }

    println!("✓ Initialized lexicon configuration");
    println!("  Store directory: {}", dir.display());
    if let Some(config_path) = LexiconConfig::config_path() {
        println!("  Config file: {}", config_path.display());
    }
    true
}
