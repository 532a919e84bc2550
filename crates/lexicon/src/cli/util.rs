//! Shared CLI utilities

use std::path::{Path, PathBuf};

use lexicon_core::codec::{self, Format};
use lexicon_core::config::LexiconConfig;
use lexicon_core::entry::Lexicon;
use lexicon_core::error::{LexiconError, StoreError};
use lexicon_core::session::EditingSession;
use lexicon_core::store::{
    BoxFuture, DirectoryBlobStore, NoToken, ReachabilityCheck, StagedSettingsStore, StoreResult,
};
use thiserror::Error;

/// Subdirectory of the store holding the settings document, its staging copy
/// and backups. Hidden so that it never shows up as a lexicon.
pub const SETTINGS_DIR: &str = ".settings";

/// Settings store used by the CLI.
pub type CliSettings = StagedSettingsStore<DirectoryBlobStore, HttpCheck>;

/// Editing session over the configured store directory.
pub type CliSession = EditingSession<DirectoryBlobStore, CliSettings>;

/// Errors from local file handling in CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Could not read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not write '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}")]
    Lexicon(#[from] LexiconError),

    #[error("{0}")]
    Usage(String),
}

/// Helper to run async operations in sync context
pub fn block_on<F: std::future::Future>(f: F) -> F::Output {
    futures_lite::future::block_on(f)
}

/// Format implied by a file extension; XML for anything unrecognized.
pub fn format_for_path(path: &Path) -> Format {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("csv") => Format::Csv,
        Some("tsv") | Some("txt") => Format::Tsv,
        _ => Format::Xml,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Read and decode a lexicon file, detecting its format.
pub fn read_lexicon(path: &Path, fallback_language: &str) -> Result<Lexicon, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut lexicon = codec::decode_file(&file_name(path), &text, fallback_language)?;
    lexicon.filename = Some(file_name(path));
    Ok(lexicon)
}

/// Encode a lexicon in the format implied by `path` and write it.
pub fn write_lexicon(path: &Path, lexicon: &Lexicon) -> Result<Format, CliError> {
    let format = format_for_path(path);
    let bytes = codec::export_bytes(format, lexicon);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| CliError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, bytes).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(format)
}

/// Load config from the default location, applying a `--store` override.
pub fn load_config(store_override: Option<PathBuf>) -> LexiconConfig {
    let mut config = match LexiconConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: {}; using defaults", e);
            LexiconConfig::default()
        }
    };
    if let Some(store) = store_override {
        config.store_dir = store;
    }
    config
}

/// Session over the store directory. `check_urls` enables the HEAD check
/// run before publishing.
pub fn open_session(config: LexiconConfig, check_urls: bool) -> CliSession {
    let blobs = DirectoryBlobStore::new(&config.store_dir);
    let settings = StagedSettingsStore::new(DirectoryBlobStore::new(
        config.store_dir.join(SETTINGS_DIR),
    ))
    .with_max_backups(config.max_settings_backups)
    .with_reachability_check(HttpCheck::new(check_urls));
    EditingSession::new(blobs, settings, NoToken, config)
}

/// Checks that a lexicon URL answers a HEAD request with an XML content type.
pub struct HttpCheck {
    client: reqwest::blocking::Client,
    enabled: bool,
}

impl HttpCheck {
    pub fn new(enabled: bool) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            enabled,
        }
    }

    fn check_blocking(&self, url: &str) -> StoreResult<()> {
        let response = self
            .client
            .head(url)
            .send()
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(StoreError::Rejected(format!(
                "{} answered {}",
                url,
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !content_type.contains("xml") {
            return Err(StoreError::Rejected(format!(
                "{} is not served as XML (content type '{}')",
                url, content_type
            )));
        }
        log::debug!("{} is reachable ({})", url, content_type);
        Ok(())
    }
}

impl ReachabilityCheck for HttpCheck {
    fn check<'a>(&'a self, url: &'a str) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            if !self.enabled {
                return Ok(());
            }
            self.check_blocking(url)
        })
    }
}
