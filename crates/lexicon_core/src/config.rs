//! Configuration types for the lexicon editor.
//!
//! [`LexiconConfig`] is persisted as TOML (typically at
//! `~/.config/lexicon/config.toml` on Unix systems).
//!
//! # Key Configuration Fields
//!
//! - `store_dir`: directory holding lexicon files for the directory-backed store
//! - `default_language`: language for new lexicons and CSV/TSV imports
//! - `lexicon_base_url`: public URL prefix lexicons are published under
//! - `preview_url`: TTS preview endpoint
//! - `list_retry`: retry policy for the first lexicon listing
//! - `max_settings_backups`: settings backups kept by the publish pipeline
//!
//! # Example
//!
//! ```ignore
//! use lexicon_core::config::LexiconConfig;
//!
//! let config = LexiconConfig::load()?;
//! let url = config.publish_url("brands.xml");
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::entry::DEFAULT_LANGUAGE;
use crate::error::{LexiconError, Result};
use crate::retry::RetryPolicy;
use crate::store::DEFAULT_MAX_BACKUPS;

/// The parts of the editor the user can configure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconConfig {
    /// Root directory of the directory-backed lexicon store
    pub store_dir: PathBuf,

    /// Language used for new lexicons and for CSV/TSV files, which carry none
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Public URL prefix; a lexicon `name` is published at `<prefix>/<name>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lexicon_base_url: Option<String>,

    /// TTS preview endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,

    /// Retry policy for the first lexicon listing
    #[serde(default)]
    pub list_retry: RetryPolicy,

    /// Settings backups kept before the oldest is pruned
    #[serde(default = "default_max_backups")]
    pub max_settings_backups: usize,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_max_backups() -> usize {
    DEFAULT_MAX_BACKUPS
}

impl LexiconConfig {
    /// Create a config with the given store directory and defaults elsewhere.
    pub fn new(store_dir: PathBuf) -> Self {
        Self {
            store_dir,
            default_language: default_language(),
            lexicon_base_url: None,
            preview_url: None,
            list_retry: RetryPolicy::default(),
            max_settings_backups: DEFAULT_MAX_BACKUPS,
        }
    }

    /// URL a lexicon is published under, if a base URL is configured.
    pub fn publish_url(&self, name: &str) -> Option<String> {
        self.lexicon_base_url
            .as_deref()
            .map(str::trim)
            .filter(|base| !base.is_empty())
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), name))
    }

    /// Parse TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Serialize as pretty TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ============================================================================
// Native-only implementation (not available in WASM)
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
impl Default for LexiconConfig {
    fn default() -> Self {
        let store_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lexicon");
        Self::new(store_dir)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl LexiconConfig {
    /// Get the config file path (~/.config/lexicon/config.toml)
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lexicon").join("config.toml"))
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| LexiconError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Save config to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Load config from a path, returning the default if it cannot be read.
    pub fn load_from_or_default(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Using default config ({})", e);
                Self::default()
            }
        }
    }

    /// Load config from the default location, or the default if the file doesn't exist.
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            return Self::load_from(&path);
        }
        Ok(Self::default())
    }

    /// Save config to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().ok_or(LexiconError::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Write a fresh config with the given store directory to the default location.
    pub fn init(store_dir: PathBuf) -> Result<Self> {
        let config = Self::new(store_dir);
        config.save()?;
        Ok(config)
    }
}

#[cfg(target_arch = "wasm32")]
impl Default for LexiconConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("/lexicons"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config = LexiconConfig::from_toml("store_dir = \"/srv/lexicons\"\n").unwrap();
        assert_eq!(config.store_dir, PathBuf::from("/srv/lexicons"));
        assert_eq!(config.default_language, "en-US");
        assert_eq!(config.list_retry, RetryPolicy::default());
        assert_eq!(config.max_settings_backups, 20);
        assert!(config.lexicon_base_url.is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = LexiconConfig::new(dir.path().join("store"));
        config.lexicon_base_url = Some("https://cdn.example.com/lexicons/".to_string());
        config.list_retry.attempts = 5;
        config.save_to(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("preview_url"));

        let loaded = LexiconConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_publish_url_joins_base() {
        let mut config = LexiconConfig::new(PathBuf::from("/tmp"));
        assert_eq!(config.publish_url("a.xml"), None);
        config.lexicon_base_url = Some("https://cdn.example.com/lexicons/".to_string());
        assert_eq!(
            config.publish_url("a.xml").as_deref(),
            Some("https://cdn.example.com/lexicons/a.xml")
        );
    }

    #[test]
    fn test_load_from_missing_file_is_file_read_error() {
        let err = LexiconConfig::load_from(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, LexiconError::FileRead { .. }));
    }
}
