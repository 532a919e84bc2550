use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::codec::Format;
use crate::validate::BlockingError;

/// Failure reported by an external collaborator (blob store, settings store).
#[derive(Debug, Error)]
pub enum StoreError {
    /// No blob or document with that name.
    #[error("'{0}' was not found")]
    NotFound(String),

    /// Target name is taken.
    #[error("'{0}' already exists")]
    AlreadyExists(String),

    /// The collaborator refused the request (e.g. deleting a published lexicon,
    /// or publishing an unreachable URL).
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Network, auth or storage backend failure.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Local filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An entry that failed the save gate, with everything needed to report it.
#[derive(Debug, Clone, Serialize)]
pub struct InvalidEntry {
    /// Position in the working entry list
    pub index: usize,
    /// First grapheme (or empty) for display
    pub grapheme: String,
    /// Violation messages
    pub messages: Vec<String>,
}

/// Unified error type for lexicon operations
#[derive(Debug, Error)]
pub enum LexiconError {
    // IO errors
    /// Underlying IO failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A file named on the command line could not be read.
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        /// File that was read.
        path: PathBuf,
        /// Cause.
        source: std::io::Error,
    },

    // Structural parse errors
    /// The file is not a well-formed lexicon in the given format.
    #[error("Could not parse {format} lexicon: {message}")]
    Parse {
        /// Format the decoder expected.
        format: Format,
        /// Decoder message.
        message: String,
    },

    // Validation and merge gates
    /// Entries with violations block saving.
    #[error("{}", describe_invalid(.entries))]
    ValidationFailed {
        /// Every invalid entry.
        entries: Vec<InvalidEntry>,
    },

    /// The merge source contains entries that cannot be written to PLS.
    #[error("Merge blocked by {} in the source file; fix the file and upload it again", entry_count(.errors.len()))]
    MergeBlocked {
        /// Blocking entries in the source file.
        errors: Vec<BlockingError>,
    },

    /// The merge source declares a different language.
    #[error("Language mismatch: open lexicon is '{master}' but the merge source is '{incoming}'")]
    LanguageMismatch {
        /// Language of the open lexicon.
        master: String,
        /// Language of the merge source.
        incoming: String,
    },

    /// Finalize was called with conflicts left open.
    #[error("{0} conflict(s) still need a resolution")]
    UnresolvedConflicts(usize),

    /// No merge is waiting on conflicts.
    #[error("No merge in progress")]
    NoPendingMerge,

    /// Editing is locked while a merge is pending.
    #[error("A merge is in progress; finish or cancel it first")]
    MergeInProgress,

    // Collaborator errors
    /// A collaborator call failed.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// The settings document is malformed.
    #[error("Settings error: {0}")]
    Settings(String),

    // Session errors
    /// The operation needs an open lexicon.
    #[error("No lexicon is open")]
    NoOpenLexicon,

    /// Plain save on a lexicon that was never stored.
    #[error("Lexicon has no file name yet; use Save As")]
    SaveRequiresName,

    /// A lexicon needs at least one entry to be saved.
    #[error("Cannot save empty lexicon")]
    EmptyLexicon,

    /// Name is empty or contains a path separator.
    #[error("Invalid file name '{0}'")]
    InvalidFileName(String),

    /// Duplicate or import target is taken.
    #[error("A lexicon named '{0}' already exists")]
    NameCollision(String),

    /// Publishing needs the stored copy to match the working copy.
    #[error("Lexicon has unsaved changes; save it first")]
    NotSaved,

    /// Published lexicons cannot be deleted.
    #[error("Lexicon '{0}' is published; unpublish it first")]
    Published(String),

    /// Bad entry position.
    #[error("Entry index {0} is out of range")]
    EntryIndexOutOfRange(usize),

    /// Bad conflict position.
    #[error("Conflict index {0} is out of range")]
    ConflictIndexOutOfRange(usize),

    /// An unsaved-changes answer arrived with nothing pending.
    #[error("No action is waiting for confirmation")]
    NoPendingAction,

    /// Publishing needs `lexicon_base_url` in the config.
    #[error("No lexicon URL configured for publishing")]
    NoPublishUrl,

    /// Preview needs `preview_url` in the config.
    #[error("No preview service URL configured")]
    NoPreviewUrl,

    // Config errors
    /// Config file is not valid TOML.
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Config could not be written as TOML.
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// No platform config directory and no explicit path.
    #[error("Could not determine config directory")]
    NoConfigDir,
}

fn entry_count(n: usize) -> String {
    if n == 1 {
        "1 invalid entry".to_string()
    } else {
        format!("{n} invalid entries")
    }
}

fn describe_invalid(entries: &[InvalidEntry]) -> String {
    let noun = if entries.len() == 1 { "entry" } else { "entries" };
    let details = entries
        .iter()
        .map(|e| {
            let label = if e.grapheme.is_empty() {
                format!("#{}", e.index + 1)
            } else {
                format!("#{} '{}'", e.index + 1, e.grapheme)
            };
            format!("{} ({})", label, e.messages.join("; "))
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("{} {} failed validation: {}", entries.len(), noun, details)
}

impl LexiconError {
    /// Shorthand for a structural parse failure.
    pub fn parse(format: Format, message: impl Into<String>) -> Self {
        LexiconError::Parse {
            format,
            message: message.into(),
        }
    }

    /// Convert to a serializable representation for IPC
    pub fn to_serializable(&self) -> SerializableError {
        SerializableError::from(self)
    }
}

/// Result type alias for lexicon operations
pub type Result<T> = std::result::Result<T, LexiconError>;

/// A serializable representation of LexiconError for a browser or IPC host
#[derive(Debug, Clone, Serialize)]
pub struct SerializableError {
    /// Error kind/variant name
    pub kind: String,
    /// Human-readable error message
    pub message: String,
    /// Associated lexicon or file name (if applicable)
    pub name: Option<String>,
}

impl From<&LexiconError> for SerializableError {
    fn from(err: &LexiconError) -> Self {
        let kind = match err {
            LexiconError::Io(_) => "Io",
            LexiconError::FileRead { .. } => "FileRead",
            LexiconError::Parse { .. } => "Parse",
            LexiconError::ValidationFailed { .. } => "ValidationFailed",
            LexiconError::MergeBlocked { .. } => "MergeBlocked",
            LexiconError::LanguageMismatch { .. } => "LanguageMismatch",
            LexiconError::UnresolvedConflicts(_) => "UnresolvedConflicts",
            LexiconError::NoPendingMerge => "NoPendingMerge",
            LexiconError::MergeInProgress => "MergeInProgress",
            LexiconError::Store(_) => "Store",
            LexiconError::Settings(_) => "Settings",
            LexiconError::NoOpenLexicon => "NoOpenLexicon",
            LexiconError::SaveRequiresName => "SaveRequiresName",
            LexiconError::EmptyLexicon => "EmptyLexicon",
            LexiconError::InvalidFileName(_) => "InvalidFileName",
            LexiconError::NameCollision(_) => "NameCollision",
            LexiconError::NotSaved => "NotSaved",
            LexiconError::Published(_) => "Published",
            LexiconError::EntryIndexOutOfRange(_) => "EntryIndexOutOfRange",
            LexiconError::ConflictIndexOutOfRange(_) => "ConflictIndexOutOfRange",
            LexiconError::NoPendingAction => "NoPendingAction",
            LexiconError::NoPublishUrl => "NoPublishUrl",
            LexiconError::NoPreviewUrl => "NoPreviewUrl",
            LexiconError::ConfigParse(_) => "ConfigParse",
            LexiconError::ConfigSerialize(_) => "ConfigSerialize",
            LexiconError::NoConfigDir => "NoConfigDir",
        }
        .to_string();

        let name = match err {
            LexiconError::FileRead { path, .. } => Some(path.display().to_string()),
            LexiconError::InvalidFileName(name)
            | LexiconError::NameCollision(name)
            | LexiconError::Published(name) => Some(name.clone()),
            LexiconError::Store(StoreError::NotFound(name))
            | LexiconError::Store(StoreError::AlreadyExists(name)) => Some(name.clone()),
            _ => None,
        };

        Self {
            kind,
            message: err.to_string(),
            name,
        }
    }
}

impl From<LexiconError> for SerializableError {
    fn from(err: LexiconError) -> Self {
        SerializableError::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_failed_message_lists_entries() {
        let err = LexiconError::ValidationFailed {
            entries: vec![
                InvalidEntry {
                    index: 0,
                    grapheme: "cat".to_string(),
                    messages: vec!["Alias or phoneme is required".to_string()],
                },
                InvalidEntry {
                    index: 3,
                    grapheme: String::new(),
                    messages: vec!["At least one grapheme is required".to_string()],
                },
            ],
        };
        let message = err.to_string();
        assert!(message.starts_with("2 entries failed validation"));
        assert!(message.contains("#1 'cat'"));
        assert!(message.contains("#4 (At least one grapheme is required)"));
    }

    #[test]
    fn test_serializable_error_kind_and_name() {
        let err = LexiconError::Published("brands.xml".to_string());
        let ser = err.to_serializable();
        assert_eq!(ser.kind, "Published");
        assert_eq!(ser.name.as_deref(), Some("brands.xml"));

        let err = LexiconError::Store(StoreError::Unavailable("timeout".to_string()));
        let ser = SerializableError::from(err);
        assert_eq!(ser.kind, "Store");
        assert!(ser.message.contains("timeout"));
        assert!(ser.name.is_none());
    }
}
