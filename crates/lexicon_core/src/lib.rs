#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Codecs (PLS XML, CSV, TSV)
pub mod codec;

/// Configuration options
pub mod config;

/// Entry and lexicon types
pub mod entry;

/// Error (common error types)
pub mod error;

/// Merge (classify, resolve and apply an incoming lexicon)
pub mod merge;

/// Alphabetical ordering of entry lists
pub mod ordering;

/// TTS preview requests
pub mod preview;

/// Bounded retry with backoff
pub mod retry;

/// Editing session (the lexicon state machine)
pub mod session;

/// Collaborator interfaces and reference stores
pub mod store;

/// Validate (entry rules that gate save and merge)
pub mod validate;

/// Command pattern API
pub mod command;

mod command_handler;

/// Shared fixtures for unit tests
#[cfg(test)]
pub mod test_utils;

pub use codec::Format;
pub use command::{Command, Response};
pub use config::LexiconConfig;
pub use entry::{Lexicon, LexiconEntry, SayAs};
pub use error::{LexiconError, Result, SerializableError, StoreError};
pub use session::EditingSession;
