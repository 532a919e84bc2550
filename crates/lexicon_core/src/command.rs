//! Command pattern API for hosts that drive the editor by message.
//!
//! A browser host posts a JSON [`Command`] and gets a JSON [`Response`] back;
//! the CLI builds commands directly. Both go through
//! [`EditingSession::execute`](crate::session::EditingSession::execute).
//!
//! # Usage
//!
//! ```ignore
//! use lexicon_core::command::{Command, Response};
//!
//! let response = session.execute(Command::Open { name: "brands.xml".into() }).await?;
//! if let Response::Action(ActionOutcome::NeedsConfirmation) = response {
//!     // ask the user, then send Command::ResolvePending
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::codec::Format;
use crate::entry::LexiconEntry;
use crate::merge::{ConflictType, MergeConflict, MergeSummary, Resolution};
use crate::preview::PreviewLink;
use crate::session::{
    ActionOutcome, ExportedFile, MergeStatus, PendingAction, SaveAsOutcome, SessionMode,
    UnsavedChoice,
};
use crate::validate::{InputField, ValidationReport};

// ============================================================================
// Command Types
// ============================================================================

/// Everything a host can ask of an editing session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum Command {
    // === Session ===
    /// Snapshot of the session.
    GetState,

    /// First listing after sign-in, with retries.
    LoadLexiconNames,

    /// List again, once.
    RefreshLexiconNames,

    // === Open / import (gated on unsaved changes) ===
    /// Open a stored lexicon.
    Open {
        /// Stored file name, e.g. `brands.xml`.
        name: String,
    },

    /// Load an uploaded PLS, CSV or TSV file as a new unsaved lexicon.
    Import {
        /// Uploaded file name; the extension picks the codec.
        file_name: String,
        /// File contents.
        contents: String,
    },

    /// Copy a stored lexicon under a new name and open the copy.
    Duplicate {
        /// Stored file name to copy.
        source: String,
        /// Name for the copy.
        new_name: String,
    },

    /// Start an empty lexicon.
    NewLexicon {
        /// BCP-47 tag; the configured default when absent.
        #[serde(default)]
        language: Option<String>,
    },

    /// Answer the unsaved-changes prompt.
    ResolvePending {
        /// Save first, discard, or keep editing.
        choice: UnsavedChoice,
    },

    // === Entry editing ===
    /// Add a blank entry at the top and select it.
    AddEntry,

    /// Insert an entry at its sorted position.
    InsertEntry {
        /// Entry to insert.
        entry: LexiconEntry,
    },

    /// Replace an entry, re-sorting the list.
    UpdateEntry {
        /// Position of the entry to replace.
        index: usize,
        /// New contents.
        entry: LexiconEntry,
    },

    /// Remove an entry.
    RemoveEntry {
        /// Position of the entry to remove.
        index: usize,
    },

    /// Select an entry, or clear the selection.
    Select {
        /// Entry position; `None` clears.
        #[serde(default)]
        index: Option<usize>,
    },

    /// Change the lexicon language.
    SetLanguage {
        /// New BCP-47 tag.
        language: String,
    },

    /// Current validation report.
    Validate,

    /// Strip characters a field does not accept. Sent per keystroke or paste.
    FilterInput {
        /// Which editor field the text is for.
        field: InputField,
        /// Raw text as typed or pasted.
        text: String,
    },

    // === Persistence ===
    /// Save under the current name.
    Save,

    /// Save under a new name.
    SaveAs {
        /// Target name, normalized to `<stem>.xml`.
        name: String,
        /// Replace an existing lexicon of that name.
        #[serde(default)]
        overwrite: bool,
    },

    /// Encode the working entries for download.
    Export {
        /// Output format.
        format: Format,
    },

    /// Re-encode a file without touching the session.
    Convert {
        /// Source file name; the extension picks the decoder.
        file_name: String,
        /// Source contents.
        contents: String,
        /// Output format.
        to: Format,
    },

    // === Merge ===
    /// Merge a file into the working lexicon, stopping at conflicts.
    BeginMerge {
        /// Incoming file name.
        file_name: String,
        /// Incoming file contents.
        contents: String,
    },

    /// Conflicts of the pending merge.
    GetConflicts,

    /// Resolve one conflict.
    ResolveConflict {
        /// Conflict position.
        index: usize,
        /// Chosen resolution.
        resolution: Resolution,
    },

    /// Resolve every conflict, or every conflict of one type.
    ResolveAllConflicts {
        /// Chosen resolution.
        resolution: Resolution,
        /// Restrict to this conflict type.
        #[serde(default)]
        conflict_type: Option<ConflictType>,
    },

    /// Apply the pending merge once every conflict is resolved.
    FinalizeMerge,

    /// Drop the pending merge.
    CancelMerge,

    // === Publishing ===
    /// Register the open lexicon in the language settings document.
    Publish,

    /// Remove the open lexicon from the settings document.
    Unpublish,

    /// Whether a lexicon is listed in the settings document.
    IsPublished {
        /// Stored file name.
        name: String,
    },

    /// Move an unpublished lexicon to the deleted area.
    Delete {
        /// Stored file name.
        name: String,
    },

    // === Preview ===
    /// Preview URL and SSML for one entry on the configured service.
    Preview {
        /// Entry position.
        index: usize,
    },
}

// ============================================================================
// Response Types
// ============================================================================

/// Responses from command execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Response {
    /// Command completed successfully with no data.
    Ok,

    /// A string value, e.g. filtered input or a stored name.
    String(String),

    /// A yes/no answer.
    Bool(bool),

    /// Entry position after an edit, or a count.
    Index(usize),

    /// A list of names.
    Strings(Vec<String>),

    /// Session snapshot.
    State(SessionState),

    /// Outcome of a gated action.
    Action(ActionOutcome),

    /// A single entry.
    Entry(LexiconEntry),

    /// Validation report for the working entries.
    Validation(ValidationReport),

    /// Outcome of save-as.
    SaveAs(SaveAsOutcome),

    /// An encoded file ready for download.
    File(ExportedFile),

    /// Whether a merge finished or is waiting on conflicts.
    Merge(MergeStatus),

    /// Conflicts of the pending merge.
    Conflicts(Vec<MergeConflict>),

    /// Counts from the last finalized merge.
    MergeSummary(MergeSummary),

    /// Preview link, or `None` when the entry cannot be previewed.
    Preview(Option<PreviewLink>),
}

// ============================================================================
// Helper Types
// ============================================================================

/// What a host needs to render the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Editing mode.
    pub mode: SessionMode,
    /// Stored name of the open lexicon, if saved.
    pub filename: Option<String>,
    /// BCP-47 language tag.
    pub language: String,
    /// Working entries in display order.
    pub entries: Vec<LexiconEntry>,
    /// Selected entry position.
    pub selected: Option<usize>,
    /// Action waiting on the unsaved-changes prompt.
    pub pending_action: Option<PendingAction>,
    /// A merge is waiting on conflict resolution.
    pub merge_in_progress: bool,
    /// Stored lexicon names from the last listing.
    pub lexicon_names: Vec<String>,
    /// Message from a failed listing.
    pub load_error: Option<String>,
}
