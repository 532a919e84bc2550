//! The editing session: one open lexicon, its last-saved snapshot, and the
//! operations that move between them.
//!
//! ```text
//! Empty ──open/import/duplicate/new──▶ Loaded ◀──save── Dirty
//!   ▲                                    │  └──edit/merge──▶ │
//!   └──────────delete open lexicon───────┴───────────────────┘
//! ```
//!
//! Every collaborator call is awaited and its failure returned; the working
//! entry list is never cleared because a collaborator failed.
//!
//! Switching lexicons while there are unsaved changes is gated: the call
//! returns [`ActionOutcome::NeedsConfirmation`] and the action waits until
//! [`EditingSession::resolve_pending`] is called with the user's choice.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::codec::{self, Format};
use crate::config::LexiconConfig;
use crate::entry::{Lexicon, LexiconEntry, is_sentinel_only};
use crate::error::{LexiconError, Result};
use crate::merge::{
    ConflictType, MergeConflict, MergeEngine, MergeOutcome, MergeResult, MergeSummary,
    PendingMerge, Resolution,
};
use crate::ordering::{insert_sorted, reposition, sort_entries};
use crate::preview::{PreviewLink, PreviewRequest};
use crate::retry::{Sleeper, retry_with_backoff};
use crate::store::{BlobStore, NoToken, SettingsDocument, SettingsStore, TokenProvider};
use crate::validate::{ValidationReport, Violation};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum SessionMode {
    /// No lexicon open
    Empty,
    /// Open and matching the last save
    Loaded,
    /// Open with unsaved changes
    Dirty,
}

/// An operation deferred until the user decides what to do with unsaved changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "params")]
#[ts(export, export_to = "bindings/")]
pub enum PendingAction {
    /// Open a stored lexicon.
    Open {
        /// Stored file name.
        name: String,
    },
    /// Load an uploaded file.
    Import {
        /// Uploaded file name.
        file_name: String,
        /// File contents.
        contents: String,
    },
    /// Copy a stored lexicon and open the copy.
    Duplicate {
        /// Stored file name to copy.
        source: String,
        /// Name for the copy.
        new_name: String,
    },
    /// Start an empty lexicon.
    NewLexicon {
        /// BCP-47 tag.
        language: String,
    },
}

/// Result of a gated operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ActionOutcome {
    /// The action ran.
    Done,
    /// Unsaved changes: the action is waiting for [`EditingSession::resolve_pending`].
    NeedsConfirmation,
    /// The user cancelled the pending action.
    Cancelled,
}

/// The user's answer to the unsaved-changes prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum UnsavedChoice {
    /// Save, then continue
    Save,
    /// Drop the changes, then continue
    Discard,
    /// Stay on the current lexicon
    Cancel,
}

/// Result of Save As.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "name")]
#[ts(export, export_to = "bindings/")]
pub enum SaveAsOutcome {
    /// Stored under the normalized name.
    Saved(String),
    /// A lexicon with this name exists; call again with `overwrite` set.
    ConfirmOverwrite(String),
}

/// Result of starting a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "data")]
#[ts(export, export_to = "bindings/")]
pub enum MergeStatus {
    /// Applied to the working list straight away.
    Completed(MergeSummary),
    /// Conflicts to resolve before [`EditingSession::finalize_merge`].
    NeedsResolution(Vec<MergeConflict>),
}

/// A file ready for download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ExportedFile {
    /// Suggested download name
    pub file_name: String,
    /// MIME type
    pub content_type: String,
    /// Encoded contents, UTF-8 with a BOM for CSV
    pub bytes: Vec<u8>,
}

/// Turn user input into a blob name: trimmed, `.xml` suffix, only
/// `[A-Za-z0-9._-]` (anything else becomes `_`). Path separators are rejected.
pub fn normalize_file_name(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.contains('/') || trimmed.contains('\\') {
        return Err(LexiconError::InvalidFileName(input.to_string()));
    }

    let stem = trimmed
        .char_indices()
        .rev()
        .nth(3)
        .map(|(at, _)| at)
        .filter(|&at| trimmed[at..].eq_ignore_ascii_case(".xml"))
        .map_or(trimmed, |at| &trimmed[..at]);
    let stem: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if stem.trim_matches(['.', '_']).is_empty() {
        return Err(LexiconError::InvalidFileName(input.to_string()));
    }
    Ok(format!("{}.xml", stem))
}

/// File name without directories or extension.
fn base_name(file_name: &str) -> &str {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

fn strip_new_flags(entries: &mut [LexiconEntry]) {
    for entry in entries {
        entry.is_new = false;
    }
}

fn mark_new(mut entries: Vec<LexiconEntry>) -> Vec<LexiconEntry> {
    for entry in &mut entries {
        entry.is_new = true;
    }
    entries
}

#[cfg(not(target_arch = "wasm32"))]
fn default_sleeper() -> Box<dyn Sleeper> {
    Box::new(crate::retry::ThreadSleeper)
}

#[cfg(target_arch = "wasm32")]
fn default_sleeper() -> Box<dyn Sleeper> {
    Box::new(crate::retry::NoSleep)
}

/// One editing session over a blob store and a settings store.
pub struct EditingSession<B, S, T = NoToken> {
    blobs: B,
    settings: S,
    tokens: T,
    config: LexiconConfig,
    sleeper: Box<dyn Sleeper>,

    open: bool,
    filename: Option<String>,
    /// Name offered for Save As and export after an import
    suggested_name: Option<String>,
    language: String,
    saved_language: String,
    current: Vec<LexiconEntry>,
    saved: Vec<LexiconEntry>,
    selected: Option<usize>,
    report: ValidationReport,

    pending_merge: Option<PendingMerge>,
    unsaved_merge: bool,
    last_merge_summary: Option<MergeSummary>,
    pending_action: Option<PendingAction>,

    lexicon_names: Vec<String>,
    load_error: Option<String>,
}

impl<B: BlobStore, S: SettingsStore, T: TokenProvider> EditingSession<B, S, T> {
    /// An empty session. Nothing is listed or opened until asked.
    ///
    /// Native builds wait between list retries with [`ThreadSleeper`], which
    /// blocks the calling thread; wasm builds use [`NoSleep`] and retry
    /// immediately. Hosts on an async runtime or in the browser should pass
    /// a timer-backed [`Sleeper`] through [`Self::with_sleeper`].
    ///
    /// [`ThreadSleeper`]: crate::retry::ThreadSleeper
    /// [`NoSleep`]: crate::retry::NoSleep
    pub fn new(blobs: B, settings: S, tokens: T, config: LexiconConfig) -> Self {
        let language = config.default_language.clone();
        Self {
            blobs,
            settings,
            tokens,
            config,
            sleeper: default_sleeper(),
            open: false,
            filename: None,
            suggested_name: None,
            saved_language: language.clone(),
            language,
            current: Vec::new(),
            saved: Vec::new(),
            selected: None,
            report: ValidationReport::default(),
            pending_merge: None,
            unsaved_merge: false,
            last_merge_summary: None,
            pending_action: None,
            lexicon_names: Vec::new(),
            load_error: None,
        }
    }

    /// Replace the sleeper used between list retries.
    ///
    /// The sleeper should yield to the host's event loop, e.g. a
    /// `setTimeout` promise in the browser or the runtime's timer.
    pub fn with_sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Empty, loaded or dirty.
    pub fn mode(&self) -> SessionMode {
        if !self.open {
            SessionMode::Empty
        } else if self.is_dirty() {
            SessionMode::Dirty
        } else {
            SessionMode::Loaded
        }
    }

    /// Working entries differ from the last save, or a merge has not been saved.
    pub fn is_dirty(&self) -> bool {
        self.open
            && (self.current != self.saved
                || self.language != self.saved_language
                || self.unsaved_merge)
    }

    /// Stored name, `None` until first saved.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Working language tag.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Working entries in display order.
    pub fn entries(&self) -> &[LexiconEntry] {
        &self.current
    }

    /// Entries as of the last save or load.
    pub fn saved_entries(&self) -> &[LexiconEntry] {
        &self.saved
    }

    /// Selected position.
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Selected entry.
    pub fn selected_entry(&self) -> Option<&LexiconEntry> {
        self.selected.and_then(|i| self.current.get(i))
    }

    /// Report for the working entries.
    pub fn validation(&self) -> &ValidationReport {
        &self.report
    }

    /// Violations of one entry.
    pub fn violations(&self, index: usize) -> &[Violation] {
        self.report.for_index(index)
    }

    /// Action waiting on the unsaved-changes prompt.
    pub fn pending_action(&self) -> Option<&PendingAction> {
        self.pending_action.as_ref()
    }

    /// A merge is waiting on conflicts.
    pub fn has_pending_merge(&self) -> bool {
        self.pending_merge.is_some()
    }

    /// Conflicts of the merge in progress (empty when none).
    pub fn conflicts(&self) -> &[MergeConflict] {
        self.pending_merge
            .as_ref()
            .map(PendingMerge::conflicts)
            .unwrap_or(&[])
    }

    /// Summary of the last applied merge.
    pub fn last_merge_summary(&self) -> Option<MergeSummary> {
        self.last_merge_summary
    }

    /// Cached result of the last successful listing.
    pub fn lexicon_names(&self) -> &[String] {
        &self.lexicon_names
    }

    /// Set when the initial listing failed after every retry.
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// Active configuration.
    pub fn config(&self) -> &LexiconConfig {
        &self.config
    }

    /// Blob store.
    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    /// Settings store.
    pub fn settings(&self) -> &S {
        &self.settings
    }

    /// Snapshot of the working lexicon.
    pub fn lexicon(&self) -> Lexicon {
        Lexicon {
            language: self.language.clone(),
            filename: self.filename.clone(),
            entries: self.current.clone(),
        }
    }

    fn require_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(LexiconError::NoOpenLexicon)
        }
    }

    fn require_no_merge(&self) -> Result<()> {
        if self.pending_merge.is_some() {
            Err(LexiconError::MergeInProgress)
        } else {
            Ok(())
        }
    }

    fn revalidate(&mut self) {
        self.report = ValidationReport::for_entries(&self.current);
    }

    fn load_state(
        &mut self,
        filename: Option<String>,
        language: String,
        current: Vec<LexiconEntry>,
        saved: Vec<LexiconEntry>,
    ) {
        self.open = true;
        self.filename = filename;
        self.suggested_name = None;
        self.saved_language = language.clone();
        self.language = language;
        self.current = current;
        self.saved = saved;
        self.selected = None;
        self.pending_merge = None;
        self.unsaved_merge = false;
        self.last_merge_summary = None;
        self.revalidate();
    }

    fn reset(&mut self) {
        self.open = false;
        self.filename = None;
        self.suggested_name = None;
        self.language = self.config.default_language.clone();
        self.saved_language = self.language.clone();
        self.current.clear();
        self.saved.clear();
        self.selected = None;
        self.report = ValidationReport::default();
        self.pending_merge = None;
        self.unsaved_merge = false;
        self.last_merge_summary = None;
        self.pending_action = None;
    }

    // ========================================================================
    // Entry editing
    // ========================================================================

    /// Select an entry, or clear the selection with `None`.
    pub fn select(&mut self, index: Option<usize>) -> Result<()> {
        if let Some(i) = index
            && i >= self.current.len()
        {
            return Err(LexiconError::EntryIndexOutOfRange(i));
        }
        self.selected = index;
        Ok(())
    }

    /// Add a blank entry at the top and select it. An existing blank entry is
    /// selected instead of adding a second one.
    pub fn add_entry(&mut self) -> Result<usize> {
        self.require_open()?;
        let index = match self.current.iter().position(LexiconEntry::is_placeholder) {
            Some(existing) => existing,
            None => {
                self.current.insert(0, LexiconEntry::placeholder());
                0
            }
        };
        self.selected = Some(index);
        self.revalidate();
        Ok(index)
    }

    /// Insert a complete entry at its sorted position and select it.
    pub fn insert_entry(&mut self, mut entry: LexiconEntry) -> Result<usize> {
        self.require_open()?;
        entry.is_new = true;
        let index = insert_sorted(&mut self.current, entry);
        self.selected = Some(index);
        self.revalidate();
        Ok(index)
    }

    /// Replace the entry at `index` and return where it ends up.
    ///
    /// The entry moves to its sorted position when its first grapheme changes
    /// to real text, and the selection follows it.
    pub fn update_entry(&mut self, index: usize, mut entry: LexiconEntry) -> Result<usize> {
        self.require_open()?;
        let existing = self
            .current
            .get(index)
            .ok_or(LexiconError::EntryIndexOutOfRange(index))?;

        entry.is_new = existing.is_new;
        if entry == *existing {
            self.selected = Some(index);
            return Ok(index);
        }

        let first_changed = entry.first_grapheme() != existing.first_grapheme();
        entry.is_new = true;
        self.current[index] = entry;

        let new_index = if first_changed {
            reposition(&mut self.current, index)
        } else {
            index
        };
        self.selected = Some(new_index);
        self.revalidate();
        Ok(new_index)
    }

    /// Remove the entry at `index`.
    pub fn remove_entry(&mut self, index: usize) -> Result<LexiconEntry> {
        self.require_open()?;
        if index >= self.current.len() {
            return Err(LexiconError::EntryIndexOutOfRange(index));
        }
        let removed = self.current.remove(index);
        self.selected = match self.selected {
            Some(s) if s == index => None,
            Some(s) if s > index => Some(s - 1),
            other => other,
        };
        self.revalidate();
        Ok(removed)
    }

    /// Change the lexicon's language tag.
    pub fn set_language(&mut self, language: &str) -> Result<()> {
        self.require_open()?;
        self.language = language.trim().to_string();
        Ok(())
    }

    // ========================================================================
    // Lexicon listing
    // ========================================================================

    /// First listing after sign-in, retried per the configured policy. After
    /// the last failure the error is kept in [`Self::load_error`].
    pub async fn load_lexicon_names(&mut self) -> Result<&[String]> {
        let blobs = &self.blobs;
        let result = retry_with_backoff(
            self.config.list_retry,
            self.sleeper.as_ref(),
            "Listing lexicons",
            || blobs.list(),
        )
        .await;

        match result {
            Ok(names) => {
                self.set_names(names);
                Ok(&self.lexicon_names)
            }
            Err(e) => {
                self.load_error = Some(format!("Could not load lexicons: {}", e));
                Err(e.into())
            }
        }
    }

    /// List again, once. The cached names survive a failure.
    pub async fn refresh_lexicon_names(&mut self) -> Result<&[String]> {
        let names = self.blobs.list().await?;
        self.set_names(names);
        Ok(&self.lexicon_names)
    }

    fn set_names(&mut self, mut names: Vec<String>) {
        names.sort();
        log::debug!("{} lexicon(s) available", names.len());
        self.lexicon_names = names;
        self.load_error = None;
    }

    fn remember_name(&mut self, name: &str) {
        if let Err(pos) = self.lexicon_names.binary_search_by(|n| n.as_str().cmp(name)) {
            self.lexicon_names.insert(pos, name.to_string());
        }
    }

    // ========================================================================
    // Open / import / duplicate / new (gated on unsaved changes)
    // ========================================================================

    /// Open a stored lexicon.
    pub async fn open(&mut self, name: &str) -> Result<ActionOutcome> {
        self.gate(PendingAction::Open {
            name: name.to_string(),
        })
        .await
    }

    /// Load an uploaded XML/CSV/TSV file as a new, unsaved lexicon.
    pub async fn import(&mut self, file_name: &str, contents: &str) -> Result<ActionOutcome> {
        self.gate(PendingAction::Import {
            file_name: file_name.to_string(),
            contents: contents.to_string(),
        })
        .await
    }

    /// Copy a stored lexicon under a new name. The copy is unsaved until
    /// [`Self::save`].
    pub async fn duplicate(&mut self, source: &str, new_name: &str) -> Result<ActionOutcome> {
        let new_name = normalize_file_name(new_name)?;
        self.gate(PendingAction::Duplicate {
            source: source.to_string(),
            new_name,
        })
        .await
    }

    /// Start an empty lexicon seeded with the blank entry.
    pub async fn new_lexicon(&mut self, language: Option<&str>) -> Result<ActionOutcome> {
        let language = language
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(self.config.default_language.as_str())
            .to_string();
        self.gate(PendingAction::NewLexicon { language }).await
    }

    async fn gate(&mut self, action: PendingAction) -> Result<ActionOutcome> {
        self.require_no_merge()?;
        if self.is_dirty() {
            log::info!("Unsaved changes; deferring {}", action_label(&action));
            self.pending_action = Some(action);
            return Ok(ActionOutcome::NeedsConfirmation);
        }
        self.pending_action = None;
        self.perform(action).await?;
        Ok(ActionOutcome::Done)
    }

    /// Complete or drop the deferred action.
    ///
    /// With [`UnsavedChoice::Save`], a failed save keeps the action pending.
    pub async fn resolve_pending(&mut self, choice: UnsavedChoice) -> Result<ActionOutcome> {
        let action = self
            .pending_action
            .take()
            .ok_or(LexiconError::NoPendingAction)?;

        match choice {
            UnsavedChoice::Cancel => {
                log::debug!("Cancelled {}", action_label(&action));
                return Ok(ActionOutcome::Cancelled);
            }
            UnsavedChoice::Save => {
                if let Err(e) = self.save().await {
                    self.pending_action = Some(action);
                    return Err(e);
                }
            }
            UnsavedChoice::Discard => {
                log::info!("Discarding unsaved changes");
            }
        }

        self.perform(action).await?;
        Ok(ActionOutcome::Done)
    }

    async fn perform(&mut self, action: PendingAction) -> Result<()> {
        match action {
            PendingAction::Open { name } => {
                let text = self.blobs.get(&name).await?;
                let lexicon = codec::xml::decode(&text, &self.config.default_language)?;
                let mut entries = lexicon.entries;
                sort_entries(&mut entries);
                log::info!("Opened {} ({} entries)", name, entries.len());
                self.load_state(Some(name), lexicon.language, entries.clone(), entries);
            }
            PendingAction::Import {
                file_name,
                contents,
            } => {
                let lexicon =
                    codec::decode_file(&file_name, &contents, &self.config.default_language)?;
                let mut entries = mark_new(lexicon.entries);
                sort_entries(&mut entries);
                log::info!("Imported {} ({} entries)", file_name, entries.len());
                self.load_state(None, lexicon.language, entries, Vec::new());
                self.suggested_name = normalize_file_name(base_name(&file_name)).ok();
            }
            PendingAction::Duplicate { source, new_name } => {
                if self.blobs.exists(&new_name).await? {
                    return Err(LexiconError::NameCollision(new_name));
                }
                let text = self.blobs.get(&source).await?;
                let lexicon = codec::xml::decode(&text, &self.config.default_language)?;
                let mut entries = mark_new(lexicon.entries);
                sort_entries(&mut entries);
                log::info!("Duplicated {} as {}", source, new_name);
                self.load_state(Some(new_name), lexicon.language, entries, Vec::new());
            }
            PendingAction::NewLexicon { language } => {
                let lexicon = Lexicon::empty(language);
                log::info!("New {} lexicon", lexicon.language);
                self.load_state(
                    None,
                    lexicon.language,
                    lexicon.entries.clone(),
                    lexicon.entries,
                );
            }
        }
        Ok(())
    }

    // ========================================================================
    // Save / Save As / export
    // ========================================================================

    /// Empty-lexicon and validation gates. Selects the first invalid entry.
    fn check_saveable(&mut self) -> Result<()> {
        self.require_open()?;
        self.require_no_merge()?;
        if is_sentinel_only(&self.current) {
            return Err(LexiconError::EmptyLexicon);
        }
        self.revalidate();
        if let Some(first) = self.report.first_invalid() {
            self.selected = Some(first);
            return Err(LexiconError::ValidationFailed {
                entries: self.report.invalid_entries(&self.current),
            });
        }
        Ok(())
    }

    /// Save under the current file name.
    pub async fn save(&mut self) -> Result<()> {
        self.check_saveable()?;
        let name = self
            .filename
            .clone()
            .ok_or(LexiconError::SaveRequiresName)?;
        self.write_current(&name).await
    }

    /// Save under a new name. An existing different lexicon with that name is
    /// only replaced when `overwrite` is set.
    pub async fn save_as(&mut self, name: &str, overwrite: bool) -> Result<SaveAsOutcome> {
        let name = normalize_file_name(name)?;
        self.check_saveable()?;

        let is_current = self.filename.as_deref() == Some(name.as_str());
        if !overwrite && !is_current && self.blobs.exists(&name).await? {
            log::debug!("{} exists; asking before overwriting", name);
            return Ok(SaveAsOutcome::ConfirmOverwrite(name));
        }

        self.write_current(&name).await?;
        Ok(SaveAsOutcome::Saved(name))
    }

    async fn write_current(&mut self, name: &str) -> Result<()> {
        let xml = codec::xml::encode(&self.language, &self.current);
        let token = self.tokens.access_token().await;
        self.blobs
            .put(name, &xml, Format::Xml.content_type(), token.as_deref())
            .await?;

        strip_new_flags(&mut self.current);
        self.saved = self.current.clone();
        self.saved_language = self.language.clone();
        self.filename = Some(name.to_string());
        self.suggested_name = None;
        self.unsaved_merge = false;
        self.remember_name(name);
        log::info!("Saved {} ({} entries)", name, self.current.len());
        Ok(())
    }

    /// Encode the working lexicon for download. Blank entries are left out.
    pub fn export(&self, format: Format) -> Result<ExportedFile> {
        self.require_open()?;
        let base = self
            .filename
            .as_deref()
            .or(self.suggested_name.as_deref())
            .map(base_name)
            .unwrap_or("lexicon");
        let lexicon = Lexicon {
            language: self.language.clone(),
            filename: self.filename.clone(),
            entries: self
                .current
                .iter()
                .filter(|e| !e.is_placeholder())
                .cloned()
                .collect(),
        };
        Ok(ExportedFile {
            file_name: format!("{}.{}", base, format.extension()),
            content_type: format.content_type().to_string(),
            bytes: codec::export_bytes(format, &lexicon),
        })
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// Merge an uploaded file into the open lexicon.
    pub fn begin_merge(&mut self, file_name: &str, contents: &str) -> Result<MergeStatus> {
        self.require_open()?;
        if self.filename.is_none() {
            return Err(LexiconError::SaveRequiresName);
        }
        self.require_no_merge()?;

        let incoming = codec::decode_file(file_name, contents, &self.language)?;
        log::info!(
            "Merging {} ({} entries) into {}",
            file_name,
            incoming.entries.len(),
            self.filename.as_deref().unwrap_or_default()
        );

        match MergeEngine::begin(
            &self.language,
            &self.current,
            &incoming.language,
            &incoming.entries,
        )? {
            MergeOutcome::Completed(result) => {
                let summary = result.summary;
                self.apply_merge(result);
                Ok(MergeStatus::Completed(summary))
            }
            MergeOutcome::NeedsResolution(pending) => {
                let conflicts = pending.conflicts().to_vec();
                self.pending_merge = Some(pending);
                Ok(MergeStatus::NeedsResolution(conflicts))
            }
        }
    }

    fn pending_merge_mut(&mut self) -> Result<&mut PendingMerge> {
        self.pending_merge
            .as_mut()
            .ok_or(LexiconError::NoPendingMerge)
    }

    /// Set the resolution of one conflict.
    pub fn resolve_conflict(&mut self, index: usize, resolution: Resolution) -> Result<()> {
        self.pending_merge_mut()?.resolve(index, resolution)
    }

    /// Apply `resolution` to every conflict, or only to those of `only_type`.
    /// Returns how many conflicts were set.
    pub fn resolve_all_conflicts(
        &mut self,
        resolution: Resolution,
        only_type: Option<ConflictType>,
    ) -> Result<usize> {
        let pending = self.pending_merge_mut()?;
        Ok(match only_type {
            Some(conflict_type) => pending.resolve_all_of_type(conflict_type, resolution),
            None => pending.resolve_all(resolution),
        })
    }

    /// Apply the resolutions. Nothing changes while any conflict is unresolved.
    pub fn finalize_merge(&mut self) -> Result<MergeSummary> {
        let pending = self
            .pending_merge
            .as_ref()
            .ok_or(LexiconError::NoPendingMerge)?;
        let result = pending.finalize()?;
        let summary = result.summary;
        self.pending_merge = None;
        self.apply_merge(result);
        Ok(summary)
    }

    /// Drop the pending merge; the working entries are untouched.
    pub fn cancel_merge(&mut self) -> Result<()> {
        if self.pending_merge.take().is_none() {
            return Err(LexiconError::NoPendingMerge);
        }
        log::info!("Merge cancelled");
        Ok(())
    }

    fn apply_merge(&mut self, result: MergeResult) {
        log::info!(
            "Merge applied: {} new, {} resolved, {} identical",
            result.summary.new_entries,
            result.summary.conflicts_resolved,
            result.summary.identical_skipped
        );
        self.current = result.entries;
        self.unsaved_merge = true;
        self.last_merge_summary = Some(result.summary);
        self.selected = None;
        self.revalidate();
    }

    // ========================================================================
    // Publish / unpublish / delete
    // ========================================================================

    fn saved_name(&self) -> Result<String> {
        self.require_open()?;
        let name = self.filename.clone().ok_or(LexiconError::NotSaved)?;
        if self.is_dirty() {
            return Err(LexiconError::NotSaved);
        }
        Ok(name)
    }

    async fn settings_document(&self) -> Result<SettingsDocument> {
        let text = self.settings.get_document().await?;
        SettingsDocument::parse(&text).map_err(|e| LexiconError::Settings(e.to_string()))
    }

    /// Whether a lexicon is referenced by the settings document.
    pub async fn is_published(&self, name: &str) -> Result<bool> {
        Ok(self.settings_document().await?.references_name(name))
    }

    /// Publish the open, saved lexicon. Returns its public URL.
    pub async fn publish(&mut self) -> Result<String> {
        let name = self.saved_name()?;
        let url = self
            .config
            .publish_url(&name)
            .ok_or(LexiconError::NoPublishUrl)?;
        self.settings
            .add_reference(&self.language, &name, &url)
            .await?;
        log::info!("Published {} at {}", name, url);
        Ok(url)
    }

    /// Remove the open lexicon from the settings document.
    pub async fn unpublish(&mut self) -> Result<()> {
        let name = self.saved_name()?;
        let document = self.settings_document().await?;
        let url = document
            .references(&self.language)
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.url.clone())
            .or_else(|| self.config.publish_url(&name))
            .ok_or(LexiconError::NoPublishUrl)?;
        self.settings.remove_reference(&self.language, &url).await?;
        log::info!("Unpublished {}", name);
        Ok(())
    }

    /// Move a stored lexicon to the deleted area. Deleting the open lexicon
    /// closes it.
    pub async fn delete(&mut self, name: &str) -> Result<()> {
        if self.is_published(name).await? {
            return Err(LexiconError::Published(name.to_string()));
        }
        self.blobs.delete(name).await?;
        self.lexicon_names.retain(|n| n != name);
        log::info!("Deleted {}", name);

        if self.filename.as_deref() == Some(name) {
            self.reset();
        }
        Ok(())
    }

    // ========================================================================
    // Preview
    // ========================================================================

    /// TTS preview request for the entry at `index`, `None` for a blank entry.
    pub fn preview_request(&self, index: usize) -> Result<Option<PreviewRequest>> {
        self.require_open()?;
        let entry = self
            .current
            .get(index)
            .ok_or(LexiconError::EntryIndexOutOfRange(index))?;
        Ok(PreviewRequest::for_entry(
            entry,
            &self.language,
            self.filename.as_deref(),
        ))
    }

    /// Preview URL and SSML for the entry at `index` on the configured
    /// preview service. The SSML references the lexicon's published URL once
    /// the lexicon has a file name.
    pub fn preview(&self, index: usize) -> Result<Option<PreviewLink>> {
        let endpoint = self
            .config
            .preview_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(LexiconError::NoPreviewUrl)?;
        let lexicon_url = self
            .filename
            .as_deref()
            .and_then(|name| self.config.publish_url(name));
        Ok(self
            .preview_request(index)?
            .map(|request| request.link(endpoint, lexicon_url.as_deref())))
    }
}

fn action_label(action: &PendingAction) -> String {
    match action {
        PendingAction::Open { name } => format!("open {}", name),
        PendingAction::Import { file_name, .. } => format!("import {}", file_name),
        PendingAction::Duplicate { source, new_name } => {
            format!("duplicate {} as {}", source, new_name)
        }
        PendingAction::NewLexicon { language } => format!("new {} lexicon", language),
    }
}
