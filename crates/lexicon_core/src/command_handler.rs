//! Command execution handler.
//!
//! This module contains the implementation of the `execute()` method for
//! [`EditingSession`]. It maps each [`Command`] onto a session call.

use crate::codec;
use crate::command::{Command, Response, SessionState};
use crate::error::Result;
use crate::session::EditingSession;
use crate::store::{BlobStore, SettingsStore, TokenProvider};
use crate::validate;

impl<B: BlobStore, S: SettingsStore, T: TokenProvider> EditingSession<B, S, T> {
    /// Execute a command and return the response.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use lexicon_core::command::{Command, Response};
    ///
    /// let response = session.execute(Command::Publish).await?;
    /// if let Response::String(url) = response {
    ///     println!("Published at {}", url);
    /// }
    /// ```
    pub async fn execute(&mut self, command: Command) -> Result<Response> {
        match command {
            // === Session ===
            Command::GetState => Ok(Response::State(self.state())),

            Command::LoadLexiconNames => {
                let names = self.load_lexicon_names().await?;
                Ok(Response::Strings(names.to_vec()))
            }

            Command::RefreshLexiconNames => {
                let names = self.refresh_lexicon_names().await?;
                Ok(Response::Strings(names.to_vec()))
            }

            // === Open / import ===
            Command::Open { name } => Ok(Response::Action(self.open(&name).await?)),

            Command::Import {
                file_name,
                contents,
            } => Ok(Response::Action(self.import(&file_name, &contents).await?)),

            Command::Duplicate { source, new_name } => {
                Ok(Response::Action(self.duplicate(&source, &new_name).await?))
            }

            Command::NewLexicon { language } => Ok(Response::Action(
                self.new_lexicon(language.as_deref()).await?,
            )),

            Command::ResolvePending { choice } => {
                Ok(Response::Action(self.resolve_pending(choice).await?))
            }

            // === Entry editing ===
            Command::AddEntry => Ok(Response::Index(self.add_entry()?)),

            Command::InsertEntry { entry } => Ok(Response::Index(self.insert_entry(entry)?)),

            Command::UpdateEntry { index, entry } => {
                Ok(Response::Index(self.update_entry(index, entry)?))
            }

            Command::RemoveEntry { index } => Ok(Response::Entry(self.remove_entry(index)?)),

            Command::Select { index } => {
                self.select(index)?;
                Ok(Response::Ok)
            }

            Command::SetLanguage { language } => {
                self.set_language(&language)?;
                Ok(Response::Ok)
            }

            Command::Validate => Ok(Response::Validation(self.validation().clone())),

            Command::FilterInput { field, text } => {
                Ok(Response::String(validate::filter_input(field, &text)))
            }

            // === Persistence ===
            Command::Save => {
                self.save().await?;
                Ok(Response::Ok)
            }

            Command::SaveAs { name, overwrite } => {
                Ok(Response::SaveAs(self.save_as(&name, overwrite).await?))
            }

            Command::Export { format } => Ok(Response::File(self.export(format)?)),

            Command::Convert {
                file_name,
                contents,
                to,
            } => {
                let lexicon =
                    codec::decode_file(&file_name, &contents, &self.config().default_language)?;
                Ok(Response::String(codec::encode(to, &lexicon)))
            }

            // === Merge ===
            Command::BeginMerge {
                file_name,
                contents,
            } => Ok(Response::Merge(self.begin_merge(&file_name, &contents)?)),

            Command::GetConflicts => Ok(Response::Conflicts(self.conflicts().to_vec())),

            Command::ResolveConflict { index, resolution } => {
                self.resolve_conflict(index, resolution)?;
                Ok(Response::Ok)
            }

            Command::ResolveAllConflicts {
                resolution,
                conflict_type,
            } => Ok(Response::Index(
                self.resolve_all_conflicts(resolution, conflict_type)?,
            )),

            Command::FinalizeMerge => Ok(Response::MergeSummary(self.finalize_merge()?)),

            Command::CancelMerge => {
                self.cancel_merge()?;
                Ok(Response::Ok)
            }

            // === Publishing ===
            Command::Publish => Ok(Response::String(self.publish().await?)),

            Command::Unpublish => {
                self.unpublish().await?;
                Ok(Response::Ok)
            }

            Command::IsPublished { name } => Ok(Response::Bool(self.is_published(&name).await?)),

            Command::Delete { name } => {
                self.delete(&name).await?;
                Ok(Response::Ok)
            }

            // === Preview ===
            Command::Preview { index } => Ok(Response::Preview(self.preview(index)?)),
        }
    }

    /// Snapshot for [`Command::GetState`].
    pub fn state(&self) -> SessionState {
        SessionState {
            mode: self.mode(),
            filename: self.filename().map(str::to_string),
            language: self.language().to_string(),
            entries: self.entries().to_vec(),
            selected: self.selected(),
            pending_action: self.pending_action().cloned(),
            merge_in_progress: self.has_pending_merge(),
            lexicon_names: self.lexicon_names().to_vec(),
            load_error: self.load_error().map(str::to_string),
        }
    }
}
