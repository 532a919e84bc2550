//! The published-lexicon settings document and a store that edits it safely.
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <settings>
//!   <lexicons xml:lang="en-US">
//!     <lexicon name="brands.xml" url="https://cdn.example.com/lexicons/brands.xml"/>
//!   </lexicons>
//! </settings>
//! ```
//!
//! Every change made through [`StagedSettingsStore`] goes through the same
//! steps: back up the current document, apply the change, validate the
//! result, write it to a staging slot, then promote the staged copy.

use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::{BlobStore, BoxFuture, MaybeSendSync, SettingsStore, StoreResult};
use crate::error::StoreError;

/// Blob name of the live settings document.
pub const SETTINGS_NAME: &str = "settings.xml";
/// Blob name the candidate document is staged under before promotion.
pub const STAGING_NAME: &str = "staging/settings.xml";
/// Namespace holding timestamped backups.
pub const BACKUP_NAMESPACE: &str = "backups";
/// Backups kept when no limit is configured.
pub const DEFAULT_MAX_BACKUPS: usize = 20;

const SETTINGS_CONTENT_TYPE: &str = "application/xml";

/// One published lexicon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LexiconReference {
    /// Blob name, e.g. `brands.xml`
    pub name: String,
    /// Public URL the TTS service loads
    pub url: String,
}

/// Published lexicons grouped by language, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SettingsDocument {
    /// Language tag to its references
    pub languages: IndexMap<String, Vec<LexiconReference>>,
}

fn invalid(message: impl std::fmt::Display) -> StoreError {
    StoreError::Rejected(format!("Invalid settings document: {}", message))
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> StoreResult<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(invalid)?;
        if attr.key.as_ref() == name {
            return Ok(Some(attr.unescape_value().map_err(invalid)?.into_owned()));
        }
    }
    Ok(None)
}

impl SettingsDocument {
    /// Parse the XML form. Blank text is an empty document.
    pub fn parse(text: &str) -> StoreResult<Self> {
        let mut document = Self::default();
        if text.trim().is_empty() {
            return Ok(document);
        }

        let mut reader = Reader::from_str(text.trim_start_matches('\u{feff}'));
        let mut saw_root = false;
        let mut language: Option<String> = None;

        loop {
            match reader.read_event().map_err(invalid)? {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let name = e.local_name();
                    let name = name.as_ref();
                    if !saw_root {
                        if name != b"settings" {
                            return Err(invalid(format!(
                                "root element is <{}>, expected <settings>",
                                String::from_utf8_lossy(name)
                            )));
                        }
                        saw_root = true;
                        continue;
                    }
                    match name {
                        b"lexicons" => {
                            let lang = attribute(e, b"xml:lang")?
                                .filter(|l| !l.trim().is_empty())
                                .ok_or_else(|| invalid("<lexicons> without xml:lang"))?;
                            document.languages.entry(lang.clone()).or_default();
                            language = Some(lang);
                        }
                        b"lexicon" => {
                            let lang = language
                                .clone()
                                .ok_or_else(|| invalid("<lexicon> outside <lexicons>"))?;
                            let url = attribute(e, b"url")?
                                .filter(|u| !u.trim().is_empty())
                                .ok_or_else(|| invalid("<lexicon> without url"))?;
                            let name = attribute(e, b"name")?
                                .unwrap_or_else(|| name_from_url(&url).to_string());
                            document.add(&lang, &name, &url);
                        }
                        _ => {}
                    }
                }
                Event::End(ref e) => {
                    if e.local_name().as_ref() == b"lexicons" {
                        language = None;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_root {
            return Err(invalid("no <settings> root element"));
        }
        Ok(document)
    }

    /// Canonical XML form.
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<settings>\n");
        for (language, references) in &self.languages {
            out.push_str(&format!("  <lexicons xml:lang=\"{}\">\n", escape(language)));
            for reference in references {
                out.push_str(&format!(
                    "    <lexicon name=\"{}\" url=\"{}\"/>\n",
                    escape(&reference.name),
                    escape(&reference.url)
                ));
            }
            out.push_str("  </lexicons>\n");
        }
        out.push_str("</settings>\n");
        out
    }

    /// Add a reference. Returns `false` when `url` is already listed for `language`.
    pub fn add(&mut self, language: &str, name: &str, url: &str) -> bool {
        let references = self.languages.entry(language.to_string()).or_default();
        if references.iter().any(|r| r.url == url) {
            return false;
        }
        references.push(LexiconReference {
            name: name.to_string(),
            url: url.to_string(),
        });
        true
    }

    /// Remove the reference with `url`. Returns `false` when it was not listed.
    pub fn remove_by_url(&mut self, language: &str, url: &str) -> bool {
        let Some(references) = self.languages.get_mut(language) else {
            return false;
        };
        let before = references.len();
        references.retain(|r| r.url != url);
        before != references.len()
    }

    /// References for one language, in document order.
    pub fn references(&self, language: &str) -> &[LexiconReference] {
        self.languages.get(language).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether a lexicon with this blob name is referenced for any language.
    pub fn references_name(&self, name: &str) -> bool {
        self.languages
            .values()
            .flatten()
            .any(|r| r.name == name || name_from_url(&r.url) == name)
    }
}

/// Last path segment of a URL, without query or fragment.
fn name_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

/// Check run before a URL is published.
pub trait ReachabilityCheck: MaybeSendSync {
    /// `Ok` when `url` serves an XML document.
    fn check<'a>(&'a self, url: &'a str) -> BoxFuture<'a, StoreResult<()>>;
}

/// Check that accepts every URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCheck;

impl ReachabilityCheck for NoCheck {
    fn check<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move { Ok(()) })
    }
}

/// [`SettingsStore`] keeping the document in a [`BlobStore`].
///
/// Layout inside the blob store:
///
/// - `settings.xml`: the live document
/// - `staging/settings.xml`: candidate during a change
/// - `backups/settings-<timestamp>-<seq>.xml`: previous versions, newest kept
pub struct StagedSettingsStore<B, P = NoCheck> {
    blobs: B,
    reachability: P,
    max_backups: usize,
}

impl<B: BlobStore> StagedSettingsStore<B, NoCheck> {
    /// Store over `blobs` with no reachability check and the default backup cap.
    pub fn new(blobs: B) -> Self {
        Self {
            blobs,
            reachability: NoCheck,
            max_backups: DEFAULT_MAX_BACKUPS,
        }
    }
}

impl<B: BlobStore, P: ReachabilityCheck> StagedSettingsStore<B, P> {
    /// Replace the check run before publishing.
    pub fn with_reachability_check<Q: ReachabilityCheck>(
        self,
        reachability: Q,
    ) -> StagedSettingsStore<B, Q> {
        StagedSettingsStore {
            blobs: self.blobs,
            reachability,
            max_backups: self.max_backups,
        }
    }

    /// Number of backups to keep (at least one).
    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups.max(1);
        self
    }

    /// Underlying blob store.
    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    /// Current document text, `None` when no document exists yet.
    async fn current_text(&self) -> StoreResult<Option<String>> {
        match self.blobs.get(SETTINGS_NAME).await {
            Ok(text) => Ok(Some(text)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Parsed current document (empty when none exists).
    pub async fn load(&self) -> StoreResult<SettingsDocument> {
        match self.current_text().await? {
            Some(text) => SettingsDocument::parse(&text),
            None => Ok(SettingsDocument::default()),
        }
    }

    async fn backup(&self, previous: &str) -> StoreResult<()> {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%3f").to_string();
        let existing = self.blobs.list_namespace(BACKUP_NAMESPACE).await?;
        let prefix = format!("{}/settings-{}-", BACKUP_NAMESPACE, stamp);
        let seq = existing
            .iter()
            .filter_map(|n| n.strip_prefix(&prefix)?.strip_suffix(".xml")?.parse::<usize>().ok())
            .max()
            .map_or(0, |last| last + 1);
        let name = format!("{}{:03}.xml", prefix, seq);

        self.blobs
            .put(&name, previous, SETTINGS_CONTENT_TYPE, None)
            .await?;
        log::debug!("Backed up settings to {}", name);

        let mut backups = existing;
        backups.push(name);
        backups.sort();
        if backups.len() > self.max_backups {
            let excess = backups.len() - self.max_backups;
            for old in &backups[..excess] {
                self.blobs.purge(old).await?;
                log::debug!("Pruned settings backup {}", old);
            }
        }
        Ok(())
    }

    /// Back up, validate, stage and promote `document`.
    async fn commit(&self, previous: Option<&str>, document: &SettingsDocument) -> StoreResult<()> {
        let candidate = document.to_xml();
        SettingsDocument::parse(&candidate)?;

        if let Some(previous) = previous {
            self.backup(previous).await?;
        }

        self.blobs
            .put(STAGING_NAME, &candidate, SETTINGS_CONTENT_TYPE, None)
            .await?;
        let staged = self.blobs.get(STAGING_NAME).await?;
        if SettingsDocument::parse(&staged)? != *document {
            return Err(StoreError::Rejected(
                "staged settings do not match the requested change".to_string(),
            ));
        }
        self.blobs
            .put(SETTINGS_NAME, &staged, SETTINGS_CONTENT_TYPE, None)
            .await?;
        self.blobs.purge(STAGING_NAME).await?;
        log::info!("Promoted settings document");
        Ok(())
    }

    async fn add(&self, language: &str, name: &str, url: &str) -> StoreResult<()> {
        self.reachability.check(url).await?;

        let previous = self.current_text().await?;
        let mut document = match &previous {
            Some(text) => SettingsDocument::parse(text)?,
            None => SettingsDocument::default(),
        };
        if !document.add(language, name, url) {
            log::debug!("{} already published for {}", url, language);
            return Ok(());
        }
        self.commit(previous.as_deref(), &document).await
    }

    async fn remove(&self, language: &str, url: &str) -> StoreResult<()> {
        let Some(previous) = self.current_text().await? else {
            return Err(StoreError::NotFound(url.to_string()));
        };
        let mut document = SettingsDocument::parse(&previous)?;
        if !document.remove_by_url(language, url) {
            return Err(StoreError::NotFound(url.to_string()));
        }
        self.commit(Some(&previous), &document).await
    }
}

impl<B: BlobStore, P: ReachabilityCheck> SettingsStore for StagedSettingsStore<B, P> {
    fn get_document(&self) -> BoxFuture<'_, StoreResult<String>> {
        Box::pin(async move {
            Ok(self
                .current_text()
                .await?
                .unwrap_or_else(|| SettingsDocument::default().to_xml()))
        })
    }

    fn add_reference<'a>(
        &'a self,
        language: &'a str,
        name: &'a str,
        url: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(self.add(language, name, url))
    }

    fn remove_reference<'a>(
        &'a self,
        language: &'a str,
        url: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(self.remove(language, url))
    }
}
