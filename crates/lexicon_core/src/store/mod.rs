//! Collaborator interfaces.
//!
//! The editing core never talks to storage, the publish pipeline or the auth
//! layer directly. It goes through the object-safe async traits defined here:
//!
//! - [`BlobStore`]: lexicon files (`list`/`get`/`put`/`delete`)
//! - [`SettingsStore`]: the published-lexicon settings document
//! - [`TokenProvider`]: best-effort bearer token for writes
//!
//! Every method returns a boxed future so implementations can be backed by
//! HTTP calls in a browser host, or complete immediately for in-memory and
//! directory stores.
//!
//! ## Reference implementations
//!
//! - [`InMemoryBlobStore`]: shared-clone store for hosts and tests
//! - [`DirectoryBlobStore`]: one file per blob under a root directory (native only)
//! - [`StagedSettingsStore`]: backup, validate, stage and promote the settings
//!   document on top of any [`BlobStore`]

mod memory;
#[cfg(not(target_arch = "wasm32"))]
mod native;
mod settings;

pub use memory::InMemoryBlobStore;
#[cfg(not(target_arch = "wasm32"))]
pub use native::DirectoryBlobStore;
pub use settings::{
    BACKUP_NAMESPACE, DEFAULT_MAX_BACKUPS, LexiconReference, NoCheck, ReachabilityCheck,
    SETTINGS_NAME, STAGING_NAME, SettingsDocument, StagedSettingsStore,
};

use std::future::Future;
use std::pin::Pin;

use crate::error::StoreError;

#[cfg(test)]
pub(crate) fn block_on_test<F: Future>(f: F) -> F::Output {
    futures_lite::future::block_on(f)
}

/// Result of a collaborator call.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A boxed future for object-safe async methods.
///
/// On native targets, futures are `Send` for compatibility with multi-threaded runtimes.
#[cfg(not(target_arch = "wasm32"))]
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A boxed future for object-safe async methods.
///
/// WASM version without `Send` requirement - JavaScript is single-threaded.
#[cfg(target_arch = "wasm32")]
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// `Send + Sync` on native targets, nothing on WASM.
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSendSync: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync + ?Sized> MaybeSendSync for T {}

/// `Send + Sync` on native targets, nothing on WASM.
#[cfg(target_arch = "wasm32")]
pub trait MaybeSendSync {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> MaybeSendSync for T {}

/// Namespace that deleted lexicons are moved into.
pub const DELETED_NAMESPACE: &str = "deleted";

/// Key-value store holding lexicon documents.
///
/// Names are flat (`brands.xml`). Names containing `/` live in reserved
/// namespaces (`deleted/`, `backups/`, `staging/`) and are never returned by
/// [`BlobStore::list`].
pub trait BlobStore: MaybeSendSync {
    /// Names of all top-level blobs, sorted.
    fn list(&self) -> BoxFuture<'_, StoreResult<Vec<String>>>;

    /// Names inside a reserved namespace, as `namespace/name`, sorted.
    fn list_namespace<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, StoreResult<Vec<String>>>;

    /// Blob text. `StoreError::NotFound` when missing.
    fn get<'a>(&'a self, name: &'a str) -> BoxFuture<'a, StoreResult<String>>;

    /// Create or overwrite a blob. `bearer` is attached when the backend
    /// needs authorization and ignored otherwise.
    fn put<'a>(
        &'a self,
        name: &'a str,
        text: &'a str,
        content_type: &'a str,
        bearer: Option<&'a str>,
    ) -> BoxFuture<'a, StoreResult<()>>;

    /// Soft delete: move the blob into the `deleted/` namespace.
    fn delete<'a>(&'a self, name: &'a str) -> BoxFuture<'a, StoreResult<()>>;

    /// Erase a blob for good. Used for pruning backups and staging copies.
    fn purge<'a>(&'a self, name: &'a str) -> BoxFuture<'a, StoreResult<()>>;

    /// Whether a top-level blob exists.
    fn exists<'a>(&'a self, name: &'a str) -> BoxFuture<'a, StoreResult<bool>> {
        Box::pin(async move { Ok(self.list().await?.iter().any(|n| n == name)) })
    }
}

/// The publish/settings collaborator.
///
/// Add and remove are single fallible calls; the implementation owns backup,
/// validation and promotion.
pub trait SettingsStore: MaybeSendSync {
    /// The current settings document as XML.
    fn get_document(&self) -> BoxFuture<'_, StoreResult<String>>;

    /// Publish `name` at `url` for `language`.
    fn add_reference<'a>(
        &'a self,
        language: &'a str,
        name: &'a str,
        url: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>>;

    /// Unpublish the reference with `url` for `language`.
    fn remove_reference<'a>(&'a self, language: &'a str, url: &'a str)
    -> BoxFuture<'a, StoreResult<()>>;
}

/// Source of an access token for authenticated writes.
pub trait TokenProvider: MaybeSendSync {
    /// `None` when no token is available; callers proceed without one.
    fn access_token(&self) -> BoxFuture<'_, Option<String>>;
}

/// Token provider for unauthenticated setups.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoToken;

impl TokenProvider for NoToken {
    fn access_token(&self) -> BoxFuture<'_, Option<String>> {
        Box::pin(async move { None })
    }
}

/// Token provider returning a fixed token.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    fn access_token(&self) -> BoxFuture<'_, Option<String>> {
        Box::pin(async move { Some(self.0.clone()) })
    }
}

/// Reject names that could escape the store or enter a reserved namespace.
pub fn check_blob_name(name: &str) -> StoreResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed == "."
        || trimmed == ".."
    {
        return Err(StoreError::Rejected(format!("invalid blob name '{}'", name)));
    }
    Ok(())
}

/// Same as [`check_blob_name`] but allows one `namespace/` prefix.
pub(crate) fn check_qualified_name(name: &str) -> StoreResult<()> {
    match name.split_once('/') {
        Some((namespace, rest)) => {
            check_blob_name(namespace)?;
            check_blob_name(rest)
        }
        None => check_blob_name(name),
    }
}
