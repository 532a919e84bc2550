use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{
    BlobStore, BoxFuture, DELETED_NAMESPACE, StoreResult, check_blob_name, check_qualified_name,
};
use crate::error::StoreError;

#[derive(Debug, Clone)]
struct StoredBlob {
    text: String,
    content_type: String,
}

#[derive(Debug, Default)]
struct Inner {
    blobs: BTreeMap<String, StoredBlob>,
    writes: usize,
    last_bearer: Option<String>,
}

/// Blob store kept in memory.
///
/// Clones share the same storage, so a host can hand one clone to a session
/// and keep another for inspection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBlobStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryBlobStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a blob (builder pattern).
    pub fn with_blob(self, name: &str, text: &str) -> Self {
        self.lock().blobs.insert(
            name.to_string(),
            StoredBlob {
                text: text.to_string(),
                content_type: "application/pls+xml".to_string(),
            },
        );
        self
    }

    /// Text of any blob, including reserved namespaces.
    pub fn text(&self, name: &str) -> Option<String> {
        self.lock().blobs.get(name).map(|b| b.text.clone())
    }

    /// Content type recorded by the last `put` of `name`.
    pub fn content_type(&self, name: &str) -> Option<String> {
        self.lock().blobs.get(name).map(|b| b.content_type.clone())
    }

    /// Number of successful `put` calls.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Bearer token passed to the most recent `put`.
    pub fn last_bearer(&self) -> Option<String> {
        self.lock().last_bearer.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn list_sync(&self) -> Vec<String> {
        self.lock()
            .blobs
            .keys()
            .filter(|name| !name.contains('/'))
            .cloned()
            .collect()
    }

    fn list_namespace_sync(&self, namespace: &str) -> StoreResult<Vec<String>> {
        check_blob_name(namespace)?;
        let prefix = format!("{}/", namespace);
        Ok(self
            .lock()
            .blobs
            .keys()
            .filter(|name| name.starts_with(&prefix))
            .cloned()
            .collect())
    }

    fn get_sync(&self, name: &str) -> StoreResult<String> {
        check_qualified_name(name)?;
        self.lock()
            .blobs
            .get(name)
            .map(|b| b.text.clone())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn put_sync(
        &self,
        name: &str,
        text: &str,
        content_type: &str,
        bearer: Option<&str>,
    ) -> StoreResult<()> {
        check_qualified_name(name)?;
        let mut inner = self.lock();
        inner.blobs.insert(
            name.to_string(),
            StoredBlob {
                text: text.to_string(),
                content_type: content_type.to_string(),
            },
        );
        inner.writes += 1;
        inner.last_bearer = bearer.map(str::to_string);
        Ok(())
    }

    fn delete_sync(&self, name: &str) -> StoreResult<()> {
        check_blob_name(name)?;
        let mut inner = self.lock();
        let blob = inner
            .blobs
            .remove(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        let mut target = format!("{}/{}", DELETED_NAMESPACE, name);
        let mut n = 1;
        while inner.blobs.contains_key(&target) {
            target = format!("{}/{}.{}", DELETED_NAMESPACE, name, n);
            n += 1;
        }
        inner.blobs.insert(target, blob);
        Ok(())
    }

    fn purge_sync(&self, name: &str) -> StoreResult<()> {
        check_qualified_name(name)?;
        self.lock()
            .blobs
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }
}

impl BlobStore for InMemoryBlobStore {
    fn list(&self) -> BoxFuture<'_, StoreResult<Vec<String>>> {
        Box::pin(async move { Ok(self.list_sync()) })
    }

    fn list_namespace<'a>(
        &'a self,
        namespace: &'a str,
    ) -> BoxFuture<'a, StoreResult<Vec<String>>> {
        Box::pin(async move { self.list_namespace_sync(namespace) })
    }

    fn get<'a>(&'a self, name: &'a str) -> BoxFuture<'a, StoreResult<String>> {
        Box::pin(async move { self.get_sync(name) })
    }

    fn put<'a>(
        &'a self,
        name: &'a str,
        text: &'a str,
        content_type: &'a str,
        bearer: Option<&'a str>,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move { self.put_sync(name, text, content_type, bearer) })
    }

    fn delete<'a>(&'a self, name: &'a str) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move { self.delete_sync(name) })
    }

    fn purge<'a>(&'a self, name: &'a str) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move { self.purge_sync(name) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::block_on_test;

    #[test]
    fn test_list_hides_namespaces() {
        let store = InMemoryBlobStore::new()
            .with_blob("b.xml", "<b/>")
            .with_blob("a.xml", "<a/>")
            .with_blob("backups/settings-1.xml", "<s/>");
        assert_eq!(block_on_test(store.list()).unwrap(), vec!["a.xml", "b.xml"]);
        assert_eq!(
            block_on_test(store.list_namespace("backups")).unwrap(),
            vec!["backups/settings-1.xml"]
        );
    }

    #[test]
    fn test_delete_moves_into_deleted_namespace() {
        let store = InMemoryBlobStore::new().with_blob("a.xml", "one");
        block_on_test(store.delete("a.xml")).unwrap();
        block_on_test(store.put("a.xml", "two", "text/plain", None)).unwrap();
        block_on_test(store.delete("a.xml")).unwrap();

        assert!(block_on_test(store.list()).unwrap().is_empty());
        assert_eq!(store.text("deleted/a.xml").as_deref(), Some("one"));
        assert_eq!(store.text("deleted/a.xml.1").as_deref(), Some("two"));
        assert!(matches!(
            block_on_test(store.delete("a.xml")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_put_records_writes_and_bearer() {
        let store = InMemoryBlobStore::new();
        let shared = store.clone();
        block_on_test(store.put("a.xml", "x", "application/pls+xml", Some("tok"))).unwrap();
        assert_eq!(shared.write_count(), 1);
        assert_eq!(shared.last_bearer().as_deref(), Some("tok"));
        assert!(block_on_test(shared.exists("a.xml")).unwrap());
    }

    #[test]
    fn test_rejects_path_like_names() {
        let store = InMemoryBlobStore::new();
        assert!(matches!(
            block_on_test(store.put("../a.xml", "x", "text/plain", None)),
            Err(StoreError::Rejected(_))
        ));
        assert!(block_on_test(store.delete("backups/x.xml")).is_err());
    }
}
