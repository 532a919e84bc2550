//! Directory-backed blob store.
//!
//! Only available on non-WASM targets.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{
    BlobStore, BoxFuture, DELETED_NAMESPACE, StoreResult, check_blob_name, check_qualified_name,
};
use crate::error::StoreError;

/// One file per blob under `root`. Reserved namespaces are subdirectories.
///
/// The content type and bearer token are accepted and ignored; the file
/// system has no use for either.
#[derive(Debug, Clone)]
pub struct DirectoryBlobStore {
    root: PathBuf,
}

fn map_io(name: &str, err: std::io::Error) -> StoreError {
    if err.kind() == ErrorKind::NotFound {
        StoreError::NotFound(name.to_string())
    } else {
        StoreError::Io(err)
    }
}

fn sorted_file_names(dir: &Path) -> StoreResult<Vec<String>> {
    let mut names = Vec::new();
    if !dir.is_dir() {
        return Ok(names);
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

impl DirectoryBlobStore {
    /// Store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the blobs.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> PathBuf {
        name.split('/').fold(self.root.clone(), |path, part| path.join(part))
    }

    fn list_sync(&self) -> StoreResult<Vec<String>> {
        sorted_file_names(&self.root)
    }

    fn list_namespace_sync(&self, namespace: &str) -> StoreResult<Vec<String>> {
        check_blob_name(namespace)?;
        Ok(sorted_file_names(&self.root.join(namespace))?
            .into_iter()
            .map(|name| format!("{}/{}", namespace, name))
            .collect())
    }

    fn get_sync(&self, name: &str) -> StoreResult<String> {
        check_qualified_name(name)?;
        fs::read_to_string(self.path_for(name)).map_err(|e| map_io(name, e))
    }

    fn put_sync(&self, name: &str, text: &str) -> StoreResult<()> {
        check_qualified_name(name)?;
        let path = self.path_for(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, text)?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }

    fn delete_sync(&self, name: &str) -> StoreResult<()> {
        check_blob_name(name)?;
        let from = self.root.join(name);
        if !from.is_file() {
            return Err(StoreError::NotFound(name.to_string()));
        }

        let deleted_dir = self.root.join(DELETED_NAMESPACE);
        fs::create_dir_all(&deleted_dir)?;
        let mut to = deleted_dir.join(name);
        let mut n = 1;
        while to.exists() {
            to = deleted_dir.join(format!("{}.{}", name, n));
            n += 1;
        }
        fs::rename(&from, &to)?;
        log::info!("Moved {} to {}", from.display(), to.display());
        Ok(())
    }

    fn purge_sync(&self, name: &str) -> StoreResult<()> {
        check_qualified_name(name)?;
        fs::remove_file(self.path_for(name)).map_err(|e| map_io(name, e))
    }
}

impl BlobStore for DirectoryBlobStore {
    fn list(&self) -> BoxFuture<'_, StoreResult<Vec<String>>> {
        Box::pin(async move { self.list_sync() })
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
        _content_type: &'a str,
        _bearer: Option<&'a str>,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move { self.put_sync(name, text) })
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
    fn test_put_get_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryBlobStore::new(dir.path());
        block_on_test(store.put("b.xml", "<b/>", "application/pls+xml", None)).unwrap();
        block_on_test(store.put("a.xml", "<a/>", "application/pls+xml", None)).unwrap();
        block_on_test(store.put("staging/settings.xml", "<s/>", "application/xml", None)).unwrap();

        assert_eq!(block_on_test(store.list()).unwrap(), vec!["a.xml", "b.xml"]);
        assert_eq!(block_on_test(store.get("b.xml")).unwrap(), "<b/>");
        assert_eq!(
            block_on_test(store.list_namespace("staging")).unwrap(),
            vec!["staging/settings.xml"]
        );
    }

    #[test]
    fn test_missing_blob_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryBlobStore::new(dir.path());
        assert!(matches!(
            block_on_test(store.get("missing.xml")),
            Err(StoreError::NotFound(name)) if name == "missing.xml"
        ));
        assert!(block_on_test(store.list_namespace("backups")).unwrap().is_empty());
    }

    #[test]
    fn test_delete_moves_file_aside() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryBlobStore::new(dir.path());
        block_on_test(store.put("a.xml", "one", "application/pls+xml", None)).unwrap();
        block_on_test(store.delete("a.xml")).unwrap();

        assert!(!dir.path().join("a.xml").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("deleted").join("a.xml")).unwrap(),
            "one"
        );
        assert!(block_on_test(store.list()).unwrap().is_empty());
    }
}
