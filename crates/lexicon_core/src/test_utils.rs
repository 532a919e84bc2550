//! Test utilities for lexicon_core
//!
//! Shared fixtures and collaborator doubles used across the test modules.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::LexiconConfig;
use crate::error::StoreError;
use crate::retry::{RetryPolicy, Sleeper};
use crate::store::{BlobStore, BoxFuture, InMemoryBlobStore, StoreResult};

/// Two-entry en-US lexicon.
pub fn sample_pls() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<lexicon version="1.0" xmlns="http://www.w3.org/2005/01/pronunciation-lexicon"
         alphabet="ipa" xml:lang="en-US">
  <lexeme>
    <grapheme>Xerox</grapheme>
    <phoneme>ˈzɪərɑːks</phoneme>
  </lexeme>
  <lexeme>
    <grapheme>NASA</grapheme>
    <phoneme>ˈnæsə</phoneme>
  </lexeme>
</lexicon>
"#
    .to_string()
}

/// Config with a publish URL and the default retry policy.
pub fn test_config() -> LexiconConfig {
    let mut config = LexiconConfig::new(PathBuf::from("/tmp/lexicons"));
    config.lexicon_base_url = Some("https://cdn.example.com/lexicons/".to_string());
    config.list_retry = RetryPolicy::default();
    config
}

/// Records requested delays instead of sleeping. Clones share the record.
#[derive(Clone, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    /// Empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in order.
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        self.delays.lock().unwrap().push(duration);
        Box::pin(async {})
    }
}

/// Wraps an [`InMemoryBlobStore`], failing the first `failures` listings and
/// optionally every write.
pub struct FlakyBlobStore {
    inner: InMemoryBlobStore,
    failures: usize,
    fail_writes: bool,
    list_calls: AtomicUsize,
}

impl FlakyBlobStore {
    /// Fail the first `failures` listings.
    pub fn new(inner: InMemoryBlobStore, failures: usize) -> Self {
        Self {
            inner,
            failures,
            fail_writes: false,
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Make every `put` fail (builder pattern).
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Number of `list` calls made.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

impl BlobStore for FlakyBlobStore {
    fn list(&self) -> BoxFuture<'_, StoreResult<Vec<String>>> {
        let call = self.list_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            return Box::pin(async move {
                Err(StoreError::Unavailable(format!("listing failed ({})", call)))
            });
        }
        self.inner.list()
    }

    fn list_namespace<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, StoreResult<Vec<String>>> {
        self.inner.list_namespace(namespace)
    }

    fn get<'a>(&'a self, name: &'a str) -> BoxFuture<'a, StoreResult<String>> {
        self.inner.get(name)
    }

    fn put<'a>(
        &'a self,
        name: &'a str,
        text: &'a str,
        content_type: &'a str,
        bearer: Option<&'a str>,
    ) -> BoxFuture<'a, StoreResult<()>> {
        if self.fail_writes {
            return Box::pin(async move {
                Err(StoreError::Unavailable(format!("write of {} failed", name)))
            });
        }
        self.inner.put(name, text, content_type, bearer)
    }

    fn delete<'a>(&'a self, name: &'a str) -> BoxFuture<'a, StoreResult<()>> {
        self.inner.delete(name)
    }

    fn purge<'a>(&'a self, name: &'a str) -> BoxFuture<'a, StoreResult<()>> {
        self.inner.purge(name)
    }
}
