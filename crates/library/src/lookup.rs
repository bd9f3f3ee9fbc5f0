use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// A remembered lookup: the resolved source and its cache entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Memoized {
    pub(crate) source: PathBuf,
    pub(crate) cache: PathBuf,
}

/// Identifier → last known good thumbnail, for skipping resolution on
/// repeated lookups. Purely in-memory.
#[derive(Default)]
pub(crate) struct Memo {
    entries: RwLock<HashMap<String, Memoized>>,
}
impl Memo {
    pub(crate) async fn get(&self, identifier: &str) -> Option<Memoized> {
        self.entries.read().await.get(identifier).cloned()
    }

    pub(crate) async fn insert(&self, identifier: &str, source: PathBuf, cache: PathBuf) {
        self.entries.write().await.insert(identifier.to_string(), Memoized { source, cache });
    }

    pub(crate) async fn remove(&self, identifier: &str) {
        self.entries.write().await.remove(identifier);
    }

    /// Forgets everything. Returns how many entries were dropped.
    pub(crate) async fn clear(&self) -> usize {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        count
    }

    pub(crate) async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
