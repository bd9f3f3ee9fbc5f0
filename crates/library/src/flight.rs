use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per cache path, created on demand.
///
/// Holding the guard returned by [`lock`](Self::lock) means nobody else is in
/// a check-then-render sequence for the same cache file. Entries are only
/// weakly held, so the map never grows beyond the paths currently in flight
/// (plus whatever dead entries haven't been swept yet).
#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<PathBuf, Weak<AsyncMutex<()>>>>,
}
impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &Path) -> OwnedMutexGuard<()> {
        let mutex = {
            // Never held across an await.
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            match locks.get(key).and_then(Weak::upgrade) {
                Some(mutex) => mutex,
                None => {
                    locks.retain(|_, weak| weak.strong_count() > 0);
                    let mutex = Arc::new(AsyncMutex::new(()));
                    locks.insert(key.to_path_buf(), Arc::downgrade(&mutex));
                    mutex
                },
            }
        };
        mutex.lock_owned().await
    }

    /// Number of keys with a live lock.
    pub fn in_flight(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.values().filter(|weak| weak.strong_count() > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let (locks, inside, max) = (locks.clone(), inside.clone(), max.clone());
                tokio::spawn(async move {
                    let _guard = locks.lock(Path::new("/cache/a.jpg")).await;
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(max.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.lock(Path::new("/cache/a.jpg")).await;
        let b = tokio::time::timeout(Duration::from_secs(1), locks.lock(Path::new("/cache/b.jpg"))).await;
        assert!(b.is_ok());
        assert_eq!(locks.in_flight(), 2);
    }

    #[tokio::test]
    async fn test_released_locks_are_forgotten() {
        let locks = KeyedLocks::new();
        drop(locks.lock(Path::new("/cache/a.jpg")).await);
        assert_eq!(locks.in_flight(), 0);
        // Re-locking after release works and doesn't deadlock.
        let _a = locks.lock(Path::new("/cache/a.jpg")).await;
        assert_eq!(locks.in_flight(), 1);
    }
}
