//! Observable key-value preference store.
//!
//! One store per namespace. Readers get the current snapshot immediately and
//! then every later one; a slow reader may skip intermediate snapshots but
//! always ends on the latest.

use std::collections::BTreeMap;

use reportline_common::AppResult;
use reportline_db::repositories::PreferenceRepository;
use serde_json::Value;
use tokio::sync::{watch, Mutex};
use tokio_stream::wrappers::WatchStream;

/// A namespace's key-value contents.
pub type PreferenceMap = BTreeMap<String, Value>;

/// Persistent, observable preference namespace.
pub struct PreferenceStore {
    namespace: String,
    repo: PreferenceRepository,
    snapshot: watch::Sender<PreferenceMap>,
    write_lock: Mutex<()>,
}

impl PreferenceStore {
    /// Open a namespace, loading whatever is already persisted.
    pub async fn open(repo: PreferenceRepository, namespace: impl Into<String>) -> AppResult<Self> {
        let namespace = namespace.into();
        let rows = repo.get_namespace(&namespace).await?;
        let map: PreferenceMap = rows.into_iter().map(|row| (row.key, row.value)).collect();

        tracing::debug!(namespace = %namespace, keys = map.len(), "Opened preference store");

        let (snapshot, _) = watch::channel(map);
        Ok(Self {
            namespace,
            repo,
            snapshot,
            write_lock: Mutex::new(()),
        })
    }

    /// Namespace this store covers.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Point-in-time read.
    #[must_use]
    pub fn snapshot(&self) -> PreferenceMap {
        self.snapshot.borrow().clone()
    }

    /// Stream of snapshots, starting with the current one.
    #[must_use]
    pub fn read(&self) -> WatchStream<PreferenceMap> {
        WatchStream::new(self.snapshot.subscribe())
    }

    /// Write a single key.
    pub async fn write(&self, key: impl Into<String>, value: Value) -> AppResult<()> {
        self.write_many(vec![(key.into(), value)]).await
    }

    /// Write several keys atomically. Readers never observe a partial write.
    pub async fn write_many(&self, entries: Vec<(String, Value)>) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;

        self.repo.put_many(&self.namespace, &entries).await?;

        self.snapshot.send_modify(|map| map.extend(entries));
        Ok(())
    }
}
