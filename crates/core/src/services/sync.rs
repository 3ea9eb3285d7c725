//! Report list synchronization and submission.
//!
//! [`SyncCoordinator`] owns the observable list state: the latest snapshot,
//! a loading flag, and the last error. Snapshots arrive from a live
//! subscription or from explicit refreshes, and the last applied one wins.
//! Submission does not touch the list; the new report shows up through the
//! subscription, or through a refresh when no subscription is active.

use std::sync::{Arc, Mutex, PoisonError};

use futures::StreamExt;
use reportline_common::{AppError, AppResult};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::draft::DraftCoordinator;
use super::identity::IdentityPreferences;
use super::report_store::ReportStore;
use crate::models::{Report, ReportList};

/// Observable list state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    /// Latest snapshot, newest first.
    pub reports: ReportList,
    /// A refresh is in flight.
    pub is_loading: bool,
    /// Message of the last fetch or subscription failure.
    pub error: Option<String>,
}

/// Keeps a report list in sync with a collection and submits new reports.
pub struct SyncCoordinator {
    store: Arc<dyn ReportStore>,
    identity: IdentityPreferences,
    state: watch::Sender<SyncState>,
    shutdown: watch::Sender<bool>,
    subscription: Mutex<Option<JoinHandle<()>>>,
}

impl SyncCoordinator {
    #[must_use]
    pub fn new(store: Arc<dyn ReportStore>, identity: IdentityPreferences) -> Self {
        let (state, _) = watch::channel(SyncState::default());
        let (shutdown, _) = watch::channel(false);
        Self {
            store,
            identity,
            state,
            shutdown,
            subscription: Mutex::new(None),
        }
    }

    /// Open the live subscription.
    ///
    /// Each snapshot replaces the list and clears the error. A subscription
    /// failure is recorded as the error and the subscription ends.
    pub fn start(&self) -> AppResult<()> {
        if self.is_shut_down() {
            return Err(AppError::Contract("coordinator already shut down".into()));
        }

        let mut slot = self
            .subscription
            .lock()
            .map_err(|_| AppError::Internal("subscription lock poisoned".into()))?;
        if slot.is_some() {
            return Err(AppError::Contract("coordinator already started".into()));
        }

        let mut subscription = self.store.subscribe();
        let state = self.state.clone();
        let shutdown = self.shutdown.subscribe();

        *slot = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = closed(shutdown.clone()) => break,
                    item = subscription.next() => match item {
                        Some(Ok(reports)) => {
                            tracing::debug!(count = reports.len(), "Report snapshot received");
                            state.send_modify(|s| {
                                s.reports = reports;
                                s.error = None;
                            });
                        }
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "Report subscription ended with error");
                            state.send_modify(|s| s.error = Some(e.to_string()));
                            break;
                        }
                        None => break,
                    },
                }
            }
            subscription.unsubscribe();
        }));

        tracing::debug!("Sync coordinator started");
        Ok(())
    }

    /// Point-in-time state.
    #[must_use]
    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Observe state changes. The receiver starts at the current state.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn reports(&self) -> ReportList {
        self.state.borrow().reports.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Fetch once and replace the list.
    ///
    /// Skipped while another refresh is in flight unless `force` is set.
    /// Returns whether a fetch was performed.
    pub async fn refresh(&self, force: bool) -> bool {
        if self.is_shut_down() {
            return false;
        }

        let mut started = false;
        self.state.send_if_modified(|s| {
            if s.is_loading && !force {
                return false;
            }
            started = true;
            s.is_loading = true;
            s.error = None;
            true
        });
        if !started {
            tracing::trace!("Refresh skipped, already loading");
            return false;
        }

        let result = tokio::select! {
            () = closed(self.shutdown.subscribe()) => return true,
            result = self.store.fetch_once() => result,
        };

        if self.is_shut_down() {
            return true;
        }

        self.state.send_modify(|s| {
            match result {
                Ok(reports) => s.reports = reports,
                Err(e) => {
                    tracing::warn!(error = %e, "Report refresh failed");
                    s.error = Some(e.to_string());
                }
            }
            s.is_loading = false;
        });
        true
    }

    /// Stamp the candidate with the current display name and append it.
    ///
    /// Failures are logged and reported as `false`.
    pub async fn submit(&self, mut candidate: Report) -> bool {
        if self.is_shut_down() {
            return false;
        }

        candidate.nickname = self.identity.current().display_name();

        let result = tokio::select! {
            () = closed(self.shutdown.subscribe()) => return false,
            result = self.store.append(candidate) => result,
        };

        match result {
            Ok(id) => {
                tracing::info!(id = %id, "Report submitted");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Report submission failed");
                false
            }
        }
    }

    /// Submit the current draft and clear it on success.
    ///
    /// An incomplete draft is rejected with `BadRequest`. Returns whether
    /// the report was appended.
    pub async fn submit_draft(&self, drafts: &DraftCoordinator) -> AppResult<bool> {
        let candidate = drafts.current().to_candidate()?;
        if !self.submit(candidate).await {
            return Ok(false);
        }
        drafts.clear().await?;
        Ok(true)
    }

    /// Cancel the subscription and abandon in-flight work. Idempotent.
    pub fn shutdown(&self) {
        if self.shutdown.send_replace(true) {
            return;
        }
        let task = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
        tracing::debug!("Sync coordinator shut down");
    }
}

/// Resolves once shutdown has been signalled.
async fn closed(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|closed| *closed).await;
}

impl Drop for SyncCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::identity::IDENTITY_NAMESPACE;
    use crate::services::preferences::PreferenceStore;
    use crate::services::report_store::{ListenerRegistry, ReportSubscription};
    use async_trait::async_trait;
    use reportline_db::repositories::PreferenceRepository;
    use reportline_db::test_utils::memory_db;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Store whose fetches block until released, and whose appends can fail.
    #[derive(Default)]
    struct ScriptedStore {
        fetches: AtomicUsize,
        release: Notify,
        appended: Mutex<Vec<Report>>,
        fail_appends: bool,
        listeners: ListenerRegistry,
    }

    #[async_trait]
    impl ReportStore for ScriptedStore {
        fn subscribe(&self) -> ReportSubscription {
            ReportSubscription::spawn(&self.listeners, 4, |tx| async move {
                let _ = tx.send(Err(AppError::Fetch("offline".into()))).await;
            })
        }

        async fn fetch_once(&self) -> AppResult<ReportList> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            Ok(vec![Report::candidate("t", "d", "l", None)])
        }

        async fn append(&self, report: Report) -> AppResult<String> {
            if self.fail_appends {
                return Err(AppError::Submission("offline".into()));
            }
            self.appended.lock().unwrap().push(report);
            Ok("k1".to_string())
        }
    }

    /// Store whose fetches fail and whose subscription emits one snapshot once opened.
    #[derive(Default)]
    struct RecoveringStore {
        open: Arc<Notify>,
        listeners: ListenerRegistry,
    }

    #[async_trait]
    impl ReportStore for RecoveringStore {
        fn subscribe(&self) -> ReportSubscription {
            let open = self.open.clone();
            ReportSubscription::spawn(&self.listeners, 4, move |tx| async move {
                open.notified().await;
                let _ = tx.send(Ok(vec![Report::candidate("t", "d", "l", None)])).await;
                std::future::pending::<()>().await;
            })
        }

        async fn fetch_once(&self) -> AppResult<ReportList> {
            Err(AppError::Fetch("offline".into()))
        }

        async fn append(&self, _report: Report) -> AppResult<String> {
            Err(AppError::Submission("offline".into()))
        }
    }

    async fn identity() -> IdentityPreferences {
        let db = Arc::new(memory_db().await.unwrap());
        let store = PreferenceStore::open(PreferenceRepository::new(db), IDENTITY_NAMESPACE)
            .await
            .unwrap();
        IdentityPreferences::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_refresh_is_single_flight() {
        let store = Arc::new(ScriptedStore::default());
        let coordinator = Arc::new(SyncCoordinator::new(store.clone(), identity().await));

        let first = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.refresh(false).await }
        });
        while store.fetches.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert!(coordinator.is_loading());

        assert!(!coordinator.refresh(false).await);
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);

        store.release.notify_one();
        assert!(first.await.unwrap());
        assert!(!coordinator.is_loading());
        assert_eq!(coordinator.reports().len(), 1);
    }

    #[tokio::test]
    async fn test_forced_refresh_runs_while_loading() {
        let store = Arc::new(ScriptedStore::default());
        let coordinator = Arc::new(SyncCoordinator::new(store.clone(), identity().await));

        let first = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.refresh(false).await }
        });
        while store.fetches.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let second = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.refresh(true).await }
        });
        while store.fetches.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }

        store.release.notify_waiters();
        assert!(first.await.unwrap());
        assert!(second.await.unwrap());
    }

    #[tokio::test]
    async fn test_submit_stamps_display_name() {
        let store = Arc::new(ScriptedStore::default());
        let prefs = identity().await;
        let coordinator = SyncCoordinator::new(store.clone(), prefs.clone());

        assert!(coordinator.submit(Report::candidate("t", "d", "l", None)).await);

        prefs.update_nickname("ana").await.unwrap();
        prefs.update_anonymous(false).await.unwrap();
        assert!(coordinator.submit(Report::candidate("t", "d", "l", None)).await);

        let appended = store.appended.lock().unwrap();
        assert_eq!(appended[0].nickname, "anonymous");
        assert_eq!(appended[1].nickname, "ana");
        assert!(coordinator.reports().is_empty());
    }

    #[tokio::test]
    async fn test_submit_failure_returns_false() {
        let store = Arc::new(ScriptedStore {
            fail_appends: true,
            ..ScriptedStore::default()
        });
        let coordinator = SyncCoordinator::new(store, identity().await);

        assert!(!coordinator.submit(Report::candidate("t", "d", "l", None)).await);
        assert!(coordinator.error().is_none());
    }

    #[tokio::test]
    async fn test_subscription_error_is_recorded() {
        let store = Arc::new(ScriptedStore::default());
        let coordinator = SyncCoordinator::new(store.clone(), identity().await);
        coordinator.start().unwrap();

        let mut rx = coordinator.watch();
        let state = tokio::time::timeout(
            Duration::from_secs(1),
            rx.wait_for(|s| s.error.is_some()),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        assert_eq!(state.error.as_deref(), Some("Fetch error: offline"));

        assert!(matches!(coordinator.start(), Err(AppError::Contract(_))));
    }

    #[tokio::test]
    async fn test_shutdown_abandons_refresh() {
        let store = Arc::new(ScriptedStore::default());
        let coordinator = Arc::new(SyncCoordinator::new(store.clone(), identity().await));

        let pending = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.refresh(false).await }
        });
        while store.fetches.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        coordinator.shutdown();
        coordinator.shutdown();
        assert!(pending.await.unwrap());

        let state = coordinator.state();
        assert!(state.reports.is_empty());
        assert!(!coordinator.submit(Report::candidate("t", "d", "l", None)).await);
        assert!(!coordinator.refresh(true).await);
        assert!(matches!(coordinator.start(), Err(AppError::Contract(_))));
    }

    #[tokio::test]
    async fn test_snapshot_clears_earlier_error() {
        let store = Arc::new(RecoveringStore::default());
        let coordinator = SyncCoordinator::new(store.clone(), identity().await);

        assert!(coordinator.refresh(false).await);
        assert_eq!(coordinator.error().as_deref(), Some("Fetch error: offline"));
        assert!(!coordinator.is_loading());

        coordinator.start().unwrap();
        store.open.notify_one();

        let mut rx = coordinator.watch();
        let state = tokio::time::timeout(
            Duration::from_secs(1),
            rx.wait_for(|s| !s.reports.is_empty()),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        assert!(state.error.is_none());
        assert_eq!(state.reports.len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_subscription_after_poisoned_lock() {
        let store = Arc::new(RecoveringStore::default());
        let coordinator = SyncCoordinator::new(store.clone(), identity().await);
        coordinator.start().unwrap();
        assert_eq!(store.listeners.active(), 1);

        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _slot = coordinator.subscription.lock().unwrap();
            panic!("poison the subscription slot");
        }));
        assert!(coordinator.subscription.is_poisoned());

        coordinator.shutdown();

        let slot = coordinator
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        assert!(slot.is_none());
        drop(slot);

        tokio::time::timeout(Duration::from_secs(1), async {
            while store.listeners.active() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }
}
