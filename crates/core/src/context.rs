//! Process-wide service wiring.

use std::sync::Arc;

use reportline_common::{AppResult, Config};
use reportline_db::repositories::{PreferenceRepository, ReportRepository};
use sea_orm::DatabaseConnection;

use crate::services::{
    DbReportStore, DraftCoordinator, HttpReportStore, IdentityPreferences, PreferenceStore,
    ReportStore, SyncCoordinator, DRAFT_NAMESPACE, IDENTITY_NAMESPACE,
};

/// Handles opened once at startup and shared for the process lifetime.
#[derive(Clone)]
pub struct AppContext {
    /// The collection reports are read from and appended to.
    pub reports: Arc<dyn ReportStore>,
    /// The local collection, also served over HTTP. Same as `reports` unless a remote is configured.
    pub local_reports: DbReportStore,
    pub identity: IdentityPreferences,
    pub drafts: DraftCoordinator,
}

impl AppContext {
    /// Open the preference namespaces and the report collection.
    ///
    /// Uses the remote collection when `collection.remote_url` is set.
    pub async fn open(config: &Config, db: Arc<DatabaseConnection>) -> AppResult<Self> {
        let prefs = PreferenceRepository::new(db.clone());
        let identity_store = PreferenceStore::open(prefs.clone(), IDENTITY_NAMESPACE).await?;
        let draft_store = PreferenceStore::open(prefs, DRAFT_NAMESPACE).await?;

        let local_reports = DbReportStore::with_capacity(
            ReportRepository::new(db),
            config.collection.path.clone(),
            config.sync.channel_capacity,
        );

        let reports: Arc<dyn ReportStore> = match &config.collection.remote_url {
            Some(url) => {
                tracing::info!(url = %url, path = %config.collection.path, "Using remote report collection");
                Arc::new(
                    HttpReportStore::new(url, &config.collection.path)?
                        .with_poll_interval(config.sync.poll_interval())
                        .with_capacity(config.sync.channel_capacity),
                )
            }
            None => Arc::new(local_reports.clone()),
        };

        Ok(Self {
            reports,
            local_reports,
            identity: IdentityPreferences::new(Arc::new(identity_store)),
            drafts: DraftCoordinator::new(Arc::new(draft_store)),
        })
    }

    /// A new list coordinator over the configured collection.
    #[must_use]
    pub fn sync_coordinator(&self) -> SyncCoordinator {
        SyncCoordinator::new(self.reports.clone(), self.identity.clone())
    }
}
