//! Shared request state.

use reportline_core::DbReportStore;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// Collection served by the endpoints.
    pub reports: DbReportStore,
}

impl AppState {
    #[must_use]
    pub const fn new(reports: DbReportStore) -> Self {
        Self { reports }
    }

    /// Collection path the routes are mounted under.
    #[must_use]
    pub fn collection_path(&self) -> &str {
        self.reports.collection()
    }
}
