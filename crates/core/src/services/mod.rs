//! Report flow services.

#![allow(missing_docs)]

pub mod draft;
pub mod identity;
pub mod preferences;
pub mod remote_store;
pub mod report_store;
pub mod sync;

pub use draft::{DraftCoordinator, DraftField, DRAFT_NAMESPACE};
pub use identity::{IdentityPreferences, IDENTITY_NAMESPACE};
pub use preferences::{PreferenceMap, PreferenceStore};
pub use remote_store::{HttpReportStore, DEFAULT_POLL_INTERVAL};
pub use report_store::{
    DbReportStore, ListenerRegistry, ReportStore, ReportSubscription, DEFAULT_CHANNEL_CAPACITY,
};
pub use sync::{SyncCoordinator, SyncState};
