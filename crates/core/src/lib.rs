//! Core report flow for reportline.
//!
//! Preferences, drafts, collection access and list synchronization, wired
//! together by [`AppContext`].

#![allow(missing_docs)]

pub mod context;
pub mod models;
pub mod services;

pub use context::AppContext;
pub use models::{Report, ReportDraft, ReportList, UserIdentity, ANONYMOUS_NICKNAME};
pub use services::*;
