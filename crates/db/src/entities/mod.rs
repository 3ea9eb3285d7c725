//! Database entities.

#![allow(missing_docs)]

pub mod preference;
pub mod report;

pub use preference::Entity as Preference;
pub use report::Entity as Report;
