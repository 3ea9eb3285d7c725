//! Database repositories.

pub mod preference;
pub mod report;

pub use preference::PreferenceRepository;
pub use report::ReportRepository;
