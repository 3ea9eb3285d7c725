//! Common utilities and shared types for reportline.
//!
//! This crate provides foundational components used across all reportline crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based collection keys via [`IdGenerator`]
//!
//! # Example
//!
//! ```no_run
//! use reportline_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let key = IdGenerator::new().generate();
//!     println!("{} -> {}", config.collection.path, key);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
