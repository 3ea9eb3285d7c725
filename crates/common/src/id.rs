//! ID generation utilities.

use ulid::Ulid;

/// Generator for server-assigned collection keys.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based key.
    ///
    /// Keys sort by creation millisecond. Order within one millisecond is random.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }
}
