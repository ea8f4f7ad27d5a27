//! Cache error types.
//!
//! Every cache failure is soft from the reader's point of view: callers log
//! it and carry on as if the entry were missing.

use thiserror::Error;

/// Errors returned by cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store could not be reached.
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Convenience type alias for cache results.
pub type Result<T> = std::result::Result<T, CacheError>;
