//! Context assembler error types.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the read path.
///
/// Cache trouble never appears here; the assembler degrades to the views.
#[derive(Debug, Error)]
pub enum ContextError {
    /// A view query failed.
    #[error("view query failed: {0}")]
    Query(String),

    /// A view query did not finish within the request timeout.
    #[error("view query timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ContextError>;
