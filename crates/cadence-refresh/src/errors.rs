//! Refresher error types.

use thiserror::Error;

/// Errors produced by the view refresher and its collaborators.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The change-notification subscription could not be established or
    /// was lost.
    #[error("notification connection error: {0}")]
    Connection(String),

    /// A view rebuild failed. The previous snapshot is still being served.
    #[error("view rebuild failed: {0}")]
    Rebuild(String),

    /// A read against the source tables failed.
    #[error("storage query failed: {0}")]
    Storage(String),

    /// The refresher has been shut down.
    #[error("refresher is shut down")]
    ShutDown,
}

/// Convenience type alias for refresher results.
pub type Result<T> = std::result::Result<T, RefreshError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failure() {
        assert_eq!(
            RefreshError::Rebuild("locked".into()).to_string(),
            "view rebuild failed: locked"
        );
        assert_eq!(RefreshError::ShutDown.to_string(), "refresher is shut down");
    }
}
