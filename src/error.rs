use thiserror::Error;

/// Custom error type for store and collector operations.
///
/// The core is total over well-formed inputs; the only runtime failures are
/// lock poisoning, a dead background sweeper, and the explicitly rejected
/// zero/negative rate window.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("Invalid rate window: {window} (window must be a positive number of seconds)")]
    InvalidWindow { window: i64 },

    #[error("Background task error: {0}")]
    BackgroundTaskError(String),

    #[error("Configuration Error: {0}")]
    ConfigError(String),
}

// Implement conversion from lock poison errors for convenience
impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        StoreError::LockError(format!("Mutex/RwLock poisoned: {}", err))
    }
}
