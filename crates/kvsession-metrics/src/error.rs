//! Registry error types.

use crate::name::MetricsName;

/// Error returned by a [`MetricsRegistry`](crate::MetricsRegistry).
///
/// The instrumented client logs these and carries on; they never reach
/// callers of data operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A view is already registered under this name.
    #[error("metrics already registered under {0}")]
    AlreadyRegistered(MetricsName),

    /// Nothing is registered under this name.
    #[error("no metrics registered under {0}")]
    NotRegistered(MetricsName),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
