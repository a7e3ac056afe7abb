//! Per-call deadline enforcement.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{ClientError, Result};

/// Await `fut`, failing with [`ClientError::Timeout`] once `timeout` elapses.
///
/// A zero timeout awaits without a deadline. The lifecycle state is never
/// touched here, so a timed-out client stays usable.
pub async fn with_deadline<T, F>(operation: &'static str, timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if timeout.is_zero() {
        return fut.await;
    }

    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                operation,
                timeout_ms = timeout.as_millis() as u64,
                "Backend call exceeded deadline"
            );
            Err(ClientError::Timeout { operation, timeout })
        }
    }
}
