//! Database query timeout helpers
//!
//! Bounds every store query so a stuck connection surfaces as a store error
//! instead of hanging the join that issued it.

use std::time::Duration;
use tokio::time::timeout;

use crate::store::{StoreError, StoreResult};

/// Default timeout for database queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Execute a query with timeout
///
/// # Arguments
///
/// * `duration` - Timeout duration
/// * `future` - Async operation to execute
///
/// # Returns
///
/// * `StoreResult<T>` - Result, database error or timeout error
///
/// # Example
///
/// ```no_run
/// use tictac_rooms::db::timeouts::{with_timeout, DEFAULT_QUERY_TIMEOUT};
/// # use sqlx::PgPool;
/// # async fn example(pool: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
///
/// let result = with_timeout(
///     DEFAULT_QUERY_TIMEOUT,
///     sqlx::query("SELECT * FROM rooms WHERE id = $1")
///         .bind(1_i64)
///         .fetch_optional(pool)
/// ).await?;
///
/// # Ok(())
/// # }
/// ```
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> StoreResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(StoreError::Database(e)),
        Err(_) => Err(StoreError::Timeout(duration)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timeout_constant() {
        assert_eq!(DEFAULT_QUERY_TIMEOUT.as_secs(), 5);
    }

    #[tokio::test]
    async fn test_slow_future_times_out() {
        let result: StoreResult<()> = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(StoreError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_database_error_passes_through() {
        let result: StoreResult<()> =
            with_timeout(DEFAULT_QUERY_TIMEOUT, async { Err(sqlx::Error::RowNotFound) }).await;

        assert!(matches!(result, Err(StoreError::Database(sqlx::Error::RowNotFound))));
    }
}
