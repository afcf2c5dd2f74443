// db/query_timeout.rs
use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use crate::service::error::ServiceError;

pub struct QueryTimeout;

impl QueryTimeout {
    /// Run a store future, failing with `ServiceError::Timeout` instead of
    /// letting a slow query hold the request open.
    pub async fn execute_with_timeout<F, T>(
        query_fn: F,
        timeout_duration: Duration,
    ) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match timeout(timeout_duration, query_fn).await {
            Ok(result) => result.map_err(ServiceError::from),
            Err(_) => {
                tracing::warn!("Query timed out after {:?}", timeout_duration);
                Err(ServiceError::Timeout(timeout_duration))
            }
        }
    }

    /// Default timeout for most queries (5 seconds)
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Longer timeout for the joined booking reads behind aggregations (30 seconds)
    pub const AGGREGATION_TIMEOUT: Duration = Duration::from_secs(30);

    /// Short timeout for simple lookups (2 seconds)
    pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);
}
