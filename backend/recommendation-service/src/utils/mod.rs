// Utility functions for recommendation-service

use crate::error::{EngineError, SourceError};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Run a collaborator call with a deadline.
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, SourceError>>,
{
    match timeout(duration, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(EngineError::DataSourceUnavailable(e)),
        Err(_) => Err(EngineError::Timeout(duration)),
    }
}
