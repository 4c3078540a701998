use std::time::Duration;

use crate::{cache::Cache, error::ApiError};

/// Checks a keyed attempt counter kept in the cache.
///
/// Uses the INCR + EXPIRE strategy:
/// - Increments a counter for `key`
/// - On first increment, the counter expires after `window`
/// - Returns 429 if counter exceeds `max_attempts`
///
/// Fails open: if the cache cannot count, the request goes through.
pub async fn check_rate_limit(cache: &Cache, key: &str, max_attempts: u64, window: Duration) -> Result<(), ApiError> {
    let count = cache.incr_window(&format!("rate_limit:{key}"), window).await;
    if count > max_attempts {
        tracing::warn!(key, count, "Rate limit exceeded");
        return Err(ApiError::RateLimited);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn blocks_after_max_then_resets() {
        let cache = Cache::in_memory(Duration::from_secs(300), None);
        let window = Duration::from_secs(60);
        for _ in 0..5 {
            check_rate_limit(&cache, "register:a@b.co", 5, window).await.unwrap();
        }
        assert!(matches!(
            check_rate_limit(&cache, "register:a@b.co", 5, window).await,
            Err(ApiError::RateLimited)
        ));
        check_rate_limit(&cache, "register:c@d.co", 5, window).await.unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        check_rate_limit(&cache, "register:a@b.co", 5, window).await.unwrap();
    }
}
