/// Read-through caching against [`Cache`](crate::db::Cache).
///
/// Returns the cached value for `$key` when present. Otherwise awaits
/// `$block`, queues its value for storage with `$ttl` seconds to live, and
/// returns it. A failed lookup is logged and treated as a miss, so Redis
/// being down only costs the cache. Errors from the block propagate with
/// `?`, so the macro must be used inside a function returning `AppResult`.
///
/// # Example
/// ```rust,ignore
/// let similar: Vec<ScoredCar> = cached!(cache, CacheKey::SimilarCars(id), ttl, async {
///     compute_similar(id).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let hit = match $cache.get_from_cache(&$key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(key = %$key, error = %e, "Cache lookup failed, computing value");
                None
            }
        };
        if let Some(cached) = hit {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&$key, &value, $ttl);
            Ok(value)
        }
    }};
}

#[cfg(test)]
mod tests {
    use crate::db::{create_redis_client, Cache, CacheKey};
    use crate::error::{AppError, AppResult};

    async fn unreachable_cache() -> Cache {
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let (cache, _handle) = Cache::new(client).await;
        cache
    }

    async fn lookup(cache: &Cache, value: AppResult<Vec<i64>>) -> AppResult<Vec<i64>> {
        let key = CacheKey::SimilarCars(7);
        cached!(cache, key, 60, async { value })
    }

    #[tokio::test]
    async fn test_unreachable_redis_falls_back_to_computed_value() {
        let cache = unreachable_cache().await;

        let value = lookup(&cache, Ok(vec![3, 1, 2])).await.unwrap();
        assert_eq!(value, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_block_error_still_propagates() {
        let cache = unreachable_cache().await;

        let result = lookup(&cache, Err(AppError::Unavailable("catalog down".into()))).await;
        assert!(matches!(result, Err(AppError::Unavailable(_))));
    }
}
