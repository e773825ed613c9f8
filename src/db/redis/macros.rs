/// Read-through caching for async catalog lookups.
///
/// Yields the cached value for `$key` if present. On a miss, awaits `$fetch`,
/// queues the result with a TTL of `$ttl` seconds and yields it. Failures of
/// `$fetch` return early through `?` and are never cached.
///
/// # Example
/// ```rust,ignore
/// cached!(
///     self.cache,
///     CacheKey::ItemDetails(kind, item_id),
///     DETAILS_CACHE_TTL,
///     self.fetch_details(kind, item_id)
/// )
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $fetch:expr) => {{
        let key = $key;
        match $cache.get(&key).await? {
            Some(hit) => Ok(hit),
            None => {
                let fresh = $fetch.await?;
                $cache.put(&key, &fresh, $ttl);
                Ok(fresh)
            }
        }
    }};
}
