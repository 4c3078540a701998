//! Key-value cache with per-key expiry.
//!
//! Values are stored as JSON. When a Redis URL is configured the remote store
//! is consulted first; any remote failure (unreachable, timeout, protocol
//! error) falls back to the in-process map. No method returns an error: a
//! failure is logged and behaves like a miss.

use std::{collections::HashMap, future::Future, sync::Mutex, time::Duration};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::services::metrics::CACHE_REQUESTS;

const REMOTE_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
enum CacheError {
    #[error("no remote store configured")]
    Unavailable,
    #[error("remote store timed out")]
    Timeout,
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    created_at: Instant,
    expires_at: Instant,
}

pub struct Cache {
    remote: Option<redis::aio::MultiplexedConnection>,
    local: Mutex<HashMap<String, Entry>>,
    default_ttl: Duration,
    max_entries: Option<usize>,
}

impl Cache {
    /// Process-local cache only.
    pub fn in_memory(default_ttl: Duration, max_entries: Option<usize>) -> Self {
        Self {
            remote: None,
            local: Mutex::new(HashMap::new()),
            default_ttl,
            max_entries,
        }
    }

    /// Connects to Redis when `url` is set. An unreachable server is not an
    /// error: the cache starts in memory-only mode.
    pub async fn connect(url: Option<&str>, default_ttl: Duration, max_entries: Option<usize>) -> Self {
        let mut cache = Self::in_memory(default_ttl, max_entries);
        let Some(url) = url else {
            info!("REDIS_URL not set, using in-process cache");
            return cache;
        };

        let client = match redis::Client::open(url) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid REDIS_URL ({e}), using in-process cache");
                return cache;
            }
        };

        match timeout(Duration::from_secs(2), client.get_multiplexed_async_connection()).await {
            Ok(Ok(conn)) => {
                info!("Redis cache connected");
                cache.remote = Some(conn);
            }
            Ok(Err(e)) => warn!("Redis unavailable ({e}), using in-process cache"),
            Err(_) => warn!("Redis connection timed out, using in-process cache"),
        }
        cache
    }

    pub fn backend(&self) -> &'static str {
        if self.remote.is_some() {
            "redis"
        } else {
            "memory"
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if self.remote.is_some() {
            let mut cmd = redis::cmd("GET");
            cmd.arg(key);
            match self.remote::<Option<String>>(cmd).await {
                Ok(Some(raw)) => {
                    CACHE_REQUESTS.with_label_values(&["redis", "hit"]).inc();
                    return decode(key, &raw);
                }
                Ok(None) => {}
                Err(e) => warn!("Cache get {key} failed on redis, using fallback: {e}"),
            }
        }

        match self.local_get(key) {
            Some(raw) => {
                CACHE_REQUESTS.with_label_values(&["memory", "hit"]).inc();
                decode(key, &raw)
            }
            None => {
                CACHE_REQUESTS.with_label_values(&[self.backend(), "miss"]).inc();
                None
            }
        }
    }

    /// Stores `value` until `now + ttl` (default TTL when `None`).
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        if ttl.is_zero() {
            self.delete(key).await;
            return;
        }

        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Cache set {key}: value not serialisable: {e}");
                return;
            }
        };

        if self.remote.is_some() {
            let mut cmd = redis::cmd("PSETEX");
            cmd.arg(key).arg(ttl.as_millis() as u64).arg(&raw);
            match self.remote::<()>(cmd).await {
                Ok(()) => {
                    // Drop any copy written while redis was unreachable.
                    self.local_remove(key);
                    return;
                }
                Err(e) => warn!("Cache set {key} failed on redis, using fallback: {e}"),
            }
        }

        self.local_insert(key, raw, ttl);
    }

    /// Idempotent removal from both tiers.
    pub async fn delete(&self, key: &str) {
        if self.remote.is_some() {
            let mut cmd = redis::cmd("DEL");
            cmd.arg(key);
            if let Err(e) = self.remote::<i64>(cmd).await {
                warn!("Cache delete {key} failed on redis: {e}");
            }
        }
        self.local_remove(key);
    }

    /// Returns the cached value, or runs `fetch` and caches its result.
    /// Errors from `fetch` are returned untouched and nothing is cached.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(hit);
        }
        let value = fetch().await?;
        self.set(key, &value, ttl).await;
        Ok(value)
    }

    /// Increments a counter that expires `window` after its first increment.
    pub async fn incr_window(&self, key: &str, window: Duration) -> u64 {
        if self.remote.is_some() {
            let mut cmd = redis::cmd("INCR");
            cmd.arg(key);
            match self.remote::<u64>(cmd).await {
                Ok(count) => {
                    if count == 1 {
                        let mut expire = redis::cmd("PEXPIRE");
                        expire.arg(key).arg(window.as_millis() as u64);
                        if let Err(e) = self.remote::<i64>(expire).await {
                            warn!("Cache expire {key} failed: {e}");
                        }
                    }
                    return count;
                }
                Err(e) => warn!("Cache incr {key} failed on redis, using fallback: {e}"),
            }
        }

        let now = Instant::now();
        {
            let mut local = self.lock();
            if let Some(entry) = local.get_mut(key).filter(|e| e.expires_at > now) {
                let count = entry.value.parse::<u64>().unwrap_or(0) + 1;
                entry.value = count.to_string();
                return count;
            }
        }
        self.local_insert(key, "1".into(), window);
        1
    }

    async fn remote<T: redis::FromRedisValue>(&self, cmd: redis::Cmd) -> Result<T, CacheError> {
        let mut conn = self.remote.clone().ok_or(CacheError::Unavailable)?;
        match timeout(REMOTE_TIMEOUT, cmd.query_async(&mut conn)).await {
            Ok(res) => Ok(res?),
            Err(_) => Err(CacheError::Timeout),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.local.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn local_get(&self, key: &str) -> Option<String> {
        let mut local = self.lock();
        let entry = local.get(key)?;
        if entry.expires_at <= Instant::now() {
            local.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    fn local_insert(&self, key: &str, value: String, ttl: Duration) {
        let now = Instant::now();
        let mut local = self.lock();

        if let Some(max) = self.max_entries {
            if !local.contains_key(key) && local.len() >= max {
                local.retain(|_, e| e.expires_at > now);
            }
            while !local.contains_key(key) && local.len() >= max.max(1) {
                let oldest = local
                    .iter()
                    .min_by_key(|(_, e)| e.created_at)
                    .map(|(k, _)| k.clone());
                match oldest {
                    Some(k) => {
                        debug!("Cache full, evicting {k}");
                        local.remove(&k);
                    }
                    None => break,
                }
            }
        }

        local.insert(
            key.to_string(),
            Entry {
                value,
                created_at: now,
                expires_at: now + ttl,
            },
        );
    }

    fn local_remove(&self, key: &str) {
        self.lock().remove(key);
    }
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Option<T> {
    serde_json::from_str(raw)
        .map_err(|e| warn!("Cache entry {key} could not be decoded: {e}"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache() -> Cache {
        Cache::in_memory(Duration::from_secs(300), None)
    }

    #[tokio::test(start_paused = true)]
    async fn value_is_returned_until_ttl_elapses() {
        let cache = cache();
        cache.set("k", &"v", Some(Duration::from_secs(10))).await;

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(cache.get::<String>("k").await.as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get::<String>("k").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn plans_expire_after_one_second() {
        let cache = cache();
        let plans = json!([{ "name": "Basic", "price_cents": 0 }, { "name": "Pro", "price_cents": 999 }]);
        cache.set("plans", &plans, Some(Duration::from_secs(1))).await;
        assert_eq!(cache.get::<Value>("plans").await, Some(plans));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(cache.get::<Value>("plans").await, None);
    }

    #[tokio::test]
    async fn delete_removes_regardless_of_ttl_and_is_idempotent() {
        let cache = cache();
        cache.set("k", &1, Some(Duration::from_secs(3600))).await;
        cache.delete("k").await;
        assert_eq!(cache.get::<i32>("k").await, None);
        cache.delete("k").await;
        cache.delete("never-set").await;
    }

    #[tokio::test]
    async fn nested_values_round_trip() {
        let cache = cache();
        let value = json!({
            "Monday": { "Breakfast": { "recipe_name": "Oats", "servings": 2, "tags": ["quick", 1.5] } },
            "count": -3,
        });
        cache.set("nested", &value, None).await;
        assert_eq!(cache.get::<Value>("nested").await, Some(value));
    }

    #[tokio::test]
    async fn zero_ttl_stores_nothing() {
        let cache = cache();
        cache.set("k", &"v", Some(Duration::ZERO)).await;
        assert_eq!(cache.get::<String>("k").await, None);
    }

    #[tokio::test]
    async fn type_mismatch_is_a_miss() {
        let cache = cache();
        cache.set("k", &"text", None).await;
        assert_eq!(cache.get::<u32>("k").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn soft_cap_evicts_oldest_entry() {
        let cache = Cache::in_memory(Duration::from_secs(300), Some(2));
        cache.set("a", &1, None).await;
        tokio::time::advance(Duration::from_millis(10)).await;
        cache.set("b", &2, None).await;
        tokio::time::advance(Duration::from_millis(10)).await;
        cache.set("c", &3, None).await;

        assert_eq!(cache.get::<i32>("a").await, None);
        assert_eq!(cache.get::<i32>("b").await, Some(2));
        assert_eq!(cache.get::<i32>("c").await, Some(3));

        // Overwriting an existing key never evicts.
        cache.set("b", &20, None).await;
        assert_eq!(cache.get::<i32>("c").await, Some(3));
    }

    #[tokio::test]
    async fn unreachable_redis_falls_back_to_memory() {
        let cache = Cache::connect(Some("redis://127.0.0.1:1/"), Duration::from_secs(60), None).await;
        assert_eq!(cache.backend(), "memory");

        cache.set("k", &"v", None).await;
        assert_eq!(cache.get::<String>("k").await.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn invalid_redis_url_falls_back_to_memory() {
        let cache = Cache::connect(Some("not a url"), Duration::from_secs(60), None).await;
        assert_eq!(cache.backend(), "memory");
    }

    #[tokio::test(start_paused = true)]
    async fn window_counter_resets_after_window() {
        let cache = cache();
        let window = Duration::from_secs(60);
        assert_eq!(cache.incr_window("rate:x", window).await, 1);
        assert_eq!(cache.incr_window("rate:x", window).await, 2);
        assert_eq!(cache.incr_window("rate:x", window).await, 3);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.incr_window("rate:x", window).await, 1);
    }

    #[tokio::test]
    async fn get_or_fetch_only_fetches_on_miss() {
        let cache = cache();
        let first: Result<Vec<u32>, ()> = cache.get_or_fetch("list", None, || async { Ok(vec![1, 2]) }).await;
        assert_eq!(first, Ok(vec![1, 2]));

        let calls = AtomicUsize::new(0);
        let second: Result<Vec<u32>, ()> = cache
            .get_or_fetch("list", None, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![9])
            })
            .await;
        assert_eq!(second, Ok(vec![1, 2]));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let failed: Result<Vec<u32>, &str> = cache.get_or_fetch("other", None, || async { Err("boom") }).await;
        assert_eq!(failed, Err("boom"));
        assert_eq!(cache.get::<Vec<u32>>("other").await, None);
    }
}
