//! In-memory response cache.
//!
//! Maps a request signature to the bytes served for it, each entry with its
//! own expiry. Expired entries are treated as misses on read and removed by
//! [`ResponseCache::purge_expired`], which the server calls from a periodic
//! sweep. There is no capacity bound; the key space is limited by the
//! number of records times formats times distinct query strings.
//!
//! Entries are not invalidated when a record changes. An edit becomes
//! visible once the cached entry expires.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::request::ImageFormat;

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Identifies one rendered response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub identifier: String,
    pub format: ImageFormat,
    /// The raw query string, exactly as received.
    pub query: String,
}

impl CacheKey {
    #[must_use]
    pub fn new(identifier: &str, format: ImageFormat, query: &str) -> Self {
        Self {
            identifier: identifier.to_owned(),
            format,
            query: query.to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    bytes: Arc<[u8]>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// A TTL cache of rendered image bytes, safe to share across tasks.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl ResponseCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a live entry. An expired entry is removed and reported as a
    /// miss.
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<[u8]>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => return Some(Arc::clone(&entry.bytes)),
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
        }
        None
    }

    /// Store `bytes` under `key` for `ttl`, replacing any previous entry.
    pub async fn set(&self, key: CacheKey, bytes: Arc<[u8]>, ttl: Duration) {
        let entry = CacheEntry {
            bytes,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key, entry);
    }

    /// Remove one entry.
    pub async fn delete(&self, key: &CacheKey) {
        self.entries.write().await.remove(key);
    }

    /// Remove every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Remove expired entries and return how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Number of entries, live or not yet swept.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn key(query: &str) -> CacheKey {
        CacheKey::new("acme-core", ImageFormat::Svg, query)
    }

    fn bytes(data: &[u8]) -> Arc<[u8]> {
        Arc::from(data)
    }

    #[tokio::test(start_paused = true)]
    async fn entry_lives_until_ttl() {
        let cache = ResponseCache::new();
        cache.set(key(""), bytes(b"svg"), DEFAULT_TTL).await;
        assert_eq!(cache.get(&key("")).await.as_deref(), Some(&b"svg"[..]));

        tokio::time::advance(DEFAULT_TTL - Duration::from_millis(1)).await;
        assert!(cache.get(&key("")).await.is_some());

        tokio::time::advance(Duration::from_millis(2)).await;
        assert!(cache.get(&key("")).await.is_none());
        // lazily removed on read
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_only_expired_entries() {
        let cache = ResponseCache::new();
        cache.set(key("a"), bytes(b"a"), Duration::from_secs(10)).await;
        cache.set(key("b"), bytes(b"b"), Duration::from_secs(60)).await;

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.len().await, 1);
        assert!(cache.get(&key("b")).await.is_some());
    }

    #[tokio::test]
    async fn keys_distinguish_format_and_query() {
        let cache = ResponseCache::new();
        cache.set(key("style=3d"), bytes(b"3d"), DEFAULT_TTL).await;

        assert!(cache.get(&key("style=flat")).await.is_none());
        assert!(
            cache
                .get(&CacheKey::new("acme-core", ImageFormat::Png, "style=3d"))
                .await
                .is_none()
        );
        assert!(cache.get(&key("style=3d")).await.is_some());
    }

    #[tokio::test]
    async fn set_replaces_and_delete_clear_remove() {
        let cache = ResponseCache::new();
        cache.set(key(""), bytes(b"v1"), DEFAULT_TTL).await;
        cache.set(key(""), bytes(b"v2"), DEFAULT_TTL).await;
        assert_eq!(cache.get(&key("")).await.as_deref(), Some(&b"v2"[..]));

        cache.delete(&key("")).await;
        assert!(cache.get(&key("")).await.is_none());

        cache.set(key("x"), bytes(b"x"), DEFAULT_TTL).await;
        cache.set(key("y"), bytes(b"y"), DEFAULT_TTL).await;
        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn concurrent_readers_and_writers() {
        let cache = Arc::new(ResponseCache::new());
        let mut handles = Vec::new();
        for i in 0_u8..16 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                let k = key(&format!("n={i}"));
                cache.set(k.clone(), bytes(&[i]), DEFAULT_TTL).await;
                cache.get(&k).await
            }));
        }
        for (i, handle) in handles.into_iter().enumerate() {
            let got = handle.await.unwrap().unwrap();
            assert_eq!(got[0] as usize, i);
        }
        assert_eq!(cache.len().await, 16);
    }
}
