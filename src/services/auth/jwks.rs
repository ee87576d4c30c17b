//! Signing-key retrieval and caching.
//!
//! The provider publishes its keys as a JWKS document at a well-known URL.
//! [`KeySource`] abstracts the fetch (HTTP in production, static in tests),
//! [`JwksCache`] adds the TTL cache and the single rotation refetch.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use thiserror::Error;
use tokio::sync::RwLock;
use url::Url;

pub type KeySetResult<T> = Result<T, KeySetError>;

/// Key-set layer errors. All of these are provider-side conditions, not
/// caller faults; the HTTP edge maps them to 503.
#[derive(Debug, Error)]
pub enum KeySetError {
    #[error("key set request failed: {0}")]
    Request(String),

    #[error("key set endpoint returned status {0}")]
    Status(u16),

    #[error("key set body could not be decoded: {0}")]
    Decode(String),

    #[error("published key is unusable: {0}")]
    InvalidKey(String),
}

/// Where signing keys come from.
///
/// Implementations do one fetch per call; caching is the job of
/// [`JwksCache`], not the source. Tests substitute an in-memory source.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn fetch(&self) -> KeySetResult<JwkSet>;
}

/// Production source: HTTPS GET against the tenant's discovery URL.
#[derive(Clone, Debug)]
pub struct HttpKeySource {
    client: reqwest::Client,
    url: Url,
}

impl HttpKeySource {
    pub fn new(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn fetch(&self) -> KeySetResult<JwkSet> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| KeySetError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(KeySetError::Status(response.status().as_u16()));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| KeySetError::Decode(e.to_string()))
    }
}

struct CachedKeys {
    keys: HashMap<String, Jwk>,
    fetched_at: Instant,
}

impl CachedKeys {
    fn from_set(set: JwkSet) -> Self {
        // A key without a kid can never be selected by a token header.
        let keys = set
            .keys
            .into_iter()
            .filter_map(|jwk| jwk.common.key_id.clone().map(|kid| (kid, jwk)))
            .collect();

        Self {
            keys,
            fetched_at: Instant::now(),
        }
    }

    fn fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// TTL cache over a [`KeySource`], shared across concurrent validations.
///
/// Readers never block each other. A refresh holds the write lock only to
/// swap in the new set, so simultaneous refreshes at worst fetch redundantly
/// and the last successful fetch wins.
pub struct JwksCache {
    source: Arc<dyn KeySource>,
    ttl: Duration,
    cached: RwLock<Option<CachedKeys>>,
}

impl JwksCache {
    pub fn new(source: Arc<dyn KeySource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cached: RwLock::new(None),
        }
    }

    /// Look up a signing key by kid.
    ///
    /// Serves from the cached set while it is fresh. A kid missing from a
    /// fresh cached set forces exactly one refetch, so freshly rotated keys
    /// are found without waiting for the TTL to lapse. `Ok(None)` means the
    /// provider does not publish the kid at all.
    pub async fn find(&self, kid: &str) -> KeySetResult<Option<Jwk>> {
        {
            let guard = self.cached.read().await;
            if let Some(cached) = guard.as_ref()
                && cached.fresh(self.ttl)
                && let Some(jwk) = cached.keys.get(kid)
            {
                return Ok(Some(jwk.clone()));
            }
        }

        // Cache stale, empty, or fresh-but-unaware of this kid. Each of those
        // ends in a single fetch before the verdict.
        let refreshed = self.refresh().await?;
        Ok(refreshed.get(kid).cloned())
    }

    async fn refresh(&self) -> KeySetResult<HashMap<String, Jwk>> {
        let set = self.source.fetch().await?;
        let cached = CachedKeys::from_set(set);
        let keys = cached.keys.clone();

        let mut guard = self.cached.write().await;
        *guard = Some(cached);

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::services::auth::test_support::{SigningKey, StaticKeySource};

    #[tokio::test]
    async fn serves_from_cache_within_ttl() {
        let key = SigningKey::generate("abc");
        let source = StaticKeySource::new(SigningKey::jwk_set(&[&key]));
        let cache = JwksCache::new(source.clone(), Duration::from_secs(300));

        assert!(cache.find("abc").await.unwrap().is_some());
        assert!(cache.find("abc").await.unwrap().is_some());

        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn refetches_after_ttl() {
        let key = SigningKey::generate("abc");
        let source = StaticKeySource::new(SigningKey::jwk_set(&[&key]));
        let cache = JwksCache::new(source.clone(), Duration::from_secs(0));

        assert!(cache.find("abc").await.unwrap().is_some());
        assert!(cache.find("abc").await.unwrap().is_some());

        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn unknown_kid_triggers_exactly_one_refetch() {
        let key = SigningKey::generate("abc");
        let source = StaticKeySource::new(SigningKey::jwk_set(&[&key]));
        let cache = JwksCache::new(source.clone(), Duration::from_secs(300));

        // Prime the cache.
        assert!(cache.find("abc").await.unwrap().is_some());
        assert_eq!(source.fetch_count(), 1);

        // A kid the cached set does not know: one refetch, then the verdict.
        assert!(cache.find("rotated").await.unwrap().is_none());
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn rotated_key_is_found_after_refetch() {
        let old_key = SigningKey::generate("old");
        let new_key = SigningKey::generate("new");

        let source = StaticKeySource::new(SigningKey::jwk_set(&[&old_key]));
        let cache = JwksCache::new(source.clone(), Duration::from_secs(300));

        assert!(cache.find("old").await.unwrap().is_some());

        // Provider rotates while our cache is still fresh.
        source.replace(SigningKey::jwk_set(&[&old_key, &new_key]));

        assert!(cache.find("new").await.unwrap().is_some());
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn fetch_failure_propagates() {
        let source = StaticKeySource::failing();
        let cache = JwksCache::new(source, Duration::from_secs(300));

        assert!(matches!(
            cache.find("abc").await,
            Err(KeySetError::Status(_))
        ));
    }
}
