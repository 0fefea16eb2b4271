//! In-memory cache for LLM completions.
//!
//! Keyed by SHA-256 of (model ‖ system ‖ prompt) so identical requests for
//! the same model reuse a completion instead of re-billing the provider.
//! Credits are still charged for cache hits; only the upstream spend is
//! saved.

use std::sync::Arc;

use moka::future::Cache;
use sha2::{Digest, Sha256};

use crate::config::CacheConfig;
use crate::llm::client::{Completion, TokenUsage};

/// A cached completion body. Token usage is retained so cache hits are
/// billed identically to the original call.
#[derive(Debug, Clone)]
pub struct CachedCompletion {
    pub text: String,
    pub model: String,
    pub usage: TokenUsage,
}

impl CachedCompletion {
    pub fn to_completion(&self) -> Completion {
        Completion {
            text: self.text.clone(),
            model: self.model.clone(),
            usage: self.usage,
            cached: true,
        }
    }
}

/// TTL-bounded response cache. `None` entries of config disable it entirely.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Option<Cache<String, Arc<CachedCompletion>>>,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("enabled", &self.inner.is_some())
            .finish()
    }
}

impl ResponseCache {
    pub fn new(config: &CacheConfig) -> Self {
        let inner = if config.enabled {
            Some(
                Cache::builder()
                    .max_capacity(config.capacity)
                    .time_to_live(config.ttl)
                    .build(),
            )
        } else {
            None
        };
        Self { inner }
    }

    /// Disabled cache, for tests and opt-out deployments.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Compute the cache key for a request.
    pub fn key(model: &str, system: Option<&str>, prompt: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update([0u8]);
        hasher.update(system.unwrap_or_default().as_bytes());
        hasher.update([0u8]);
        hasher.update(prompt.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub async fn get(&self, key: &str) -> Option<Arc<CachedCompletion>> {
        self.inner.as_ref()?.get(key).await
    }

    pub async fn insert(&self, key: String, completion: &Completion) {
        if let Some(cache) = &self.inner {
            cache
                .insert(
                    key,
                    Arc::new(CachedCompletion {
                        text: completion.text.clone(),
                        model: completion.model.clone(),
                        usage: completion.usage,
                    }),
                )
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config() -> CacheConfig {
        CacheConfig {
            enabled: true,
            capacity: 16,
            ttl: Duration::from_secs(60),
        }
    }

    fn completion(text: &str) -> Completion {
        Completion {
            text: text.to_string(),
            model: "claude-3-5-sonnet-20241022".to_string(),
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 20,
            },
            cached: false,
        }
    }

    #[tokio::test]
    async fn test_get_after_insert() {
        let cache = ResponseCache::new(&test_config());
        let key = ResponseCache::key("model", Some("sys"), "prompt");

        assert!(cache.get(&key).await.is_none());

        cache.insert(key.clone(), &completion("hello")).await;

        let hit = cache.get(&key).await.expect("should hit");
        assert_eq!(hit.text, "hello");
        assert!(hit.to_completion().cached);
        assert_eq!(hit.usage.output_tokens, 20);
    }

    #[test]
    fn test_key_depends_on_all_parts() {
        let base = ResponseCache::key("m", Some("s"), "p");
        assert_ne!(base, ResponseCache::key("m2", Some("s"), "p"));
        assert_ne!(base, ResponseCache::key("m", Some("s2"), "p"));
        assert_ne!(base, ResponseCache::key("m", Some("s"), "p2"));
        assert_ne!(base, ResponseCache::key("m", None, "p"));
        // Stable for identical inputs
        assert_eq!(base, ResponseCache::key("m", Some("s"), "p"));
    }

    #[tokio::test]
    async fn test_disabled_cache_never_hits() {
        let cache = ResponseCache::disabled();
        let key = ResponseCache::key("m", None, "p");
        cache.insert(key.clone(), &completion("x")).await;
        assert!(cache.get(&key).await.is_none());
    }
}
