//! Resource limiting for protecting generation capacity.
//!
//! Generation requests are the expensive path (each one holds an upstream
//! LLM call open), so they are bounded two ways: a global concurrency
//! semaphore with a bounded waiting queue, and a per-user fixed window
//! counter. Exceeding either yields HTTP 429 with a retry-after hint.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::GenerationLimitsConfig;
use crate::errors::{Error, Result};
use crate::types::UserId;

/// Container for all resource limiters.
#[derive(Debug, Default, Clone)]
pub struct Limiters {
    /// Limiter for generation requests. None means unlimited.
    pub generation: Option<Arc<GenerationLimiter>>,
}

impl Limiters {
    /// Creates all limiters from configuration.
    pub fn new(config: &GenerationLimitsConfig) -> Self {
        Self {
            generation: GenerationLimiter::new(config).map(Arc::new),
        }
    }

    /// Acquire a generation slot for the user, or pass through when
    /// limiting is disabled.
    pub async fn acquire_generation(&self, user_id: UserId) -> Result<Option<GenerationPermit>> {
        match &self.generation {
            Some(limiter) => limiter.acquire(user_id).await.map(Some),
            None => Ok(None),
        }
    }
}

/// Per-user fixed window state.
#[derive(Debug)]
struct Window {
    started: Instant,
    count: usize,
}

/// Controls generation request capacity.
#[derive(Debug)]
pub struct GenerationLimiter {
    /// Semaphore controlling max concurrent generations
    semaphore: Arc<Semaphore>,
    /// Current number of requests waiting for a permit
    waiting_count: AtomicUsize,
    /// Maximum allowed waiting requests (None = unlimited)
    max_waiting: Option<usize>,
    /// Maximum time to wait for a permit
    max_wait: Duration,
    /// Per-user fixed window counters
    windows: DashMap<UserId, Window>,
    /// Maximum requests per user per window (None = unlimited)
    max_per_window: Option<usize>,
    window: Duration,
}

impl GenerationLimiter {
    /// Creates a new generation limiter from configuration.
    ///
    /// If both `max_concurrent` and `max_per_minute` are 0, returns `None`
    /// (unlimited).
    pub fn new(config: &GenerationLimitsConfig) -> Option<Self> {
        if config.max_concurrent == 0 && config.max_per_minute == 0 {
            return None;
        }

        // A zero concurrency cap with a window limit still needs a
        // functioning semaphore; treat 0 as "effectively unbounded".
        let concurrent = if config.max_concurrent == 0 {
            Semaphore::MAX_PERMITS
        } else {
            config.max_concurrent
        };

        Some(Self {
            semaphore: Arc::new(Semaphore::new(concurrent)),
            waiting_count: AtomicUsize::new(0),
            max_waiting: if config.max_waiting == 0 {
                None
            } else {
                Some(config.max_waiting)
            },
            max_wait: Duration::from_secs(config.max_wait_secs),
            windows: DashMap::new(),
            max_per_window: if config.max_per_minute == 0 {
                None
            } else {
                Some(config.max_per_minute)
            },
            window: Duration::from_secs(60),
        })
    }

    /// Record a request in the user's fixed window, rejecting with the time
    /// until the window resets when the cap is hit.
    fn check_window(&self, user_id: UserId) -> Result<()> {
        let Some(max) = self.max_per_window else {
            return Ok(());
        };

        let now = Instant::now();
        let mut entry = self.windows.entry(user_id).or_insert_with(|| Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= max {
            let elapsed = now.duration_since(entry.started);
            let retry_after = self.window.saturating_sub(elapsed).as_secs().max(1);
            return Err(Error::TooManyRequests {
                message: "Generation rate limit exceeded. Please retry later.".to_string(),
                retry_after_secs: retry_after,
            });
        }

        entry.count += 1;
        Ok(())
    }

    /// Attempts to acquire a permit for a generation request.
    ///
    /// Returns `Ok(GenerationPermit)` if a slot is available or becomes
    /// available within the timeout. Returns `Err(TooManyRequests)` if:
    /// - The user's window cap is exceeded
    /// - The waiting queue is full (`max_waiting` reached)
    /// - The timeout expires before a slot becomes available
    pub async fn acquire(&self, user_id: UserId) -> Result<GenerationPermit> {
        self.check_window(user_id)?;

        // Try to acquire immediately without waiting
        if let Ok(permit) = self.semaphore.clone().try_acquire_owned() {
            return Ok(GenerationPermit { _permit: permit });
        }

        // Check if we can join the waiting queue
        let current_waiting = self.waiting_count.fetch_add(1, Ordering::SeqCst);
        if let Some(max_waiting) = self.max_waiting
            && current_waiting >= max_waiting
        {
            self.waiting_count.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::TooManyRequests {
                message: "Too many generations in progress. Please retry later.".to_string(),
                retry_after_secs: self.max_wait.as_secs().max(1),
            });
        }

        // A permit may have been released between the first try_acquire and
        // incrementing waiting_count; try once more before sleeping.
        if let Ok(permit) = self.semaphore.clone().try_acquire_owned() {
            self.waiting_count.fetch_sub(1, Ordering::SeqCst);
            return Ok(GenerationPermit { _permit: permit });
        }

        let result = if self.max_wait.is_zero() {
            Err(Error::TooManyRequests {
                message: "Too many generations in progress. Please retry later.".to_string(),
                retry_after_secs: 1,
            })
        } else {
            match tokio::time::timeout(self.max_wait, self.semaphore.clone().acquire_owned()).await {
                Ok(Ok(permit)) => Ok(GenerationPermit { _permit: permit }),
                Ok(Err(_)) => {
                    // Semaphore closed (shouldn't happen in normal operation)
                    Err(Error::TooManyRequests {
                        message: "Generation service temporarily unavailable.".to_string(),
                        retry_after_secs: self.max_wait.as_secs().max(1),
                    })
                }
                Err(_) => Err(Error::TooManyRequests {
                    message: "Timed out waiting for a generation slot. Please retry later.".to_string(),
                    retry_after_secs: self.max_wait.as_secs().max(1),
                }),
            }
        };

        self.waiting_count.fetch_sub(1, Ordering::SeqCst);

        result
    }
}

/// RAII guard that releases the generation permit when dropped.
///
/// Uses an owned permit so it can be held across await points.
#[must_use]
pub struct GenerationPermit {
    _permit: OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_config(max_concurrent: usize, max_waiting: usize, max_wait_secs: u64, max_per_minute: usize) -> GenerationLimitsConfig {
        GenerationLimitsConfig {
            max_concurrent,
            max_waiting,
            max_wait_secs,
            max_per_minute,
        }
    }

    #[test]
    fn test_unlimited_returns_none() {
        let config = test_config(0, 20, 60, 0);
        assert!(GenerationLimiter::new(&config).is_none());
    }

    #[tokio::test]
    async fn test_acquire_when_available() {
        let config = test_config(2, 10, 60, 0);
        let limiter = GenerationLimiter::new(&config).unwrap();
        let user = Uuid::new_v4();

        let permit1 = limiter.acquire(user).await;
        assert!(permit1.is_ok());

        let permit2 = limiter.acquire(user).await;
        assert!(permit2.is_ok());
    }

    #[tokio::test]
    async fn test_acquire_waits_and_succeeds() {
        let config = test_config(1, 10, 5, 0);
        let limiter = Arc::new(GenerationLimiter::new(&config).unwrap());
        let user = Uuid::new_v4();

        let permit1 = limiter.acquire(user).await.unwrap();

        let limiter_clone = limiter.clone();
        let handle = tokio::spawn(async move { limiter_clone.acquire(user).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(permit1);

        let result = handle.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_acquire_rejects_when_queue_full() {
        let config = test_config(1, 1, 60, 0);
        let limiter = Arc::new(GenerationLimiter::new(&config).unwrap());
        let user = Uuid::new_v4();

        let _permit1 = limiter.acquire(user).await.unwrap();

        let limiter_clone = limiter.clone();
        let _handle1 = tokio::spawn(async move { limiter_clone.acquire(user).await });

        tokio::time::sleep(Duration::from_millis(50)).await;

        let result = limiter.acquire(user).await;
        assert!(result.is_err());
        if let Err(Error::TooManyRequests { message, .. }) = result {
            assert!(message.contains("Too many generations"));
        } else {
            panic!("Expected TooManyRequests error");
        }
    }

    #[tokio::test]
    async fn test_per_user_window_cap() {
        let config = test_config(10, 10, 60, 2);
        let limiter = GenerationLimiter::new(&config).unwrap();
        let user = Uuid::new_v4();

        let _p1 = limiter.acquire(user).await.unwrap();
        let _p2 = limiter.acquire(user).await.unwrap();

        let result = limiter.acquire(user).await;
        assert!(result.is_err());
        if let Err(Error::TooManyRequests { retry_after_secs, .. }) = result {
            assert!(retry_after_secs >= 1 && retry_after_secs <= 60);
        } else {
            panic!("Expected TooManyRequests error");
        }
    }

    #[tokio::test]
    async fn test_window_is_per_user() {
        let config = test_config(10, 10, 60, 1);
        let limiter = GenerationLimiter::new(&config).unwrap();

        let _p1 = limiter.acquire(Uuid::new_v4()).await.unwrap();
        // A different user has their own window
        let p2 = limiter.acquire(Uuid::new_v4()).await;
        assert!(p2.is_ok());
    }

    #[tokio::test]
    async fn test_zero_wait_rejects_immediately() {
        let config = test_config(1, 10, 0, 0);
        let limiter = GenerationLimiter::new(&config).unwrap();
        let user = Uuid::new_v4();

        let _permit1 = limiter.acquire(user).await.unwrap();

        let start = std::time::Instant::now();
        let result = limiter.acquire(user).await;
        assert!(result.is_err());
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_permit_released_on_drop() {
        let config = test_config(1, 10, 1, 0);
        let limiter = GenerationLimiter::new(&config).unwrap();
        let user = Uuid::new_v4();

        {
            let _permit = limiter.acquire(user).await.unwrap();
        }

        let result = limiter.acquire(user).await;
        assert!(result.is_ok());
    }
}
