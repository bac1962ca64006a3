//! Deadline wrapper for network-backed memory stores.
//!
//! External adapters (Redis, Supabase, ...) are supplied by the embedder and
//! plugged in behind [`DeadlineStore`], which bounds every call with a
//! timeout. A call that overruns becomes `BackendUnavailable`; retries, if
//! any, are the adapter's business.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rolectx_core::error::MemoryError;
use rolectx_core::memory::{MemoryEntry, MemoryScope, MemoryStore, MemoryValue};
use tracing::warn;

pub struct DeadlineStore {
    inner: Arc<dyn MemoryStore>,
    deadline: Duration,
}

impl DeadlineStore {
    pub fn new(inner: Arc<dyn MemoryStore>, deadline: Duration) -> Self {
        Self { inner, deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    async fn bounded<T, F>(&self, op: &'static str, call: F) -> Result<T, MemoryError>
    where
        F: Future<Output = Result<T, MemoryError>> + Send,
    {
        match tokio::time::timeout(self.deadline, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    backend = %self.inner.name(),
                    op = op,
                    deadline_ms = self.deadline.as_millis() as u64,
                    "Memory backend call timed out"
                );
                Err(MemoryError::BackendUnavailable(format!(
                    "{} {op} timed out after {}ms",
                    self.inner.name(),
                    self.deadline.as_millis()
                )))
            }
        }
    }
}

#[async_trait]
impl MemoryStore for DeadlineStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn put(
        &self,
        scope: MemoryScope,
        key: &str,
        value: MemoryValue,
        ttl_override: Option<Duration>,
    ) -> Result<MemoryEntry, MemoryError> {
        self.bounded("put", self.inner.put(scope, key, value, ttl_override))
            .await
    }

    async fn get_entry(&self, scope: MemoryScope, key: &str) -> Result<MemoryEntry, MemoryError> {
        self.bounded("get", self.inner.get_entry(scope, key)).await
    }

    async fn delete(&self, scope: MemoryScope, key: &str) -> Result<(), MemoryError> {
        self.bounded("delete", self.inner.delete(scope, key)).await
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, MemoryError> {
        self.bounded("sweep", self.inner.sweep(now)).await
    }

    async fn flush(&self, scope: Option<MemoryScope>) -> Result<(), MemoryError> {
        self.bounded("flush", self.inner.flush(scope)).await
    }

    async fn list(&self, scope: MemoryScope) -> Result<Vec<MemoryEntry>, MemoryError> {
        self.bounded("list", self.inner.list(scope)).await
    }

    async fn count(&self, scope: Option<MemoryScope>) -> Result<usize, MemoryError> {
        self.bounded("count", self.inner.count(scope)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TieredMemoryStore;

    /// Answers every call only after `delay`.
    struct SlowStore {
        inner: TieredMemoryStore,
        delay: Duration,
    }

    #[async_trait]
    impl MemoryStore for SlowStore {
        fn name(&self) -> &str {
            "slow"
        }

        async fn put(
            &self,
            scope: MemoryScope,
            key: &str,
            value: MemoryValue,
            ttl_override: Option<Duration>,
        ) -> Result<MemoryEntry, MemoryError> {
            tokio::time::sleep(self.delay).await;
            self.inner.put(scope, key, value, ttl_override).await
        }

        async fn get_entry(&self, scope: MemoryScope, key: &str) -> Result<MemoryEntry, MemoryError> {
            tokio::time::sleep(self.delay).await;
            self.inner.get_entry(scope, key).await
        }

        async fn delete(&self, scope: MemoryScope, key: &str) -> Result<(), MemoryError> {
            self.inner.delete(scope, key).await
        }

        async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, MemoryError> {
            self.inner.sweep(now).await
        }

        async fn flush(&self, scope: Option<MemoryScope>) -> Result<(), MemoryError> {
            self.inner.flush(scope).await
        }

        async fn list(&self, scope: MemoryScope) -> Result<Vec<MemoryEntry>, MemoryError> {
            self.inner.list(scope).await
        }

        async fn count(&self, scope: Option<MemoryScope>) -> Result<usize, MemoryError> {
            self.inner.count(scope).await
        }
    }

    fn slow(delay_ms: u64) -> Arc<dyn MemoryStore> {
        Arc::new(SlowStore {
            inner: TieredMemoryStore::default(),
            delay: Duration::from_millis(delay_ms),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn calls_within_deadline_pass_through() {
        let store = DeadlineStore::new(slow(50), Duration::from_millis(200));
        store.put(MemoryScope::User, "k", "v".into(), None).await.unwrap();
        assert_eq!(store.get(MemoryScope::User, "k").await.unwrap(), MemoryValue::from("v"));
        assert_eq!(store.name(), "slow");
    }

    #[tokio::test(start_paused = true)]
    async fn overrunning_call_is_backend_unavailable() {
        let store = DeadlineStore::new(slow(500), Duration::from_millis(100));
        let err = store.get(MemoryScope::User, "k").await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(err.to_string().contains("timed out after 100ms"));
    }

    #[tokio::test(start_paused = true)]
    async fn misses_stay_not_found() {
        let store = DeadlineStore::new(slow(10), Duration::from_millis(100));
        let err = store.get(MemoryScope::Session, "nothing").await.unwrap_err();
        assert!(matches!(err, MemoryError::NotFound { .. }));
    }
}
