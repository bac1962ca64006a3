//! In-process tiered backend — the default when no external store is configured.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rolectx_core::clock::{Clock, SystemClock};
use rolectx_core::error::MemoryError;
use rolectx_core::memory::{MemoryEntry, MemoryScope, MemoryStore, MemoryValue, TierTtls};
use tokio::sync::RwLock;
use tracing::debug;

type Tier = RwLock<HashMap<String, MemoryEntry>>;

/// Three independently locked maps, one per scope.
///
/// Activity in one tier never waits on another tier's lock. Writers to the
/// same tier are serialized by its lock, so readers observe either the old
/// or the new entry for a key.
pub struct TieredMemoryStore {
    ttls: TierTtls,
    clock: Arc<dyn Clock>,
    session: Tier,
    user: Tier,
    knowledge: Tier,
}

impl TieredMemoryStore {
    pub fn new(ttls: TierTtls, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttls,
            clock,
            session: RwLock::new(HashMap::new()),
            user: RwLock::new(HashMap::new()),
            knowledge: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttls(&self) -> TierTtls {
        self.ttls
    }

    fn tier(&self, scope: MemoryScope) -> &Tier {
        match scope {
            MemoryScope::Session => &self.session,
            MemoryScope::User => &self.user,
            MemoryScope::Knowledge => &self.knowledge,
        }
    }

    async fn sweep_tier(&self, scope: MemoryScope, now: DateTime<Utc>) -> usize {
        // Expiry is checked and the entry removed under the same write lock,
        // so an entry refreshed after an earlier observation survives.
        let mut tier = self.tier(scope).write().await;
        let before = tier.len();
        tier.retain(|_, entry| !entry.is_expired(now));
        before - tier.len()
    }
}

impl Default for TieredMemoryStore {
    fn default() -> Self {
        Self::new(TierTtls::default(), Arc::new(SystemClock))
    }
}

#[async_trait]
impl MemoryStore for TieredMemoryStore {
    fn name(&self) -> &str {
        "in_process"
    }

    async fn put(
        &self,
        scope: MemoryScope,
        key: &str,
        value: MemoryValue,
        ttl_override: Option<Duration>,
    ) -> Result<MemoryEntry, MemoryError> {
        let ttl = ttl_override.unwrap_or_else(|| self.ttls.for_scope(scope));
        let entry = MemoryEntry::new(scope, key, value, self.clock.now(), ttl);

        self.tier(scope)
            .write()
            .await
            .insert(key.to_string(), entry.clone());

        debug!(scope = %scope, key = %key, expires_at = %entry.expires_at, "Stored memory");
        Ok(entry)
    }

    async fn get_entry(&self, scope: MemoryScope, key: &str) -> Result<MemoryEntry, MemoryError> {
        let now = self.clock.now();
        {
            let tier = self.tier(scope).read().await;
            match tier.get(key) {
                None => return Err(MemoryError::not_found(scope, key)),
                Some(entry) if !entry.is_expired(now) => return Ok(entry.clone()),
                Some(_) => {}
            }
        }

        // Stale: evict it, unless a writer refreshed it since we looked.
        let mut tier = self.tier(scope).write().await;
        match tier.get(key) {
            Some(entry) if !entry.is_expired(now) => Ok(entry.clone()),
            Some(_) => {
                tier.remove(key);
                debug!(scope = %scope, key = %key, "Evicted expired memory on read");
                Err(MemoryError::not_found(scope, key))
            }
            None => Err(MemoryError::not_found(scope, key)),
        }
    }

    async fn delete(&self, scope: MemoryScope, key: &str) -> Result<(), MemoryError> {
        if self.tier(scope).write().await.remove(key).is_some() {
            debug!(scope = %scope, key = %key, "Deleted memory");
        }
        Ok(())
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, MemoryError> {
        let mut removed = 0;
        for scope in MemoryScope::ALL {
            removed += self.sweep_tier(scope, now).await;
        }
        Ok(removed)
    }

    async fn flush(&self, scope: Option<MemoryScope>) -> Result<(), MemoryError> {
        match scope {
            Some(scope) => self.tier(scope).write().await.clear(),
            None => {
                for scope in MemoryScope::ALL {
                    self.tier(scope).write().await.clear();
                }
            }
        }
        debug!(scope = ?scope, "Flushed memory");
        Ok(())
    }

    async fn list(&self, scope: MemoryScope) -> Result<Vec<MemoryEntry>, MemoryError> {
        let now = self.clock.now();
        let tier = self.tier(scope).read().await;
        let mut entries: Vec<MemoryEntry> = tier
            .values()
            .filter(|e| !e.is_expired(now))
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn count(&self, scope: Option<MemoryScope>) -> Result<usize, MemoryError> {
        let now = self.clock.now();
        let scopes = match scope {
            Some(scope) => vec![scope],
            None => MemoryScope::ALL.to_vec(),
        };
        let mut total = 0;
        for scope in scopes {
            total += self
                .tier(scope)
                .read()
                .await
                .values()
                .filter(|e| !e.is_expired(now))
                .count();
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rolectx_core::clock::ManualClock;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn store() -> (TieredMemoryStore, ManualClock) {
        let clock = ManualClock::new(t0());
        let store = TieredMemoryStore::new(TierTtls::default(), Arc::new(clock.clone()));
        (store, clock)
    }

    fn secs(n: i64) -> chrono::Duration {
        chrono::Duration::seconds(n)
    }

    #[tokio::test]
    async fn put_then_get_in_every_scope() {
        let (mem, _) = store();
        for scope in MemoryScope::ALL {
            mem.put(scope, "k", format!("{scope} value").into(), None).await.unwrap();
            assert_eq!(
                mem.get(scope, "k").await.unwrap(),
                MemoryValue::Text(format!("{scope} value"))
            );
        }
    }

    #[tokio::test]
    async fn scopes_are_independent_namespaces() {
        let (mem, _) = store();
        mem.put(MemoryScope::Session, "shared", "session".into(), None).await.unwrap();
        mem.put(MemoryScope::User, "shared", "user".into(), None).await.unwrap();

        mem.delete(MemoryScope::Session, "shared").await.unwrap();
        assert!(mem.get(MemoryScope::Session, "shared").await.is_err());
        assert_eq!(mem.get(MemoryScope::User, "shared").await.unwrap(), MemoryValue::from("user"));
        assert!(mem.get(MemoryScope::Knowledge, "shared").await.is_err());
    }

    #[tokio::test]
    async fn last_writer_wins_without_duplicates() {
        let (mem, _) = store();
        mem.put(MemoryScope::User, "k", "v1".into(), None).await.unwrap();
        mem.put(MemoryScope::User, "k", "v2".into(), None).await.unwrap();

        assert_eq!(mem.get(MemoryScope::User, "k").await.unwrap(), MemoryValue::from("v2"));
        assert_eq!(mem.count(Some(MemoryScope::User)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn session_expiry_boundary() {
        let (mem, clock) = store();
        mem.put(MemoryScope::Session, "s1", "hi".into(), None).await.unwrap();

        clock.set(t0() + secs(3599));
        assert!(mem.get(MemoryScope::Session, "s1").await.is_ok());

        clock.set(t0() + secs(3600));
        let err = mem.get(MemoryScope::Session, "s1").await.unwrap_err();
        assert!(matches!(err, MemoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn expired_read_looks_like_missing_and_evicts() {
        let (mem, clock) = store();
        mem.put(MemoryScope::Session, "old", "stale".into(), None).await.unwrap();
        clock.set(t0() + secs(7200));

        let expired = mem.get(MemoryScope::Session, "old").await.unwrap_err().to_string();
        let missing = mem.get(MemoryScope::Session, "never").await.unwrap_err().to_string();
        assert_eq!(expired.replace("old", "?"), missing.replace("never", "?"));

        // Already physically gone, so a sweep finds nothing.
        assert_eq!(mem.sweep(clock.now()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ttl_override_replaces_tier_default() {
        let (mem, clock) = store();
        let entry = mem
            .put(MemoryScope::Knowledge, "brief", "x".into(), Some(Duration::from_secs(10)))
            .await
            .unwrap();
        assert_eq!(entry.expires_at, t0() + secs(10));

        clock.set(t0() + secs(10));
        assert!(mem.get(MemoryScope::Knowledge, "brief").await.is_err());
    }

    #[tokio::test]
    async fn put_refreshes_lifetime() {
        let (mem, clock) = store();
        mem.put(MemoryScope::Session, "s", "first".into(), None).await.unwrap();

        clock.set(t0() + secs(3000));
        let entry = mem.put(MemoryScope::Session, "s", "second".into(), None).await.unwrap();
        assert_eq!(entry.created_at, t0() + secs(3000));

        clock.set(t0() + secs(3600));
        assert_eq!(mem.get(MemoryScope::Session, "s").await.unwrap(), MemoryValue::from("second"));
    }

    #[tokio::test]
    async fn sweep_counts_only_expired_across_tiers() {
        let (mem, _) = store();
        mem.put(MemoryScope::Session, "s", "x".into(), None).await.unwrap();
        mem.put(MemoryScope::User, "u", "x".into(), None).await.unwrap();
        mem.put(MemoryScope::Knowledge, "k", "x".into(), Some(Duration::from_secs(60)))
            .await
            .unwrap();

        assert_eq!(mem.sweep(t0() + secs(59)).await.unwrap(), 0);
        assert_eq!(mem.sweep(t0() + secs(3600)).await.unwrap(), 2);
        assert_eq!(mem.count(None).await.unwrap(), 1);
        assert!(mem.get(MemoryScope::User, "u").await.is_ok());
    }

    #[tokio::test]
    async fn sweep_spares_entry_refreshed_before_removal() {
        let (mem, clock) = store();
        mem.put(MemoryScope::Session, "s", "old".into(), None).await.unwrap();

        // Refresh at t0+1h, then sweep with the instant the old entry expired.
        clock.set(t0() + secs(3600));
        mem.put(MemoryScope::Session, "s", "new".into(), None).await.unwrap();
        assert_eq!(mem.sweep(t0() + secs(3600)).await.unwrap(), 0);
        assert_eq!(mem.get(MemoryScope::Session, "s").await.unwrap(), MemoryValue::from("new"));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (mem, _) = store();
        mem.delete(MemoryScope::User, "ghost").await.unwrap();
        mem.put(MemoryScope::User, "k", "v".into(), None).await.unwrap();
        mem.delete(MemoryScope::User, "k").await.unwrap();
        mem.delete(MemoryScope::User, "k").await.unwrap();
        assert_eq!(mem.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn flush_one_scope_or_all() {
        let (mem, _) = store();
        for scope in MemoryScope::ALL {
            mem.put(scope, "k", "v".into(), None).await.unwrap();
        }

        mem.flush(Some(MemoryScope::Session)).await.unwrap();
        assert_eq!(mem.count(Some(MemoryScope::Session)).await.unwrap(), 0);
        assert_eq!(mem.count(None).await.unwrap(), 2);

        mem.flush(None).await.unwrap();
        assert_eq!(mem.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_returns_live_entries_sorted() {
        let (mem, clock) = store();
        mem.put(MemoryScope::User, "b", "2".into(), None).await.unwrap();
        mem.put(MemoryScope::User, "a", "1".into(), None).await.unwrap();
        mem.put(MemoryScope::User, "gone", "x".into(), Some(Duration::from_secs(5)))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(5));

        let keys: Vec<_> = mem
            .list(MemoryScope::User)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn document_values_roundtrip() {
        let (mem, _) = store();
        let doc = serde_json::json!({"risk": "low", "horizon_years": 20});
        mem.put(MemoryScope::User, "profile", doc.clone().into(), None).await.unwrap();
        assert_eq!(
            mem.get(MemoryScope::User, "profile").await.unwrap(),
            MemoryValue::Document(doc)
        );
    }

    #[tokio::test]
    async fn concurrent_writers_leave_one_whole_entry() {
        let mem = Arc::new(TieredMemoryStore::default());
        let writers: Vec<_> = (0..32)
            .map(|i| {
                let mem = mem.clone();
                tokio::spawn(async move {
                    mem.put(MemoryScope::Session, "hot", format!("writer-{i}").into(), None)
                        .await
                        .unwrap();
                })
            })
            .collect();
        futures::future::join_all(writers).await;

        assert_eq!(mem.count(Some(MemoryScope::Session)).await.unwrap(), 1);
        let value = mem.get(MemoryScope::Session, "hot").await.unwrap();
        assert!(value.as_text().unwrap().starts_with("writer-"));
    }
}
