//! Memory trait — tiered key/value storage with per-entry expiry.
//!
//! Memories live in one of three independent tiers:
//! - **session** — conversational context, short-lived (default 1 hour)
//! - **user** — per-user preferences and history (default 30 days)
//! - **knowledge** — durable facts (default 365 days)
//!
//! A key in one tier never collides with the same key in another. Each entry
//! carries its own `expires_at`, computed by the store from the tier TTL (or
//! an explicit override) at write time. An entry whose `expires_at <= now` is
//! logically gone, whether or not a sweep has physically removed it yet.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// One of the three retention tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryScope {
    Session,
    User,
    Knowledge,
}

impl MemoryScope {
    pub const ALL: [MemoryScope; 3] = [MemoryScope::Session, MemoryScope::User, MemoryScope::Knowledge];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryScope::Session => "session",
            MemoryScope::User => "user",
            MemoryScope::Knowledge => "knowledge",
        }
    }
}

impl fmt::Display for MemoryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "session" => Ok(MemoryScope::Session),
            "user" => Ok(MemoryScope::User),
            "knowledge" => Ok(MemoryScope::Knowledge),
            other => Err(format!(
                "unknown memory scope '{other}' (expected session, user or knowledge)"
            )),
        }
    }
}

/// Default retention horizon for each tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierTtls {
    pub session: Duration,
    pub user: Duration,
    pub knowledge: Duration,
}

impl TierTtls {
    pub const SESSION_SECS: u64 = 60 * 60;
    pub const USER_SECS: u64 = 60 * 60 * 24 * 30;
    pub const KNOWLEDGE_SECS: u64 = 60 * 60 * 24 * 365;

    /// TTL applied to new entries in `scope` when no override is given.
    pub fn for_scope(&self, scope: MemoryScope) -> Duration {
        match scope {
            MemoryScope::Session => self.session,
            MemoryScope::User => self.user,
            MemoryScope::Knowledge => self.knowledge,
        }
    }
}

impl Default for TierTtls {
    fn default() -> Self {
        Self {
            session: Duration::from_secs(Self::SESSION_SECS),
            user: Duration::from_secs(Self::USER_SECS),
            knowledge: Duration::from_secs(Self::KNOWLEDGE_SECS),
        }
    }
}

/// The payload of a memory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum MemoryValue {
    /// Plain text, rendered verbatim
    Text(String),
    /// Structured document, rendered as compact JSON
    Document(serde_json::Value),
}

impl MemoryValue {
    /// Text form used when the value is placed in a prompt.
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            MemoryValue::Text(text) => Cow::Borrowed(text),
            MemoryValue::Document(doc) => Cow::Owned(doc.to_string()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MemoryValue::Text(text) => Some(text),
            MemoryValue::Document(_) => None,
        }
    }
}

impl From<&str> for MemoryValue {
    fn from(text: &str) -> Self {
        MemoryValue::Text(text.to_string())
    }
}

impl From<String> for MemoryValue {
    fn from(text: String) -> Self {
        MemoryValue::Text(text)
    }
}

impl From<serde_json::Value> for MemoryValue {
    fn from(doc: serde_json::Value) -> Self {
        MemoryValue::Document(doc)
    }
}

/// A single memory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Tier the entry lives in
    pub scope: MemoryScope,

    /// Key, unique within the tier
    pub key: String,

    /// Stored payload
    pub value: MemoryValue,

    /// When this entry was (last) written
    pub created_at: DateTime<Utc>,

    /// First instant at which the entry is no longer visible
    pub expires_at: DateTime<Utc>,
}

impl MemoryEntry {
    /// Build an entry written at `created_at` that lives for `ttl`.
    ///
    /// A TTL too large to represent saturates at the maximum timestamp.
    pub fn new(
        scope: MemoryScope,
        key: impl Into<String>,
        value: MemoryValue,
        created_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            scope,
            key: key.into(),
            value,
            created_at,
            expires_at,
        }
    }

    /// Expired at `now`: valid strictly before `expires_at`, gone from it on.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// The tiered memory store contract.
///
/// Implementations: in-process tiers (default), or an external key/value
/// adapter supplied by the embedder.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// The backend name (e.g., "in_process").
    fn name(&self) -> &str;

    /// Write `value` under `(scope, key)`, replacing any previous entry and
    /// restarting its lifetime. Returns the stored entry.
    async fn put(
        &self,
        scope: MemoryScope,
        key: &str,
        value: MemoryValue,
        ttl_override: Option<Duration>,
    ) -> std::result::Result<MemoryEntry, MemoryError>;

    /// Fetch a live entry. Missing and expired keys are both `NotFound`.
    async fn get_entry(
        &self,
        scope: MemoryScope,
        key: &str,
    ) -> std::result::Result<MemoryEntry, MemoryError>;

    /// Fetch a live value. Missing and expired keys are both `NotFound`.
    async fn get(
        &self,
        scope: MemoryScope,
        key: &str,
    ) -> std::result::Result<MemoryValue, MemoryError> {
        self.get_entry(scope, key).await.map(|entry| entry.value)
    }

    /// Remove `(scope, key)`. Removing a missing key is not an error.
    async fn delete(&self, scope: MemoryScope, key: &str) -> std::result::Result<(), MemoryError>;

    /// Remove every entry with `expires_at <= now` in all tiers; returns how
    /// many were removed.
    async fn sweep(&self, now: DateTime<Utc>) -> std::result::Result<usize, MemoryError>;

    /// Clear one tier, or all tiers when `scope` is `None`.
    async fn flush(&self, scope: Option<MemoryScope>) -> std::result::Result<(), MemoryError>;

    /// Live entries in `scope`, sorted by key.
    async fn list(&self, scope: MemoryScope) -> std::result::Result<Vec<MemoryEntry>, MemoryError>;

    /// Number of live entries in one tier, or in all tiers.
    async fn count(&self, scope: Option<MemoryScope>) -> std::result::Result<usize, MemoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn default_ttls_match_tier_horizons() {
        let ttls = TierTtls::default();
        assert_eq!(ttls.for_scope(MemoryScope::Session), Duration::from_secs(3600));
        assert_eq!(ttls.for_scope(MemoryScope::User), Duration::from_secs(2_592_000));
        assert_eq!(ttls.for_scope(MemoryScope::Knowledge), Duration::from_secs(31_536_000));
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let entry = MemoryEntry::new(
            MemoryScope::Session,
            "s1",
            "hello".into(),
            t0(),
            Duration::from_secs(3600),
        );
        assert!(!entry.is_expired(t0() + chrono::Duration::seconds(3599)));
        assert!(entry.is_expired(t0() + chrono::Duration::seconds(3600)));
        assert_eq!(
            entry.remaining(t0() + chrono::Duration::seconds(3000)),
            Duration::from_secs(600)
        );
        assert_eq!(entry.remaining(t0() + chrono::Duration::days(1)), Duration::ZERO);
    }

    #[test]
    fn huge_ttl_saturates() {
        let entry = MemoryEntry::new(
            MemoryScope::Knowledge,
            "forever",
            "x".into(),
            t0(),
            Duration::MAX,
        );
        assert_eq!(entry.expires_at, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn scope_parse_and_display() {
        assert_eq!("Knowledge".parse::<MemoryScope>().unwrap(), MemoryScope::Knowledge);
        assert_eq!(MemoryScope::User.to_string(), "user");
        assert!("team".parse::<MemoryScope>().is_err());
    }

    #[test]
    fn document_values_render_as_json() {
        let value = MemoryValue::from(serde_json::json!({"b": 2, "a": 1}));
        assert_eq!(value.render(), r#"{"a":1,"b":2}"#);
        assert_eq!(MemoryValue::from("plain").render(), "plain");
    }

    #[test]
    fn entry_serialization() {
        let entry = MemoryEntry::new(
            MemoryScope::User,
            "prefs",
            "Prefers index funds".into(),
            t0(),
            Duration::from_secs(60),
        );
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains(r#""scope":"user""#));
        assert!(json.contains("index funds"));
        let back: MemoryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
