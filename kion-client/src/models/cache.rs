//! Cached temporary credentials and their composite key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::api::TemporaryCredentials;

/// Identifies one cached credential: (host, IDMS, username, account, role).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Render the tuple as a JSON array so no component can bleed into the
    /// next one, whatever characters it contains.
    pub fn new(host: &str, idms: u32, username: &str, account_id: &str, role: &str) -> Self {
        let rendered = serde_json::json!([host, idms, username, account_id, role]).to_string();
        Self(rendered)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Temporary credentials plus the instant they stop being trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedCredential {
    pub credentials: TemporaryCredentials,
    pub expiry: DateTime<Utc>,
}

impl CachedCredential {
    pub fn new(credentials: TemporaryCredentials, expiry: DateTime<Utc>) -> Self {
        Self {
            credentials,
            expiry,
        }
    }

    /// Usable only strictly before `expiry`.
    #[must_use]
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_deterministic() {
        let a = CacheKey::new("kion.example.com", 2, "alice", "111122223333", "admin");
        let b = CacheKey::new("kion.example.com", 2, "alice", "111122223333", "admin");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), r#"["kion.example.com",2,"alice","111122223333","admin"]"#);
    }

    #[test]
    fn test_cache_key_distinguishes_roles() {
        let a = CacheKey::new("h", 1, "alice", "1", "admin");
        let b = CacheKey::new("h", 1, "alice", "1", "readonly");
        assert_ne!(a, b);
    }

    #[test]
    fn test_cache_key_separator_in_component_does_not_collide() {
        let a = CacheKey::new("h", 1, "alice:1", "2", "r");
        let b = CacheKey::new("h", 1, "alice", "1:2", "r");
        assert_ne!(a, b);
    }

    #[test]
    fn test_freshness_boundary() {
        let now = Utc::now();
        let creds = TemporaryCredentials {
            access_key_id: "a".into(),
            secret_access_key: "s".into(),
            session_token: "t".into(),
        };
        let cached = CachedCredential::new(creds, now);
        assert!(!cached.is_fresh_at(now));
        assert!(cached.is_fresh_at(now - chrono::TimeDelta::seconds(1)));
    }
}
