// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Session token handling and management.
use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, gauge};
use tokio::sync::RwLock;

use super::token_generator::generate_secure_token;
use crate::metrics::{SESSION_ACTIVE, SESSION_CREATED, SESSION_EXPIRED};

/// Longest session lifetime accepted from configuration (one year)
pub const MAX_SESSION_TTL_SECS: u64 = 60 * 60 * 24 * 365;

/// Authenticated session
#[derive(Debug, Clone)]
pub struct Session {
    /// Identifier of the authenticated account
    pub identifier: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// In-memory session store keyed by token
#[derive(Debug, Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl SessionManager {
    /// Create a session manager whose sessions live `ttl_secs` seconds
    pub fn new(ttl_secs: u64) -> Self {
        let ttl_secs = ttl_secs.min(MAX_SESSION_TTL_SECS) as i64;
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Open a session for `identifier` and return its token
    pub async fn create_session(&self, identifier: &str) -> (String, Session) {
        let token = generate_secure_token();
        let now = Utc::now();
        let session = Session {
            identifier: identifier.to_string(),
            created_at: now,
            expires_at: now + self.ttl,
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(token.clone(), session.clone());

        counter!(SESSION_CREATED).increment(1);
        gauge!(SESSION_ACTIVE).set(sessions.len() as f64);

        (token, session)
    }

    /// Look up a live session. Expired sessions are treated as absent.
    pub async fn get_session(&self, token: &str) -> Option<Session> {
        let sessions = self.sessions.read().await;
        sessions
            .get(token)
            .filter(|session| !session.is_expired(Utc::now()))
            .cloned()
    }

    /// Revoke a session. Returns whether it existed.
    pub async fn revoke_session(&self, token: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(token).is_some();
        gauge!(SESSION_ACTIVE).set(sessions.len() as f64);
        removed
    }

    /// Drop expired sessions and return how many were removed
    pub async fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        let before_count = sessions.len();

        sessions.retain(|_, session| !session.is_expired(now));

        let removed = before_count - sessions.len();
        if removed > 0 {
            counter!(SESSION_EXPIRED).increment(removed as u64);
            gauge!(SESSION_ACTIVE).set(sessions.len() as f64);
        }
        removed
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_management() {
        let manager = SessionManager::new(3600);

        let (token, session) = manager.create_session("alice@example.com").await;
        assert_eq!(session.identifier, "alice@example.com");
        assert!(session.expires_at > session.created_at);

        let fetched = manager.get_session(&token).await.unwrap();
        assert_eq!(fetched.identifier, "alice@example.com");

        assert!(manager.get_session("invalid-token").await.is_none());
    }

    #[tokio::test]
    async fn test_revoke_session() {
        let manager = SessionManager::new(3600);
        let (token, _) = manager.create_session("alice@example.com").await;

        assert!(manager.revoke_session(&token).await);
        assert!(!manager.revoke_session(&token).await);
        assert!(manager.get_session(&token).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_invisible_and_cleaned() {
        let manager = SessionManager::new(0);
        let (token, _) = manager.create_session("alice@example.com").await;

        assert!(manager.get_session(&token).await.is_none());
        assert_eq!(manager.active_count().await, 1);

        assert_eq!(manager.cleanup_expired().await, 1);
        assert_eq!(manager.active_count().await, 0);
    }
}
