//! In-memory store implementations.
//!
//! Used by tests and by local runs without Postgres/Redis. Both are safe to
//! share across tasks.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

use super::AuthError;
use super::store::{CredentialStore, RevocationStore};
use crate::models::auth::{Role, User};

/// `CredentialStore` keyed by email.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    users: DashMap<String, User>,
    next_id: AtomicI64,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn add_user(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
        is_active: bool,
    ) -> Result<(), AuthError> {
        match self.users.entry(email.to_string()) {
            Entry::Occupied(_) => Err(AuthError::DuplicateEmail),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                slot.insert(User {
                    id,
                    email: email.to_string(),
                    password_hash: password_hash.to_string(),
                    role,
                    is_active,
                    refresh_token: None,
                });
                Ok(())
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self.users.get(email).map(|u| u.value().clone()))
    }

    async fn check_exists(&self, email: &str) -> Result<bool, AuthError> {
        Ok(self.users.contains_key(email))
    }

    async fn set_refresh_token(&self, email: &str, token: &str) -> Result<(), AuthError> {
        if let Some(mut user) = self.users.get_mut(email) {
            user.refresh_token = Some(token.to_string());
        }
        Ok(())
    }

    async fn clear_refresh_token(&self, email: &str) -> Result<(), AuthError> {
        if let Some(mut user) = self.users.get_mut(email) {
            user.refresh_token = None;
        }
        Ok(())
    }

    async fn list_emails(&self) -> Result<Vec<String>, AuthError> {
        let mut users: Vec<(i64, String)> = self
            .users
            .iter()
            .map(|u| (u.id, u.email.clone()))
            .collect();
        users.sort();
        Ok(users.into_iter().map(|(_, email)| email).collect())
    }
}

#[derive(Debug)]
struct RevocationEntry {
    value: String,
    expires_at: Instant,
}

/// `RevocationStore` with lazy expiry.
#[derive(Debug, Default)]
pub struct MemoryRevocationStore {
    entries: DashMap<String, RevocationEntry>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live entries; expired ones are dropped first.
    pub fn len(&self) -> usize {
        self.prune();
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Marker stored under `key`, if still live.
    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone())
    }

    fn prune(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AuthError> {
        self.prune();
        self.entries.insert(
            key.to_string(),
            RevocationEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, AuthError> {
        let now = Instant::now();
        let live = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.expires_at > now);
        if !live {
            self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        }
        Ok(live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryCredentialStore::new();
        store.add_user("a@x.com", "h", Role::User, true).await.unwrap();
        let err = store
            .add_user("a@x.com", "h2", Role::Admin, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));

        let user = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(user.password_hash, "h");
        assert_eq!(user.role, Role::User);
    }

    #[tokio::test]
    async fn refresh_token_is_overwritten_then_cleared() {
        let store = MemoryCredentialStore::new();
        store.add_user("a@x.com", "h", Role::User, true).await.unwrap();

        store.set_refresh_token("a@x.com", "first").await.unwrap();
        store.set_refresh_token("a@x.com", "second").await.unwrap();
        let user = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(user.refresh_token.as_deref(), Some("second"));

        store.clear_refresh_token("a@x.com").await.unwrap();
        let user = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(user.refresh_token, None);
    }

    #[tokio::test]
    async fn emails_are_listed_in_insertion_order() {
        let store = MemoryCredentialStore::new();
        for email in ["c@x.com", "a@x.com", "b@x.com"] {
            store.add_user(email, "h", Role::User, true).await.unwrap();
        }
        assert_eq!(
            store.list_emails().await.unwrap(),
            vec!["c@x.com", "a@x.com", "b@x.com"]
        );
        assert!(store.check_exists("b@x.com").await.unwrap());
        assert!(!store.check_exists("z@x.com").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn revocation_entries_expire() {
        let store = MemoryRevocationStore::new();
        store
            .put("refresh_token:1", "revoked", Duration::from_secs(30))
            .await
            .unwrap();
        assert!(store.exists("refresh_token:1").await.unwrap());
        assert_eq!(store.get("refresh_token:1").as_deref(), Some("revoked"));
        assert_eq!(store.len(), 1);

        tokio::time::advance(Duration::from_secs(31)).await;

        assert!(!store.exists("refresh_token:1").await.unwrap());
        assert!(store.is_empty());
    }
}
