//! In-memory key repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::DomainError;
use crate::domain::access_key::{
    BindVerdict, Identity, IdentityPolicy, InsertOutcome, KeyRecord, KeyRepository, bind_or_match,
};

/// In-memory implementation of KeyRepository
///
/// The whole map sits behind one lock. Bind-or-match runs under the write
/// guard without yielding, so once it holds the lock it always completes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKeyRepository {
    keys: Arc<RwLock<HashMap<String, KeyRecord>>>,
}

impl InMemoryKeyRepository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository with initial records
    pub fn with_records(records: Vec<KeyRecord>) -> Self {
        let keys = records
            .into_iter()
            .map(|r| (r.key().to_string(), r))
            .collect();

        Self {
            keys: Arc::new(RwLock::new(keys)),
        }
    }
}

#[async_trait]
impl KeyRepository for InMemoryKeyRepository {
    async fn insert(&self, record: KeyRecord) -> Result<InsertOutcome, DomainError> {
        let mut keys = self.keys.write().await;

        match keys.entry(record.key().to_string()) {
            Entry::Occupied(_) => Ok(InsertOutcome::Collision),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn try_bind_or_match(
        &self,
        key: &str,
        identity: &Identity,
        policy: &IdentityPolicy,
        now: DateTime<Utc>,
    ) -> Result<BindVerdict, DomainError> {
        let mut keys = self.keys.write().await;
        Ok(bind_or_match(keys.get_mut(key), identity, policy, now))
    }

    async fn get(&self, key: &str) -> Result<Option<KeyRecord>, DomainError> {
        let keys = self.keys.read().await;
        Ok(keys.get(key).cloned())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, DomainError> {
        let mut keys = self.keys.write().await;
        let before = keys.len();

        keys.retain(|_, record| !record.is_expired_at(now));

        Ok(before - keys.len())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let keys = self.keys.read().await;
        Ok(keys.len())
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(id: &str) -> Identity {
        Identity::new()
            .with_attribute("userid", id)
            .with_attribute("placeid", "42")
            .with_attribute("executor", "x")
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = InMemoryKeyRepository::new();
        let record = KeyRecord::new("KEY-1", Utc::now(), Duration::hours(1)).unwrap();

        let outcome = repo.insert(record.clone()).await.unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted);

        let retrieved = repo.get("KEY-1").await.unwrap();
        assert_eq!(retrieved, Some(record));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_collision_does_not_overwrite() {
        let now = Utc::now();
        let repo = InMemoryKeyRepository::new();
        let mut original = KeyRecord::new("KEY-1", now, Duration::hours(1)).unwrap();
        original.bind(user("a"));
        repo.insert(original.clone()).await.unwrap();

        let duplicate = KeyRecord::new("KEY-1", now, Duration::hours(48)).unwrap();
        let outcome = repo.insert(duplicate).await.unwrap();

        assert_eq!(outcome, InsertOutcome::Collision);
        assert_eq!(repo.get("KEY-1").await.unwrap(), Some(original));
    }

    #[tokio::test]
    async fn test_bind_then_match() {
        let now = Utc::now();
        let repo = InMemoryKeyRepository::new();
        let policy = IdentityPolicy::default();
        repo.insert(KeyRecord::new("KEY-1", now, Duration::hours(1)).unwrap())
            .await
            .unwrap();

        let first = repo
            .try_bind_or_match("KEY-1", &user("a"), &policy, now)
            .await
            .unwrap();
        assert!(matches!(first, BindVerdict::Bound { first: true, .. }));

        let again = repo
            .try_bind_or_match("KEY-1", &user("a"), &policy, now)
            .await
            .unwrap();
        assert!(matches!(again, BindVerdict::Bound { first: false, .. }));

        let other = repo
            .try_bind_or_match("KEY-1", &user("b"), &policy, now)
            .await
            .unwrap();
        assert_eq!(other, BindVerdict::Conflict);

        let stored = repo.get("KEY-1").await.unwrap().unwrap();
        assert_eq!(stored.bound_identity(), Some(&user("a")));
    }

    #[tokio::test]
    async fn test_unknown_key() {
        let repo = InMemoryKeyRepository::new();

        let verdict = repo
            .try_bind_or_match("nope", &user("a"), &IdentityPolicy::default(), Utc::now())
            .await
            .unwrap();

        assert_eq!(verdict, BindVerdict::NotFound);
    }

    #[tokio::test]
    async fn test_expired_key_left_in_place() {
        let now = Utc::now();
        let record = KeyRecord::new("KEY-1", now, Duration::hours(1)).unwrap();
        let repo = InMemoryKeyRepository::with_records(vec![record]);

        let verdict = repo
            .try_bind_or_match(
                "KEY-1",
                &user("a"),
                &IdentityPolicy::default(),
                now + Duration::hours(1),
            )
            .await
            .unwrap();

        assert_eq!(verdict, BindVerdict::Expired);

        let stored = repo.get("KEY-1").await.unwrap().unwrap();
        assert!(!stored.is_bound());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let now = Utc::now();
        let repo = InMemoryKeyRepository::with_records(vec![
            KeyRecord::new("short", now, Duration::minutes(10)).unwrap(),
            KeyRecord::new("long", now, Duration::hours(10)).unwrap(),
        ]);

        let purged = repo.purge_expired(now + Duration::hours(1)).await.unwrap();

        assert_eq!(purged, 1);
        assert!(repo.get("short").await.unwrap().is_none());
        assert!(repo.get("long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_first_binds_have_one_winner() {
        let now = Utc::now();
        let repo = Arc::new(InMemoryKeyRepository::new());
        let policy = Arc::new(IdentityPolicy::default());
        repo.insert(KeyRecord::new("KEY-1", now, Duration::hours(1)).unwrap())
            .await
            .unwrap();

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let repo = repo.clone();
                let policy = policy.clone();
                tokio::spawn(async move {
                    repo.try_bind_or_match("KEY-1", &user(&i.to_string()), &policy, now)
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                BindVerdict::Bound { first: true, .. } => winners += 1,
                BindVerdict::Conflict => {}
                other => panic!("unexpected verdict: {:?}", other),
            }
        }

        assert_eq!(winners, 1);
    }
}
