//! Key repository trait and the shared bind-or-match rule

use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg(test)]
use mockall::automock;

use super::entity::KeyRecord;
use super::identity::{Identity, IdentityPolicy};
use super::verdict::BindVerdict;
use crate::domain::DomainError;

/// Result of an insert-if-absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A record with the same key string already exists; nothing was written
    Collision,
}

/// Persistence backend for key records
///
/// Implementations must make [`KeyRepository::try_bind_or_match`] indivisible
/// per key: two concurrent calls on the same unbound key must never both see
/// it unbound.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KeyRepository: Send + Sync {
    /// Insert a record unless its key string is already taken
    async fn insert(&self, record: KeyRecord) -> Result<InsertOutcome, DomainError>;

    /// Atomically bind an unbound key or compare against the bound identity
    async fn try_bind_or_match(
        &self,
        key: &str,
        identity: &Identity,
        policy: &IdentityPolicy,
        now: DateTime<Utc>,
    ) -> Result<BindVerdict, DomainError>;

    /// Read a record for informational purposes
    async fn get(&self, key: &str) -> Result<Option<KeyRecord>, DomainError>;

    /// Delete records whose window closed before `now`
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, DomainError>;

    /// Number of stored records
    async fn count(&self) -> Result<usize, DomainError>;

    /// Cheap reachability check for readiness probes
    async fn ping(&self) -> Result<(), DomainError>;
}

/// Decide a bind-or-match against a record, mutating it on first bind
///
/// Backends call this while holding whatever exclusion protects `record`.
pub fn bind_or_match(
    record: Option<&mut KeyRecord>,
    identity: &Identity,
    policy: &IdentityPolicy,
    now: DateTime<Utc>,
) -> BindVerdict {
    let Some(record) = record else {
        return BindVerdict::NotFound;
    };

    if record.is_expired_at(now) {
        return BindVerdict::Expired;
    }

    let expires_at = record.expires_at();

    match record.bound_identity() {
        None => {
            record.bind(identity.clone());
            BindVerdict::Bound {
                first: true,
                expires_at,
            }
        }
        Some(bound) if policy.matches(bound, identity) => BindVerdict::Bound {
            first: false,
            expires_at,
        },
        Some(_) => BindVerdict::Conflict,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(id: &str) -> Identity {
        Identity::new()
            .with_attribute("userid", id)
            .with_attribute("placeid", "1")
            .with_attribute("executor", "x")
    }

    #[test]
    fn test_missing_record() {
        let verdict = bind_or_match(None, &user("a"), &IdentityPolicy::default(), Utc::now());
        assert_eq!(verdict, BindVerdict::NotFound);
    }

    #[test]
    fn test_first_bind_then_match_then_conflict() {
        let now = Utc::now();
        let policy = IdentityPolicy::default();
        let mut record = KeyRecord::new("K", now, Duration::hours(1)).unwrap();

        let verdict = bind_or_match(Some(&mut record), &user("a"), &policy, now);
        assert_eq!(
            verdict,
            BindVerdict::Bound {
                first: true,
                expires_at: record.expires_at()
            }
        );
        assert_eq!(record.bound_identity(), Some(&user("a")));

        let verdict = bind_or_match(Some(&mut record), &user("a"), &policy, now);
        assert!(matches!(verdict, BindVerdict::Bound { first: false, .. }));

        let verdict = bind_or_match(Some(&mut record), &user("b"), &policy, now);
        assert_eq!(verdict, BindVerdict::Conflict);
        assert_eq!(record.bound_identity(), Some(&user("a")));
    }

    #[test]
    fn test_expired_record_is_not_bound() {
        let now = Utc::now();
        let mut record = KeyRecord::new("K", now, Duration::hours(1)).unwrap();

        let verdict = bind_or_match(
            Some(&mut record),
            &user("a"),
            &IdentityPolicy::default(),
            now + Duration::hours(1),
        );

        assert_eq!(verdict, BindVerdict::Expired);
        assert!(!record.is_bound());
    }

    #[tokio::test]
    async fn test_mock_repository_reports_collision() {
        let mut mock = MockKeyRepository::new();
        mock.expect_insert()
            .times(1)
            .returning(|_| Ok(InsertOutcome::Collision));

        let record = KeyRecord::new("K", Utc::now(), Duration::hours(1)).unwrap();
        let outcome = mock.insert(record).await.unwrap();
        assert_eq!(outcome, InsertOutcome::Collision);
    }
}
