use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::future::join_all;

use keybind::domain::ManualClock;
use keybind::domain::access_key::{Identity, RejectReason};
use keybind::infrastructure::access_key::{
    AdminSecret, InMemoryKeyRepository, KeyService, KeyStore,
};

const SECRET: &str = "integration-secret";

fn service_with_clock() -> (KeyService, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let store = KeyStore::new(Arc::new(InMemoryKeyRepository::new())).with_clock(clock.clone());
    let service = KeyService::new(store, AdminSecret::new(SECRET).unwrap());

    (service, clock)
}

fn identity(userid: &str) -> Identity {
    Identity::new()
        .with_attribute("userid", userid)
        .with_attribute("placeid", "1818")
        .with_attribute("executor", "test-executor")
}

#[tokio::test]
async fn issued_keys_are_unique() {
    let (service, _) = service_with_clock();

    let issued = join_all((0..200).map(|_| service.issue_key(Some(SECRET), None))).await;

    let keys: HashSet<String> = issued.into_iter().map(|r| r.unwrap().key).collect();
    assert_eq!(keys.len(), 200);
    assert_eq!(service.store().count().await.unwrap(), 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_use_binds_exactly_one_identity() {
    let (service, _) = service_with_clock();
    let key = service.issue_key(Some(SECRET), None).await.unwrap().key;

    let tasks = (0..64).map(|i| {
        let service = service.clone();
        let key = key.clone();
        tokio::spawn(async move {
            let id = identity(&format!("user-{}", i));
            let outcome = service.validate_key(Some(&key), Some(&id)).await.unwrap();
            (id, outcome)
        })
    });

    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let winners: Vec<_> = results.iter().filter(|(_, o)| o.valid).collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].1.first_use, Some(true));

    for (_, outcome) in results.iter().filter(|(_, o)| !o.valid) {
        assert_eq!(outcome.reason, Some(RejectReason::Conflict));
    }

    // The winner keeps validating; its binding never moves
    let winner = winners[0].0.clone();
    let again = service.validate_key(Some(&key), Some(&winner)).await.unwrap();
    assert!(again.valid);
    assert_eq!(again.first_use, Some(false));

    let record = service.store().get(&key).await.unwrap().unwrap();
    assert_eq!(record.bound_identity(), Some(&winner));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_identity_racing_itself_always_succeeds() {
    let (service, _) = service_with_clock();
    let key = service.issue_key(Some(SECRET), None).await.unwrap().key;

    let tasks = (0..16).map(|_| {
        let service = service.clone();
        let key = key.clone();
        tokio::spawn(async move {
            service
                .validate_key(Some(&key), Some(&identity("same")))
                .await
                .unwrap()
        })
    });

    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert!(outcomes.iter().all(|o| o.valid));
    assert_eq!(
        outcomes.iter().filter(|o| o.first_use == Some(true)).count(),
        1
    );
}

#[tokio::test]
async fn expiry_is_permanent_and_purgeable() {
    let (service, clock) = service_with_clock();
    let bound = service.issue_key(Some(SECRET), Some(1.0)).await.unwrap().key;
    let unbound = service.issue_key(Some(SECRET), Some(1.0)).await.unwrap().key;
    let long_lived = service.issue_key(Some(SECRET), Some(48.0)).await.unwrap().key;

    let alice = identity("alice");
    assert!(service.validate_key(Some(&bound), Some(&alice)).await.unwrap().valid);

    clock.advance(Duration::hours(1));

    for key in [&bound, &unbound] {
        let outcome = service.validate_key(Some(key), Some(&alice)).await.unwrap();
        assert!(!outcome.valid);
        assert_eq!(outcome.reason, Some(RejectReason::Expired));
    }

    // Expired unbound keys cannot be claimed later either
    clock.advance(Duration::hours(2));
    let outcome = service
        .validate_key(Some(&unbound), Some(&identity("bob")))
        .await
        .unwrap();
    assert_eq!(outcome.reason, Some(RejectReason::Expired));

    assert_eq!(service.purge_expired().await.unwrap(), 2);
    assert_eq!(service.store().count().await.unwrap(), 1);

    let outcome = service.validate_key(Some(&bound), Some(&alice)).await.unwrap();
    assert_eq!(outcome.reason, Some(RejectReason::NotFound));

    assert!(
        service
            .validate_key(Some(&long_lived), Some(&alice))
            .await
            .unwrap()
            .valid
    );
}
