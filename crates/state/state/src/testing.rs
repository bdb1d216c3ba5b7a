use std::time::Duration;

use crate::error::StateError;
use crate::key::{KeyKind, StateKey};
use crate::store::CounterStore;

fn test_key(kind: KeyKind, id: &str) -> StateKey {
    StateKey::new("test-ns", kind, id)
}

/// Run the full counter store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance.
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_store_conformance_tests(store: &dyn CounterStore) -> Result<(), StateError> {
    test_get_missing(store).await?;
    test_set_and_get(store).await?;
    test_delete(store).await?;
    test_increment(store).await?;
    test_decrement(store).await?;
    test_get_count(store).await?;
    test_ttl_set(store).await?;
    test_increment_keeps_first_ttl(store).await?;
    test_set_resets_ttl(store).await?;
    Ok(())
}

async fn test_get_missing(store: &dyn CounterStore) -> Result<(), StateError> {
    let key = test_key(KeyKind::Custom("state".into()), "missing");
    let val = store.get(&key).await?;
    assert!(val.is_none(), "get on missing key should return None");
    assert!(store.ttl_remaining(&key).await?.is_none());
    Ok(())
}

async fn test_set_and_get(store: &dyn CounterStore) -> Result<(), StateError> {
    let key = test_key(KeyKind::Block, "set-get");
    store.set(&key, "hello", None).await?;
    let val = store.get(&key).await?;
    assert_eq!(val.as_deref(), Some("hello"));
    Ok(())
}

async fn test_delete(store: &dyn CounterStore) -> Result<(), StateError> {
    let key = test_key(KeyKind::Block, "to-delete");
    store.set(&key, "bye", None).await?;
    let existed = store.delete(&key).await?;
    assert!(existed, "delete should return true for existing key");
    let val = store.get(&key).await?;
    assert!(val.is_none(), "get after delete should return None");

    let existed = store.delete(&key).await?;
    assert!(!existed, "delete on missing key should return false");
    Ok(())
}

async fn test_increment(store: &dyn CounterStore) -> Result<(), StateError> {
    let key = test_key(KeyKind::RateLimit, "counter-1");
    let val = store.increment(&key, 1, None).await?;
    assert_eq!(val, 1, "first increment from zero should yield 1");

    let val = store.increment(&key, 5, None).await?;
    assert_eq!(val, 6, "second increment should accumulate");

    let val = store.increment(&key, -2, None).await?;
    assert_eq!(val, 4, "negative delta should decrement");
    Ok(())
}

async fn test_decrement(store: &dyn CounterStore) -> Result<(), StateError> {
    let missing = test_key(KeyKind::RateLimit, "decrement-missing");
    assert_eq!(store.decrement(&missing, 1).await?, 0);
    assert!(
        store.get(&missing).await?.is_none(),
        "decrement must not create a counter"
    );

    let key = test_key(KeyKind::RateLimit, "decrement-live");
    store
        .increment(&key, 3, Some(Duration::from_secs(60)))
        .await?;
    assert_eq!(store.decrement(&key, 1).await?, 2);
    assert_eq!(store.decrement(&key, 5).await?, 0, "floor is zero");
    assert!(store.ttl_remaining(&key).await?.is_some());
    Ok(())
}

async fn test_get_count(store: &dyn CounterStore) -> Result<(), StateError> {
    let key = test_key(KeyKind::RateLimit, "count-missing");
    assert_eq!(store.get_count(&key).await?, 0);
    store.increment(&key, 3, None).await?;
    assert_eq!(store.get_count(&key).await?, 3);
    Ok(())
}

async fn test_ttl_set(store: &dyn CounterStore) -> Result<(), StateError> {
    let key = test_key(KeyKind::LastSend, "ttl-test");
    store
        .set(&key, "ephemeral", Some(Duration::from_secs(3600)))
        .await?;
    let val = store.get(&key).await?;
    assert_eq!(val.as_deref(), Some("ephemeral"));
    let remaining = store
        .ttl_remaining(&key)
        .await?
        .expect("entry with ttl should report remaining time");
    assert!(remaining <= Duration::from_secs(3600));
    assert!(remaining > Duration::from_secs(3500));
    Ok(())
}

async fn test_increment_keeps_first_ttl(store: &dyn CounterStore) -> Result<(), StateError> {
    let key = test_key(KeyKind::RateLimit, "ttl-fixed");
    store
        .increment(&key, 1, Some(Duration::from_secs(60)))
        .await?;
    store
        .increment(&key, 1, Some(Duration::from_secs(7200)))
        .await?;
    let remaining = store
        .ttl_remaining(&key)
        .await?
        .expect("counter should keep its first ttl");
    assert!(
        remaining <= Duration::from_secs(60),
        "later increments must not extend the ttl"
    );
    Ok(())
}

async fn test_set_resets_ttl(store: &dyn CounterStore) -> Result<(), StateError> {
    let key = test_key(KeyKind::RateLimit, "ttl-reset");
    store
        .increment(&key, 1, Some(Duration::from_secs(60)))
        .await?;
    store
        .set(&key, "9", Some(Duration::from_secs(7200)))
        .await?;
    let remaining = store.ttl_remaining(&key).await?.expect("ttl after set");
    assert!(remaining > Duration::from_secs(60));
    assert_eq!(store.get_count(&key).await?, 9);
    Ok(())
}
