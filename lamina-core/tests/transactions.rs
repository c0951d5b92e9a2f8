//! Transactional buffering against shared, fully decorated caches

use lamina_core::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn key(name: &str, id: i64) -> CacheKey {
    let mut key = CacheKey::new();
    key.update(name);
    key.update(id);
    key
}

fn users() -> SharedCache<String> {
    CacheBuilder::new("users").eviction(Eviction::Lru).size(100).build().unwrap()
}

#[test]
fn writes_are_invisible_until_commit() {
    let cache = users();
    let mut tx = TransactionalCacheManager::new();
    tx.put_object(&cache, key("user", 1), Arc::new("ada".to_string()));

    assert!(cache.get(&key("user", 1)).unwrap().is_none());
    tx.commit().unwrap();
    assert_eq!(cache.get(&key("user", 1)).unwrap().as_deref(), Some(&"ada".to_string()));
}

#[test]
fn rollback_leaves_shared_cache_as_it_was() {
    let cache = users();
    cache.put(key("user", 1), Arc::new("ada".to_string())).unwrap();

    let mut tx = TransactionalCacheManager::new();
    tx.get_object(&cache, &key("user", 2)).unwrap();
    tx.put_object(&cache, key("user", 1), Arc::new("grace".to_string()));
    tx.clear(&cache);
    tx.rollback();

    assert_eq!(cache.size(), 1);
    assert_eq!(cache.get(&key("user", 1)).unwrap().as_deref(), Some(&"ada".to_string()));
}

#[test]
fn observed_miss_removes_concurrent_write_on_commit() {
    let cache = users();
    let mut tx = TransactionalCacheManager::new();
    assert!(tx.get_object(&cache, &key("user", 1)).unwrap().is_none());

    let mut other = TransactionalCacheManager::new();
    other.put_object(&cache, key("user", 1), Arc::new("stale".to_string()));
    other.commit().unwrap();
    assert!(cache.get(&key("user", 1)).unwrap().is_some());

    tx.commit().unwrap();
    assert!(cache.get(&key("user", 1)).unwrap().is_none());
}

#[test]
fn concurrent_transactions_do_not_see_each_other() {
    let cache = users();
    let mut first = TransactionalCacheManager::new();
    let mut second = TransactionalCacheManager::new();

    first.put_object(&cache, key("user", 1), Arc::new("first".to_string()));
    assert!(second.get_object(&cache, &key("user", 1)).unwrap().is_none());

    first.commit().unwrap();
    second.rollback();
    assert_eq!(cache.get(&key("user", 1)).unwrap().as_deref(), Some(&"first".to_string()));
}

#[test]
fn one_unit_of_work_spans_several_caches() {
    let config: LaminaConfig = toml::from_str(
        "[caches.users]\neviction = \"fifo\"\nsize = 2\n\n[caches.orders]\nread_write = false\n",
    )
    .unwrap();
    let registry = CacheRegistry::<String>::from_config(&config).unwrap();
    let users = registry.get("users").unwrap();
    let orders = registry.get("orders").unwrap();

    let mut tx = TransactionalCacheManager::new();
    for i in 0..3 {
        tx.put_object(&users, key("user", i), Arc::new(format!("user-{}", i)));
    }
    tx.put_object(&orders, key("order", 9), Arc::new("order-9".to_string()));
    tx.commit().unwrap();

    // fifo capacity applies to the flushed writes in order
    assert_eq!(users.size(), 2);
    assert!(users.get(&key("user", 0)).unwrap().is_none());
    assert_eq!(orders.size(), 1);
}

#[test]
fn blocking_cache_lets_one_transaction_populate() {
    let cache: SharedCache<String> = CacheBuilder::new("reports")
        .blocking(true)
        .blocking_timeout(Some(Duration::from_secs(5)))
        .build()
        .unwrap();

    let mut populator = TransactionalCacheManager::new();
    assert!(populator.get_object(&cache, &key("report", 1)).unwrap().is_none());

    let reader = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            let mut tx = TransactionalCacheManager::new();
            let seen = tx.get_object(&cache, &key("report", 1)).unwrap();
            tx.commit().unwrap();
            seen
        })
    };

    thread::sleep(Duration::from_millis(50));
    populator.put_object(&cache, key("report", 1), Arc::new("computed".to_string()));
    populator.commit().unwrap();

    assert_eq!(reader.join().unwrap().as_deref(), Some(&"computed".to_string()));
}

#[test]
fn rollback_unblocks_waiting_transaction() {
    let cache: SharedCache<String> = CacheBuilder::new("reports")
        .blocking(true)
        .blocking_timeout(Some(Duration::from_secs(5)))
        .build()
        .unwrap();

    let mut abandoned = TransactionalCacheManager::new();
    assert!(abandoned.get_object(&cache, &key("report", 1)).unwrap().is_none());

    let reader = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            let mut tx = TransactionalCacheManager::new();
            let seen = tx.get_object(&cache, &key("report", 1)).unwrap();
            tx.rollback();
            seen
        })
    };

    thread::sleep(Duration::from_millis(50));
    abandoned.rollback();

    assert!(reader.join().unwrap().is_none());
}

#[test]
fn blocking_timeout_surfaces_to_the_waiting_transaction() {
    let cache: SharedCache<String> = CacheBuilder::new("reports")
        .blocking(true)
        .blocking_timeout(Some(Duration::from_millis(20)))
        .build()
        .unwrap();

    let mut holder = TransactionalCacheManager::new();
    holder.get_object(&cache, &key("report", 1)).unwrap();

    let waiter = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            let mut tx = TransactionalCacheManager::new();
            tx.get_object(&cache, &key("report", 1))
        })
    };
    let err = waiter.join().unwrap().unwrap_err();
    assert!(matches!(err, CacheError::LockTimeout { .. }));
    assert!(!err.is_configuration());

    holder.rollback();
}

#[test]
fn unit_of_work_reads_its_own_latched_key_again() {
    let cache: SharedCache<String> = CacheBuilder::new("reports")
        .blocking(true)
        .blocking_timeout(Some(Duration::from_millis(200)))
        .build()
        .unwrap();

    let mut tx = TransactionalCacheManager::new();
    assert!(tx.get_object(&cache, &key("report", 1)).unwrap().is_none());
    tx.put_object(&cache, key("report", 1), Arc::new("draft".to_string()));
    // pending writes are not visible to reads, so the second lookup misses too
    assert!(tx.get_object(&cache, &key("report", 1)).unwrap().is_none());
    tx.put_object(&cache, key("report", 1), Arc::new("final".to_string()));
    tx.commit().unwrap();

    let mut next = TransactionalCacheManager::new();
    let seen = next.get_object(&cache, &key("report", 1)).unwrap();
    assert_eq!(seen.as_deref(), Some(&"final".to_string()));
}

#[test]
fn committed_values_read_back_from_reclaimable_chains() {
    for eviction in [Eviction::Soft, Eviction::Weak] {
        for read_write in [true, false] {
            let cache: SharedCache<String> = CacheBuilder::new("sessions")
                .eviction(eviction)
                .read_write(read_write)
                .build()
                .unwrap();

            let mut tx = TransactionalCacheManager::new();
            tx.put_object(&cache, key("session", 1), Arc::new("token".to_string()));
            tx.commit().unwrap();

            let mut next = TransactionalCacheManager::new();
            let seen = next.get_object(&cache, &key("session", 1)).unwrap();
            assert_eq!(
                seen.as_deref(),
                Some(&"token".to_string()),
                "{} read_write={}",
                eviction,
                read_write
            );
            next.commit().unwrap();
            assert_eq!(cache.size(), 1, "{} read_write={}", eviction, read_write);
        }
    }
}
