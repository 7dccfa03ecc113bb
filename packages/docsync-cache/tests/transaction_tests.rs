//! Transaction atomicity and isolation through the public facade

mod common;

use common::*;
use docsync_cache::{CacheError, CacheResult, CacheValue, EntryMetadata, IntegrityCache};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

type Snapshot = BTreeMap<String, (CacheValue, Option<EntryMetadata>)>;

fn snapshot(cache: &IntegrityCache) -> Snapshot {
    cache
        .keys()
        .into_iter()
        .map(|key| {
            let value = cache.get_with_sync(&key, false).expect("listed key has a value");
            let metadata = cache.metadata(&key);
            (key, (value, metadata))
        })
        .collect()
}

#[test]
fn test_error_inside_transaction_restores_previous_values() {
    let tree = DocTree::new();
    let a = tree.write("a.md", "a0");
    let b = tree.write("b.md", "b0");

    let cache = new_cache();
    cache.set(&a, "a0").unwrap();
    cache.set(&b, "b0").unwrap();
    let before = snapshot(&cache);

    let result: CacheResult<()> = cache.transaction(|tx| {
        tx.set(a.as_str(), "a1")?;
        tx.set(b.as_str(), "b1")?;
        Err(CacheError::watcher("abort"))
    });

    assert!(matches!(result, Err(CacheError::Watcher(_))));
    assert_eq!(snapshot(&cache), before);
    assert!(cache.is_synchronized(&a));
}

#[test]
fn test_rollback_removes_keys_that_did_not_exist() {
    let tree = DocTree::new();
    let key = tree.write("fresh.md", "content");

    let cache = new_cache();
    let result: CacheResult<()> = cache.transaction(|tx| {
        tx.set(key.as_str(), "content")?;
        assert_eq!(tx.get(&key)?, Some(CacheValue::from("content")));
        Err(CacheError::watcher("abort"))
    });

    assert!(result.is_err());
    assert!(!cache.contains_key(&key));
    assert!(cache.metadata(&key).is_none());
}

#[test]
fn test_commit_refreshes_metadata_for_every_key() {
    let tree = DocTree::new();
    let a = tree.write("a.md", "A");
    let b = tree.write("b.md", "B");

    let cache = new_cache();
    cache
        .transaction(|tx| -> CacheResult<()> {
            tx.set(a.as_str(), "A")?;
            tx.set(b.as_str(), "B")?;
            tx.set(a.as_str(), "A")
        })
        .unwrap();

    for key in [&a, &b] {
        let meta = cache.metadata(key).unwrap();
        assert!(meta.synchronized);
        assert!(meta.content_hash.is_some());
        assert!(cache.is_synchronized(key));
    }
}

#[test]
fn test_failed_commit_restores_every_key() {
    let tree = DocTree::new();
    let doc = tree.write("doc.md", "on disk");

    let cache = new_cache();
    cache.set("virtual-keep", "before").unwrap();
    cache.set(&doc, "on disk").unwrap();
    let before = snapshot(&cache);

    // A component longer than NAME_MAX cannot be stat'ed, so capturing its
    // metadata at commit fails
    let unstatable = tree.key(&"x".repeat(300));

    let result: CacheResult<()> = cache.transaction(|tx| {
        tx.set("virtual-keep", "during")?;
        tx.set(doc.as_str(), "edited")?;
        tx.set(unstatable.as_str(), "never committed")
    });

    assert!(matches!(result, Err(CacheError::TransactionRollback(_))));
    assert_eq!(snapshot(&cache), before);
    assert!(!cache.contains_key(&unstatable));
    assert_eq!(cache.metrics().rollbacks.get(), 1);
    assert_eq!(cache.metrics().commits.get(), 0);
}

#[test]
fn test_panic_inside_transaction_rolls_back() {
    let cache = new_cache();
    cache.set("virtual-doc", "before").unwrap();

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _: CacheResult<()> = cache.transaction(|tx| {
            tx.set("virtual-doc", "during")?;
            panic!("bug in transaction body");
        });
    }));

    assert!(outcome.is_err());
    assert_eq!(
        cache.get_with_sync("virtual-doc", false),
        Some(CacheValue::from("before"))
    );
}

#[test]
fn test_explicit_transaction_is_isolated_until_commit() {
    let cache = new_cache();
    cache.set("virtual-doc", "v1").unwrap();

    let mut tx = cache.begin_transaction();
    tx.set("virtual-doc", "v2").unwrap();

    let observed = thread::scope(|scope| {
        let reader = scope.spawn(|| cache.get_with_sync("virtual-doc", false));

        // The reader blocks on the store lock held by the transaction
        thread::sleep(Duration::from_millis(50));
        assert!(!reader.is_finished());

        tx.commit().unwrap();
        drop(tx);
        reader.join().unwrap()
    });

    assert_eq!(observed, Some(CacheValue::from("v2")));
}

#[test]
fn test_dropped_transaction_rolls_back() {
    let cache = new_cache();
    {
        let mut tx = cache.begin_transaction();
        tx.set("virtual-doc", "uncommitted").unwrap();
    }
    assert!(!cache.contains_key("virtual-doc"));
    assert_eq!(cache.metrics().rollbacks.get(), 1);
}

#[test]
fn test_inactive_transaction_rejects_use() {
    let cache = new_cache();
    let mut tx = cache.begin_transaction();
    tx.rollback().unwrap();

    assert!(matches!(tx.get("anything"), Err(CacheError::TransactionInactive)));
    assert!(matches!(
        tx.set("anything", "x"),
        Err(CacheError::TransactionInactive)
    ));
}

fn ops() -> impl Strategy<Value = Vec<(usize, String)>> {
    prop::collection::vec((0usize..6, "[a-z]{0,12}"), 0..12)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A failing body leaves the cache exactly as it was
    #[test]
    fn prop_failed_transaction_is_invisible(initial in ops(), writes in ops()) {
        let cache = new_cache();
        for (i, content) in &initial {
            cache.set(&format!("virtual-{i}"), content.as_str()).unwrap();
        }
        let before = snapshot(&cache);

        let result: CacheResult<()> = cache.transaction(|tx| {
            for (i, content) in &writes {
                tx.set(format!("virtual-{i}"), content.as_str())?;
            }
            Err(CacheError::watcher("abort"))
        });

        prop_assert!(result.is_err());
        prop_assert_eq!(snapshot(&cache), before);
    }

    /// A successful body applies every write, last one winning
    #[test]
    fn prop_committed_transaction_applies_all(initial in ops(), writes in ops()) {
        let cache = new_cache();
        for (i, content) in &initial {
            cache.set(&format!("virtual-{i}"), content.as_str()).unwrap();
        }

        let mut expected: BTreeMap<String, CacheValue> = snapshot(&cache)
            .into_iter()
            .map(|(k, (v, _))| (k, v))
            .collect();
        for (i, content) in &writes {
            expected.insert(format!("virtual-{i}"), CacheValue::from(content.as_str()));
        }

        cache
            .transaction(|tx| -> CacheResult<()> {
                for (i, content) in &writes {
                    tx.set(format!("virtual-{i}"), content.as_str())?;
                }
                Ok(())
            })
            .unwrap();

        let actual: BTreeMap<String, CacheValue> = snapshot(&cache)
            .into_iter()
            .map(|(k, (v, _))| (k, v))
            .collect();
        prop_assert_eq!(actual, expected);
        for key in cache.keys() {
            prop_assert!(cache.metadata(&key).is_some());
        }
    }
}
