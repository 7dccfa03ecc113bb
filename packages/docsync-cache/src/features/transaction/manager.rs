//! TransactionManager: scoped transactions over a store

use super::transaction::Transaction;
use crate::errors::CacheError;
use crate::features::store::CacheStore;

pub struct TransactionManager<'a> {
    store: &'a CacheStore,
}

impl<'a> TransactionManager<'a> {
    pub fn new(store: &'a CacheStore) -> Self {
        Self { store }
    }

    /// Start a transaction; commit it explicitly or let `Drop` roll it back
    pub fn begin(&self) -> Transaction<'a> {
        Transaction::begin(self.store)
    }

    /// Run `f` inside a transaction.
    ///
    /// `Ok` commits. `Err` rolls back and returns the closure's error unchanged.
    /// A failed commit has already rolled back and surfaces as
    /// `CacheError::TransactionRollback`.
    pub fn run<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'a>) -> Result<T, E>,
        E: From<CacheError>,
    {
        let mut tx = self.begin();
        match f(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if tx.is_active() {
                    if let Err(rollback_err) = tx.rollback() {
                        tracing::error!("Rollback after failed transaction body: {}", rollback_err);
                    }
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::errors::CacheResult;
    use crate::metrics::CacheMetrics;
    use crate::shared::CacheValue;
    use prometheus::Registry;

    fn store() -> CacheStore {
        CacheStore::new(
            &CacheConfig::default(),
            CacheMetrics::new(&Registry::new()).unwrap(),
        )
    }

    #[derive(Debug)]
    enum AppError {
        Cache(CacheError),
        Aborted,
    }

    impl From<CacheError> for AppError {
        fn from(e: CacheError) -> Self {
            AppError::Cache(e)
        }
    }

    #[test]
    fn test_run_commits_on_ok() {
        let store = store();
        let result: CacheResult<usize> = TransactionManager::new(&store).run(|tx| {
            tx.set("virtual-a", "1")?;
            tx.set("virtual-b", "2")?;
            Ok(2)
        });

        assert_eq!(result.unwrap(), 2);
        assert_eq!(store.peek("virtual-b"), Some(CacheValue::from("2")));
        assert!(store.metadata("virtual-a").is_some());
        assert_eq!(store.metrics().commits.get(), 1);
    }

    #[test]
    fn test_run_rolls_back_and_propagates_error() {
        let store = store();
        store.set("virtual-a", "before").unwrap();

        let result: Result<(), AppError> = TransactionManager::new(&store).run(|tx| {
            tx.set("virtual-a", "after")?;
            Err(AppError::Aborted)
        });

        assert!(matches!(result, Err(AppError::Aborted)));
        assert_eq!(store.peek("virtual-a"), Some(CacheValue::from("before")));
    }

    #[test]
    fn test_body_may_roll_back_explicitly() {
        let store = store();
        let result: Result<(), AppError> = TransactionManager::new(&store).run(|tx| {
            tx.set("virtual-a", "x")?;
            tx.rollback()?;
            Err(AppError::Aborted)
        });

        assert!(matches!(result, Err(AppError::Aborted)));
        assert!(!store.contains_key("virtual-a"));
        assert_eq!(store.metrics().rollbacks.get(), 1);
    }

    #[test]
    fn test_commit_after_explicit_rollback_reports_inactive() {
        let store = store();
        let result: Result<(), AppError> = TransactionManager::new(&store).run(|tx| {
            tx.rollback()?;
            Ok(())
        });

        assert!(matches!(
            result,
            Err(AppError::Cache(CacheError::TransactionInactive))
        ));
    }
}
