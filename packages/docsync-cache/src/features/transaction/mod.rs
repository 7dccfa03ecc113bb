//! Transactions - all-or-nothing batches of writes with rollback

mod manager;
mod transaction;

pub use manager::TransactionManager;
pub use transaction::Transaction;
