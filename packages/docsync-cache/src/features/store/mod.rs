//! Cache store - owns the value and metadata maps

mod state;
mod store;

pub use state::StoreState;
pub use store::CacheStore;
pub(crate) use store::StateGuard;
