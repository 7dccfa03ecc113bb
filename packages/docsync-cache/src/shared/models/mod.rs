//! Data model of the cache

mod content_hash;
mod metadata;
mod value;

pub use content_hash::ContentHash;
pub use metadata::{EntryMetadata, EntrySnapshot};
pub use value::CacheValue;
