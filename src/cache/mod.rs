//! Extraction and scoring caches.
//!
//! Both caches share [`KeyedCache`]: an in-memory moka layer, an optional JSON
//! [`DiskStore`] (enabled by `ENABLE_CACHE`), and a per-key async lock so that at most one
//! producer runs per key.

pub mod error;
pub mod extraction;
pub mod keyed;
pub mod scoring;
pub mod store;


pub use error::{CacheError, CacheResult};
pub use extraction::ExtractionCache;
pub use keyed::{CacheStats, CacheStatus, KeyLocks, KeyedCache, Stored};
pub use scoring::ScoringCache;
pub use store::DiskStore;
