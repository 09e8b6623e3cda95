//! Data Object Storage - Driver Contracts and Persistence Coordinator
//!
//! Defines the two backend contracts ([`StoreDriver`], [`CacheDriver`]),
//! in-memory mock drivers for testing, and the [`Repository`] coordinator
//! that sequences them: cache-first reads for identity lookups, store-only
//! reads for everything else, and write-through after mutating successes.

pub mod drivers;
pub mod mock;
pub mod repository;

pub use drivers::{CacheDriver, RowId, StoreDriver};
pub use mock::{MockCacheDriver, MockStoreDriver};
pub use repository::Repository;
