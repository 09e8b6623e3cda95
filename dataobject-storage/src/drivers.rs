//! Driver contracts for the two pluggable backends.
//!
//! Both drivers are external collaborators. The repository owns only the
//! coherence/sequencing contract between them; backend faults raised here
//! propagate to the caller unchanged. All operations are synchronous,
//! blocking calls; timeouts are a property the underlying drivers may or may
//! not provide.

use std::collections::HashMap;

use dataobject_core::{CacheError, FieldMap, StoreError};
use serde_json::Value;

/// Row identifier assigned by the store on insert.
pub type RowId = i64;

/// Record store contract: durable, queryable record operations against a
/// named collection.
///
/// Equality matching is the store's responsibility: a returned record matches
/// every field of the given filter. An empty filter constrains nothing. No
/// ordering is guaranteed beyond whatever the store returns.
pub trait StoreDriver: Send + Sync {
    /// Equality-filter lookup. `limit` bounds the result length when set.
    fn find_by_fields(
        &self,
        collection: &str,
        filter: &FieldMap,
        limit: Option<usize>,
    ) -> Result<Vec<FieldMap>, StoreError>;

    /// Insert a record. Returns the new row identifier, or `None` as the
    /// failure sentinel when the store rejects the insert.
    fn insert(&self, collection: &str, fields: &FieldMap) -> Result<Option<RowId>, StoreError>;

    /// Update all records matching the filter with the given field values.
    /// Returns the count of rows affected.
    fn update_by_fields(
        &self,
        collection: &str,
        fields: &FieldMap,
        filter: &FieldMap,
    ) -> Result<u64, StoreError>;

    /// Delete all records matching the filter. Returns the count of rows
    /// affected.
    fn delete_by_fields(&self, collection: &str, filter: &FieldMap) -> Result<u64, StoreError>;

    /// Schema introspection: the field names of a collection.
    fn field_names(&self, collection: &str) -> Result<Vec<String>, StoreError>;
}

/// Cache contract: fast, ephemeral, TTL-bound key/value operations.
///
/// TTL expiry is entirely delegated to the backend's own clock and eviction
/// mechanism; callers only ever set TTL values at write time.
pub trait CacheDriver: Send + Sync {
    /// Get a value, or `None` on miss.
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Set a value with a TTL in seconds.
    fn set(&self, key: &str, value: Value, ttl_secs: u64) -> Result<(), CacheError>;

    /// Delete a value.
    fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Batch get. Missing keys are omitted from the returned map.
    fn batch_get(&self, keys: &[String]) -> Result<HashMap<String, Value>, CacheError>;

    /// Batch set with a shared TTL in seconds.
    fn batch_set(&self, items: Vec<(String, Value)>, ttl_secs: u64) -> Result<(), CacheError>;

    /// Batch delete. Returns a success indicator.
    fn batch_delete(&self, keys: &[String]) -> Result<bool, CacheError>;
}
