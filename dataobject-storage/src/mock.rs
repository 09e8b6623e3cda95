//! In-memory mock drivers for testing.
//!
//! Both mocks count their calls so tests can observe which backend served a
//! read (cache-bypass and cache-fill properties are assertions on these
//! counters). Handles are cheaply cloneable; clones share state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use dataobject_core::{CacheError, FieldMap, StoreError};
use serde_json::Value;

use crate::drivers::{CacheDriver, RowId, StoreDriver};

// ============================================================================
// MOCK STORE DRIVER
// ============================================================================

/// In-memory mock record store.
#[derive(Debug, Default, Clone)]
pub struct MockStoreDriver {
    inner: Arc<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    collections: RwLock<HashMap<String, Vec<FieldMap>>>,
    next_row_id: AtomicI64,
    insert_fails: AtomicBool,
    find_calls: AtomicU64,
    insert_calls: AtomicU64,
    update_calls: AtomicU64,
    delete_calls: AtomicU64,
    field_names_calls: AtomicU64,
}

impl MockStoreDriver {
    /// Create a new empty mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw record directly, bypassing the insert path.
    pub fn seed_row(&self, collection: &str, row: FieldMap) {
        let mut collections = self.inner.collections.write().unwrap();
        collections.entry(collection.to_string()).or_default().push(row);
    }

    /// Make subsequent inserts return the failure sentinel.
    pub fn set_insert_fails(&self, fails: bool) {
        self.inner.insert_fails.store(fails, Ordering::SeqCst);
    }

    /// Count of rows currently held for a collection.
    pub fn row_count(&self, collection: &str) -> usize {
        let collections = self.inner.collections.read().unwrap();
        collections.get(collection).map_or(0, Vec::len)
    }

    /// Number of `find_by_fields` calls observed.
    pub fn find_calls(&self) -> u64 {
        self.inner.find_calls.load(Ordering::SeqCst)
    }

    /// Number of `insert` calls observed.
    pub fn insert_calls(&self) -> u64 {
        self.inner.insert_calls.load(Ordering::SeqCst)
    }

    /// Number of `update_by_fields` calls observed.
    pub fn update_calls(&self) -> u64 {
        self.inner.update_calls.load(Ordering::SeqCst)
    }

    /// Number of `delete_by_fields` calls observed.
    pub fn delete_calls(&self) -> u64 {
        self.inner.delete_calls.load(Ordering::SeqCst)
    }

    /// Number of `field_names` calls observed.
    pub fn field_names_calls(&self) -> u64 {
        self.inner.field_names_calls.load(Ordering::SeqCst)
    }
}

fn row_matches(row: &FieldMap, filter: &FieldMap) -> bool {
    filter.iter().all(|(field, value)| row.get(field) == Some(value))
}

impl StoreDriver for MockStoreDriver {
    fn find_by_fields(
        &self,
        collection: &str,
        filter: &FieldMap,
        limit: Option<usize>,
    ) -> Result<Vec<FieldMap>, StoreError> {
        self.inner.find_calls.fetch_add(1, Ordering::SeqCst);
        let collections = self.inner.collections.read().unwrap();
        let mut matched: Vec<FieldMap> = collections
            .get(collection)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row_matches(row, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if let Some(limit) = limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    fn insert(&self, collection: &str, fields: &FieldMap) -> Result<Option<RowId>, StoreError> {
        self.inner.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.insert_fails.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let row_id = self.inner.next_row_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut row = fields.clone();
        row.insert("id".to_string(), Value::from(row_id));
        let mut collections = self.inner.collections.write().unwrap();
        collections.entry(collection.to_string()).or_default().push(row);
        Ok(Some(row_id))
    }

    fn update_by_fields(
        &self,
        collection: &str,
        fields: &FieldMap,
        filter: &FieldMap,
    ) -> Result<u64, StoreError> {
        self.inner.update_calls.fetch_add(1, Ordering::SeqCst);
        let mut collections = self.inner.collections.write().unwrap();
        let rows = match collections.get_mut(collection) {
            Some(rows) => rows,
            None => return Ok(0),
        };
        let mut affected = 0;
        for row in rows.iter_mut() {
            if row_matches(row, filter) {
                for (field, value) in fields {
                    row.insert(field.clone(), value.clone());
                }
                affected += 1;
            }
        }
        Ok(affected)
    }

    fn delete_by_fields(&self, collection: &str, filter: &FieldMap) -> Result<u64, StoreError> {
        self.inner.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut collections = self.inner.collections.write().unwrap();
        let rows = match collections.get_mut(collection) {
            Some(rows) => rows,
            None => return Ok(0),
        };
        let before = rows.len();
        rows.retain(|row| !row_matches(row, filter));
        Ok((before - rows.len()) as u64)
    }

    fn field_names(&self, collection: &str) -> Result<Vec<String>, StoreError> {
        self.inner.field_names_calls.fetch_add(1, Ordering::SeqCst);
        let collections = self.inner.collections.read().unwrap();
        let rows = collections
            .get(collection)
            .ok_or_else(|| StoreError::UnknownCollection {
                collection: collection.to_string(),
            })?;
        let mut names: Vec<String> = rows
            .iter()
            .flat_map(|row| row.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}

// ============================================================================
// MOCK CACHE DRIVER
// ============================================================================

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

/// In-memory mock key/value cache with TTL expiry.
#[derive(Debug, Default, Clone)]
pub struct MockCacheDriver {
    inner: Arc<CacheInner>,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: RwLock<HashMap<String, CacheEntry>>,
    get_calls: AtomicU64,
    set_calls: AtomicU64,
    delete_calls: AtomicU64,
    batch_get_calls: AtomicU64,
    batch_set_calls: AtomicU64,
    batch_delete_calls: AtomicU64,
}

impl MockCacheDriver {
    /// Create a new empty mock cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an unexpired entry exists for the key. Does not count as a get.
    pub fn contains(&self, key: &str) -> bool {
        let entries = self.inner.entries.read().unwrap();
        entries
            .get(key)
            .map_or(false, |entry| Instant::now() < entry.expires_at)
    }

    /// Number of entries currently held, expired or not.
    pub fn entry_count(&self) -> usize {
        self.inner.entries.read().unwrap().len()
    }

    /// Number of `get` calls observed.
    pub fn get_calls(&self) -> u64 {
        self.inner.get_calls.load(Ordering::SeqCst)
    }

    /// Number of `set` calls observed.
    pub fn set_calls(&self) -> u64 {
        self.inner.set_calls.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls observed.
    pub fn delete_calls(&self) -> u64 {
        self.inner.delete_calls.load(Ordering::SeqCst)
    }

    /// Number of `batch_get` calls observed.
    pub fn batch_get_calls(&self) -> u64 {
        self.inner.batch_get_calls.load(Ordering::SeqCst)
    }

    /// Number of `batch_set` calls observed.
    pub fn batch_set_calls(&self) -> u64 {
        self.inner.batch_set_calls.load(Ordering::SeqCst)
    }

    /// Number of `batch_delete` calls observed.
    pub fn batch_delete_calls(&self) -> u64 {
        self.inner.batch_delete_calls.load(Ordering::SeqCst)
    }

    fn read_live(&self, key: &str) -> Option<Value> {
        let mut entries = self.inner.entries.write().unwrap();
        match entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn write(&self, key: String, value: Value, ttl_secs: u64) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + Duration::from_secs(ttl_secs),
        };
        self.inner.entries.write().unwrap().insert(key, entry);
    }
}

impl CacheDriver for MockCacheDriver {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        self.inner.get_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.read_live(key))
    }

    fn set(&self, key: &str, value: Value, ttl_secs: u64) -> Result<(), CacheError> {
        self.inner.set_calls.fetch_add(1, Ordering::SeqCst);
        self.write(key.to_string(), value, ttl_secs);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.inner.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.entries.write().unwrap().remove(key);
        Ok(())
    }

    fn batch_get(&self, keys: &[String]) -> Result<HashMap<String, Value>, CacheError> {
        self.inner.batch_get_calls.fetch_add(1, Ordering::SeqCst);
        let mut found = HashMap::new();
        for key in keys {
            if let Some(value) = self.read_live(key) {
                found.insert(key.clone(), value);
            }
        }
        Ok(found)
    }

    fn batch_set(&self, items: Vec<(String, Value)>, ttl_secs: u64) -> Result<(), CacheError> {
        self.inner.batch_set_calls.fetch_add(1, Ordering::SeqCst);
        for (key, value) in items {
            self.write(key, value, ttl_secs);
        }
        Ok(())
    }

    fn batch_delete(&self, keys: &[String]) -> Result<bool, CacheError> {
        self.inner.batch_delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut entries = self.inner.entries.write().unwrap();
        for key in keys {
            entries.remove(key);
        }
        Ok(true)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, Value)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_store_find_by_fields_equality_match() {
        let store = MockStoreDriver::new();
        store.seed_row("users", fields(&[("name", json!("a")), ("age", json!(30))]));
        store.seed_row("users", fields(&[("name", json!("b")), ("age", json!(30))]));

        let matched = store
            .find_by_fields("users", &fields(&[("age", json!(30))]), None)
            .unwrap();
        assert_eq!(matched.len(), 2);

        let matched = store
            .find_by_fields("users", &fields(&[("name", json!("a")), ("age", json!(30))]), None)
            .unwrap();
        assert_eq!(matched.len(), 1);
    }

    #[test]
    fn test_store_empty_filter_matches_all() {
        let store = MockStoreDriver::new();
        store.seed_row("users", fields(&[("name", json!("a"))]));
        store.seed_row("users", fields(&[("name", json!("b"))]));

        let matched = store.find_by_fields("users", &FieldMap::new(), None).unwrap();
        assert_eq!(matched.len(), 2);
    }

    #[test]
    fn test_store_find_respects_limit() {
        let store = MockStoreDriver::new();
        for i in 0..5 {
            store.seed_row("users", fields(&[("n", json!(i)), ("kind", json!("x"))]));
        }
        let matched = store
            .find_by_fields("users", &fields(&[("kind", json!("x"))]), Some(2))
            .unwrap();
        assert_eq!(matched.len(), 2);
    }

    #[test]
    fn test_store_insert_assigns_row_ids() {
        let store = MockStoreDriver::new();
        let first = store.insert("users", &fields(&[("name", json!("a"))])).unwrap();
        let second = store.insert("users", &fields(&[("name", json!("b"))])).unwrap();
        assert_eq!(first, Some(1));
        assert_eq!(second, Some(2));

        let row = store
            .find_by_fields("users", &fields(&[("id", json!(1))]), None)
            .unwrap();
        assert_eq!(row.len(), 1);
        assert_eq!(row[0].get("name"), Some(&json!("a")));
    }

    #[test]
    fn test_store_insert_failure_sentinel() {
        let store = MockStoreDriver::new();
        store.set_insert_fails(true);
        let result = store.insert("users", &FieldMap::new()).unwrap();
        assert_eq!(result, None);
        assert_eq!(store.row_count("users"), 0);
    }

    #[test]
    fn test_store_update_counts_affected() {
        let store = MockStoreDriver::new();
        store.seed_row("users", fields(&[("uuid", json!("u1")), ("name", json!("a"))]));
        store.seed_row("users", fields(&[("uuid", json!("u2")), ("name", json!("a"))]));

        let affected = store
            .update_by_fields(
                "users",
                &fields(&[("name", json!("z"))]),
                &fields(&[("uuid", json!("u1"))]),
            )
            .unwrap();
        assert_eq!(affected, 1);

        let affected = store
            .update_by_fields(
                "users",
                &fields(&[("name", json!("z"))]),
                &fields(&[("uuid", json!("missing"))]),
            )
            .unwrap();
        assert_eq!(affected, 0);
    }

    #[test]
    fn test_store_delete_counts_affected() {
        let store = MockStoreDriver::new();
        store.seed_row("users", fields(&[("uuid", json!("u1"))]));
        store.seed_row("users", fields(&[("uuid", json!("u1"))]));

        let affected = store
            .delete_by_fields("users", &fields(&[("uuid", json!("u1"))]))
            .unwrap();
        assert_eq!(affected, 2);
        assert_eq!(store.row_count("users"), 0);
    }

    #[test]
    fn test_store_field_names_sorted_union() {
        let store = MockStoreDriver::new();
        store.seed_row("users", fields(&[("uuid", json!("u1")), ("name", json!("a"))]));
        store.seed_row("users", fields(&[("uuid", json!("u2")), ("age", json!(3))]));

        let names = store.field_names("users").unwrap();
        assert_eq!(names, vec!["age", "name", "uuid"]);
    }

    #[test]
    fn test_store_field_names_unknown_collection() {
        let store = MockStoreDriver::new();
        let err = store.field_names("ghosts").unwrap_err();
        assert_eq!(
            err,
            StoreError::UnknownCollection {
                collection: "ghosts".to_string()
            }
        );
    }

    #[test]
    fn test_cache_set_get_delete() {
        let cache = MockCacheDriver::new();
        cache.set("k1", json!({"v": 1}), 60).unwrap();

        assert_eq!(cache.get("k1").unwrap(), Some(json!({"v": 1})));
        cache.delete("k1").unwrap();
        assert_eq!(cache.get("k1").unwrap(), None);
    }

    #[test]
    fn test_cache_expired_entry_is_miss() {
        let cache = MockCacheDriver::new();
        cache.set("k1", json!(1), 0).unwrap();
        assert_eq!(cache.get("k1").unwrap(), None);
    }

    #[test]
    fn test_cache_batch_get_omits_missing() {
        let cache = MockCacheDriver::new();
        cache.set("k1", json!(1), 60).unwrap();
        cache.set("k2", json!(2), 60).unwrap();

        let keys = vec!["k1".to_string(), "k2".to_string(), "k3".to_string()];
        let found = cache.batch_get(&keys).unwrap();
        assert_eq!(found.len(), 2);
        assert!(!found.contains_key("k3"));
    }

    #[test]
    fn test_cache_batch_set_and_delete() {
        let cache = MockCacheDriver::new();
        cache
            .batch_set(vec![("k1".to_string(), json!(1)), ("k2".to_string(), json!(2))], 60)
            .unwrap();
        assert!(cache.contains("k1"));
        assert!(cache.contains("k2"));

        let ok = cache
            .batch_delete(&["k1".to_string(), "k2".to_string()])
            .unwrap();
        assert!(ok);
        assert!(!cache.contains("k1"));
        assert!(!cache.contains("k2"));
    }

    #[test]
    fn test_store_call_counters() {
        let store = MockStoreDriver::new();
        store.seed_row("users", fields(&[("name", json!("a"))]));
        store.find_by_fields("users", &FieldMap::new(), None).unwrap();
        store.field_names("users").unwrap();
        store.field_names("users").unwrap();

        assert_eq!(store.find_calls(), 1);
        assert_eq!(store.field_names_calls(), 2);
        assert_eq!(store.insert_calls(), 0);
    }

    #[test]
    fn test_cache_call_counters() {
        let cache = MockCacheDriver::new();
        cache.set("k1", json!(1), 60).unwrap();
        cache.get("k1").unwrap();
        cache.get("k2").unwrap();

        assert_eq!(cache.set_calls(), 1);
        assert_eq!(cache.get_calls(), 2);
    }
}
