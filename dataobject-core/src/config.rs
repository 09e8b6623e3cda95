//! Per-entity-type configuration

/// Shared interface implemented by concrete entity types.
///
/// Supplies the configuration surface the persistence layer needs: the
/// collection name (used verbatim in cache-key derivation and store calls)
/// and the default cache TTL, used when an operation omits an explicit TTL.
pub trait ObjectType {
    /// Collection/table name for this entity type.
    fn collection() -> &'static str;

    /// Default cache TTL in seconds.
    fn default_cache_ttl_secs() -> u64 {
        3600
    }
}

/// Resolved per-type configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeConfig {
    /// Collection/table name, used verbatim in cache keys and store calls.
    pub collection: String,
    /// Default cache TTL in seconds.
    pub default_cache_ttl_secs: u64,
}

impl TypeConfig {
    /// Create a config from explicit values.
    pub fn new(collection: impl Into<String>, default_cache_ttl_secs: u64) -> Self {
        Self {
            collection: collection.into(),
            default_cache_ttl_secs,
        }
    }

    /// Resolve the config for a concrete entity type.
    pub fn of<T: ObjectType>() -> Self {
        Self::new(T::collection(), T::default_cache_ttl_secs())
    }
}
