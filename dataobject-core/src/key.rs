//! Identity generation and cache-key derivation.
//!
//! The cache key wire format is load-bearing: any persisted cache data keyed
//! by this format becomes unreadable if the format changes. Keep it bit-exact.

use uuid::Uuid;

/// Generate a new object identity.
///
/// A random UUIDv4 rendered in simple (un-hyphenated hex) format, matching
/// the format used in existing cache deployments. Assigned exactly once, at
/// object creation, never regenerated.
pub fn new_object_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Derive the cache key for an object of the given collection and identity.
///
/// Pure function of its inputs; usable without an object instance.
///
/// # Wire Format
///
/// `<collection>_uuid=<identity>`
pub fn cache_key(collection: &str, identity: &str) -> String {
    format!("{}_uuid={}", collection, identity)
}
