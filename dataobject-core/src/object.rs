//! The data object entity: identity, field state, and metadata.
//!
//! A `DataObject` is the in-memory representation of one record. Field values
//! are untyped at this layer (`serde_json::Value`); no schema is enforced
//! here. Values pass through as given by the caller or the store driver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DataObjectError, DataObjectResult};
use crate::key::new_object_id;

/// Untyped field-value mapping. BTree-backed by default, which gives the
/// stable-sorted pretty JSON rendering without extra work.
pub type FieldMap = serde_json::Map<String, Value>;

/// Reserved state key holding the object identity.
pub const UUID_PROPERTY: &str = "uuid";

/// Recognized metadata field names.
pub const RECORD_EXISTS_METADATA: &str = "record_exists";
pub const CREATED_TS_METADATA: &str = "created_ts";
pub const UPDATED_TS_METADATA: &str = "updated_ts";

/// Bookkeeping fields kept separate from business data.
///
/// Exactly three recognized fields. Unknown metadata keys supplied at
/// construction (e.g. in a cached payload) are silently dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Whether the store currently holds a row for this identity.
    #[serde(default)]
    pub record_exists: bool,
    /// Creation timestamp, when known.
    #[serde(default)]
    pub created_ts: Option<DateTime<Utc>>,
    /// Last-update timestamp, when known.
    #[serde(default)]
    pub updated_ts: Option<DateTime<Utc>>,
}

/// The persisted/cached representation: exactly two top-level fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The field map, including the identity.
    pub state: FieldMap,
    /// The three recognized metadata fields.
    pub metadata: Metadata,
}

/// In-memory representation of one record.
#[derive(Debug, Clone, PartialEq)]
pub struct DataObject {
    state: FieldMap,
    metadata: Metadata,
}

impl DataObject {
    /// Create a fresh data object. NOTE: does not write to the store.
    ///
    /// Generates a new identity and inserts it into the field map under the
    /// reserved [`UUID_PROPERTY`] key. `record_exists` starts false, with no
    /// timestamps. Always succeeds.
    pub fn create(mut fields: FieldMap) -> Self {
        fields.insert(UUID_PROPERTY.to_string(), Value::String(new_object_id()));
        Self {
            state: fields,
            metadata: Metadata::default(),
        }
    }

    /// Hydrate a data object from a raw store record.
    ///
    /// `record_exists` is set true. `created_ts`/`updated_ts` columns, when
    /// present and parseable, are moved out of the field map into metadata;
    /// unparseable timestamp values are treated as absent.
    pub fn from_record(mut record: FieldMap) -> Self {
        let created_ts = take_timestamp(&mut record, CREATED_TS_METADATA);
        let updated_ts = take_timestamp(&mut record, UPDATED_TS_METADATA);
        Self {
            state: record,
            metadata: Metadata {
                record_exists: true,
                created_ts,
                updated_ts,
            },
        }
    }

    /// Hydrate a data object from a cached snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: snapshot.state,
            metadata: snapshot.metadata,
        }
    }

    /// The object identity, if the reserved key is present in state.
    pub fn identity(&self) -> Option<&str> {
        self.state.get(UUID_PROPERTY).and_then(Value::as_str)
    }

    /// Read-only view of the field state.
    pub fn state(&self) -> &FieldMap {
        &self.state
    }

    /// Read-only view of the metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Property getter. Reading an unknown field is a hard failure.
    pub fn get_prop(&self, name: &str) -> DataObjectResult<&Value> {
        self.state
            .get(name)
            .ok_or_else(|| DataObjectError::PropertyNotFound {
                name: name.to_string(),
            })
    }

    /// Property setter, operating on existing keys only.
    ///
    /// Returns true and mutates in place when the key exists; returns false
    /// and leaves state unchanged otherwise. Never raises.
    pub fn set_prop(&mut self, name: &str, value: Value) -> bool {
        match self.state.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// The object's state and metadata as a cacheable snapshot.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// The snapshot rendered as a JSON string.
    ///
    /// `pretty` selects indented rendering with stable-sorted keys at every
    /// level; otherwise the compact form is returned.
    pub fn to_json(&self, pretty: bool) -> DataObjectResult<String> {
        let snapshot = self.snapshot();
        let rendered = if pretty {
            // Going through Value sorts the top-level keys as well.
            serde_json::to_value(&snapshot).and_then(|v| serde_json::to_string_pretty(&v))
        } else {
            serde_json::to_string(&snapshot)
        };
        rendered.map_err(|e| DataObjectError::Serialization {
            reason: e.to_string(),
        })
    }
}

/// Pull a timestamp column out of a raw record, if present and parseable.
fn take_timestamp(record: &mut FieldMap, field: &str) -> Option<DateTime<Utc>> {
    record
        .remove(field)
        .and_then(|value| serde_json::from_value(value).ok())
}

// =============================================================================
// TESTS
// =============================================================================
