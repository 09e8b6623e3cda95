//! Data Object Core - Entity Model and Shared Contracts
//!
//! Pure data types with no driver logic: the data object entity (identity,
//! field state, metadata), error enums, cache-key derivation, and the
//! per-type configuration surface. The persistence coordinator and driver
//! contracts live in `dataobject-storage`.

pub mod config;
pub mod error;
pub mod key;
pub mod object;

pub use config::{ObjectType, TypeConfig};
pub use error::{CacheError, DataObjectError, DataObjectResult, StoreError};
pub use key::{cache_key, new_object_id};
pub use object::{
    DataObject, FieldMap, Metadata, Snapshot, CREATED_TS_METADATA, RECORD_EXISTS_METADATA,
    UPDATED_TS_METADATA, UUID_PROPERTY,
};
