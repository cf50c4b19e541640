//! Entity trait and wire mapping helpers.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::metadata::EntityMetadata;

/// A wire field map: remote field names to JSON values.
pub type FieldMap = serde_json::Map<String, Value>;

/// A typed in-memory representation of one remote object record.
///
/// Implementations serialize to/from the wire shape (remote field names),
/// typically via `#[serde(rename = "...")]` attributes matching the
/// declared metadata. An entity instance is owned by the context that
/// produced or registered it and must not be shared across contexts.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Shared metadata for this entity type, built once.
    fn metadata() -> &'static EntityMetadata;

    /// Remote identity, if the record has been persisted.
    fn record_id(&self) -> Option<&str>;

    /// Assign the remote identity (after a successful create).
    fn set_record_id(&mut self, id: String);
}

/// Serialize an entity into its wire field map.
pub(crate) fn to_field_map<T: Entity>(entity: &T) -> Result<FieldMap> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::invalid(format!(
            "{} did not serialize to an object",
            T::metadata().object_name()
        ))),
        Err(err) => Err(Error::Mapping {
            object: T::metadata().object_name(),
            source: err,
        }),
    }
}

/// Map one result row into an entity, dropping the row's `attributes`
/// envelope.
pub(crate) fn from_row<T: Entity>(row: &FieldMap) -> Result<T> {
    let mut map = row.clone();
    map.remove("attributes");
    serde_json::from_value(Value::Object(map)).map_err(|err| Error::Mapping {
        object: T::metadata().object_name(),
        source: err,
    })
}

/// Fields whose current value differs from the snapshot, excluding the
/// identity field. A field present in the snapshot but absent from the
/// current map counts as changed to null.
pub(crate) fn dirty_diff(
    meta: &EntityMetadata,
    current: &FieldMap,
    snapshot: &FieldMap,
) -> FieldMap {
    let id_name = meta.id_field().map(|f| f.remote_name);
    let mut diff = FieldMap::new();

    for (name, value) in current {
        if Some(name.as_str()) == id_name {
            continue;
        }
        if snapshot.get(name) != Some(value) {
            diff.insert(name.clone(), value.clone());
        }
    }

    for name in snapshot.keys() {
        if Some(name.as_str()) == id_name {
            continue;
        }
        if !current.contains_key(name) {
            diff.insert(name.clone(), Value::Null);
        }
    }

    diff
}

/// Create payload: every non-null field except the identity.
pub(crate) fn insert_payload(meta: &EntityMetadata, current: &FieldMap) -> FieldMap {
    let id_name = meta.id_field().map(|f| f.remote_name);
    current
        .iter()
        .filter(|(name, value)| Some(name.as_str()) != id_name && !value.is_null())
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
