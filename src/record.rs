//! Enrichment of raw stat payloads with container and host identity.
//!
//! A published record is the runtime's stat document with four extra fields:
//!
//! - `container_name` — name of the container, without the leading `/`.
//! - `container_id` — id of the container.
//! - `source` — hostname of the host the record was collected on.
//! - `ncpu` — CPU count of that host.
use serde_json::{Map, Value};

use crate::container::ContainerIdentity;
use crate::host::HostIdentity;

pub const CONTAINER_NAME_FIELD: &str = "container_name";
pub const CONTAINER_ID_FIELD: &str = "container_id";
pub const SOURCE_FIELD: &str = "source";
pub const NCPU_FIELD: &str = "ncpu";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to decode stat payload: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("stat payload is not a JSON object")]
    NotAnObject,
    #[error("failed to encode stat record: {0}")]
    Encode(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A raw stat document tagged with its container and host.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct StatRecord(Map<String, Value>);

impl StatRecord {
    /// Decodes `raw` and attaches the identity fields, overwriting same-named raw fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if `raw` is not valid JSON and [`Error::NotAnObject`] if it is
    /// valid JSON but not an object.
    pub fn enrich(raw: &str, container: &ContainerIdentity, host: &HostIdentity) -> Result<Self> {
        let mut fields = match serde_json::from_str::<Value>(raw).map_err(Error::Decode)? {
            Value::Object(fields) => fields,
            _ => return Err(Error::NotAnObject),
        };
        fields.insert(
            CONTAINER_NAME_FIELD.to_owned(),
            Value::from(container.name()),
        );
        fields.insert(
            CONTAINER_ID_FIELD.to_owned(),
            Value::from(container.id().as_str()),
        );
        fields.insert(SOURCE_FIELD.to_owned(), Value::from(host.hostname()));
        fields.insert(NCPU_FIELD.to_owned(), Value::from(host.ncpu()));

        Ok(Self(fields))
    }

    #[cfg(test)]
    fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    #[cfg(test)]
    fn container_id(&self) -> Option<&str> {
        self.0.get(CONTAINER_ID_FIELD).and_then(Value::as_str)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::Encode)
    }
}
