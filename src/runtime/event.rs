use serde::Deserialize;

use super::{Error, Result};
use crate::container::ContainerID;

/// What happened to a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Start,
    Die,
    /// Any other action, kept verbatim for logging.
    Other(String),
}

/// A container lifecycle notification from the runtime's event feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    kind: EventKind,
    container_id: ContainerID,
}

// Older engines only send `status`/`id`, newer ones add `Type`/`Action`/`Actor`.
#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "Type")]
    object_type: Option<String>,
    #[serde(rename = "Action")]
    action: Option<String>,
    status: Option<String>,
    id: Option<String>,
    #[serde(rename = "Actor")]
    actor: Option<RawActor>,
}

#[derive(Debug, Deserialize)]
struct RawActor {
    #[serde(rename = "ID")]
    id: Option<String>,
}

impl LifecycleEvent {
    /// Decodes a single JSON document from the event feed.
    ///
    /// Events for objects other than containers are reported as [`EventKind::Other`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Event`] for malformed JSON and [`Error::MissingEventID`] when the event
    /// does not name the object it is about.
    pub fn from_json(payload: &str) -> Result<Self> {
        let raw: RawEvent = serde_json::from_str(payload).map_err(Error::Event)?;
        let id = raw
            .id
            .or_else(|| raw.actor.and_then(|actor| actor.id))
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::MissingEventID(payload.to_owned()))?;
        let container_id = ContainerID::new(id).map_err(Error::InvalidEventID)?;

        let action = raw.action.or(raw.status).unwrap_or_default();
        let kind = match (raw.object_type.as_deref(), action.as_str()) {
            (Some(object_type), _) if object_type != "container" => EventKind::Other(action),
            (_, "start") => EventKind::Start,
            (_, "die") => EventKind::Die,
            _ => EventKind::Other(action),
        };

        Ok(Self { kind, container_id })
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn container_id(&self) -> &ContainerID {
        &self.container_id
    }
}
