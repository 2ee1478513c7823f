use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

mod error;

pub use error::{Error, Result};

/// Engine ids are 64 hex characters; anything far beyond that is not an id.
const MAX_ID_LEN: usize = 255;

/// Id of a container as reported by the runtime, full or abbreviated.
///
/// Cheap to clone: collector tasks, the registry and log lines all share one allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerID(Arc<str>);

impl ContainerID {
    /// # Errors
    ///
    /// Returns [`Error::EmptyContainerID`] for an empty id and [`Error::InvalidContainerID`]
    /// for one longer than 255 bytes.
    ///
    /// ```
    /// # use statsquid::container::{ContainerID, Error};
    /// assert_eq!(ContainerID::new("3f4a9c").unwrap().to_string(), "3f4a9c");
    /// assert!(matches!(ContainerID::new(""), Err(Error::EmptyContainerID)));
    /// ```
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        match raw.as_ref() {
            "" => Err(Error::EmptyContainerID),
            raw if raw.len() > MAX_ID_LEN => Err(Error::InvalidContainerID(raw.to_owned())),
            raw => Ok(Self(Arc::from(raw))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Lets maps keyed by `ContainerID` be queried with a plain `&str`.
impl Borrow<str> for ContainerID {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a container as resolved once by an inspection call.
///
/// The name is never re-resolved for the lifetime of the collector that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerIdentity {
    id: ContainerID,
    name: String,
}

impl ContainerIdentity {
    /// Builds an identity, stripping the leading `/` the runtime puts in front of names.
    pub fn new(id: ContainerID, name: impl AsRef<str>) -> Self {
        Self {
            id,
            name: name.as_ref().trim_start_matches('/').to_owned(),
        }
    }

    pub fn id(&self) -> &ContainerID {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
