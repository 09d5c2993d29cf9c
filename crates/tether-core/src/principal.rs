use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::Display;

/// Identifier of an authenticated principal that can own links.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(SmolStr);

impl OwnerId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The caller on whose behalf an operation runs.
///
/// Authentication happens outside the engine; callers pass the result
/// explicitly to every operation that needs it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Principal {
    #[default]
    Anonymous,
    User(OwnerId),
}

impl Principal {
    pub fn user(id: impl AsRef<str>) -> Self {
        Principal::User(OwnerId::new(id))
    }

    /// Returns the owner identity, or `None` for anonymous callers.
    pub fn owner(&self) -> Option<&OwnerId> {
        match self {
            Principal::Anonymous => None,
            Principal::User(id) => Some(id),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }
}

impl Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Principal::Anonymous => f.write_str("anonymous"),
            Principal::User(id) => write!(f, "user:{id}"),
        }
    }
}
