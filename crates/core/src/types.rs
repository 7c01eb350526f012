use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Identifier of a single processing run.
pub type JobId = uuid::Uuid;

/// Maximum accepted length of a client id, in characters.
pub const MAX_CLIENT_ID_LEN: usize = 256;

/// Client-supplied session key correlating an upload with its progress stream.
///
/// The value is opaque to the server. It is only checked to be non-empty,
/// bounded in length and free of control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientId(String);

impl ClientId {
    /// Validate and wrap a raw client id.
    pub fn parse(raw: impl Into<String>) -> Result<Self, CoreError> {
        let raw = raw.into();

        if raw.trim().is_empty() {
            return Err(CoreError::Validation("Client id must not be empty".into()));
        }
        if raw.chars().count() > MAX_CLIENT_ID_LEN {
            return Err(CoreError::Validation(format!(
                "Client id must be at most {MAX_CLIENT_ID_LEN} characters"
            )));
        }
        if raw.chars().any(char::is_control) {
            return Err(CoreError::Validation(
                "Client id must not contain control characters".into(),
            ));
        }

        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ClientId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ClientId> for String {
    fn from(id: ClientId) -> Self {
        id.0
    }
}
