use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on players in one session.
pub const MAX_MEMBERS: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub id: String,
}

impl User {
    /// Creates a user with a fresh UUID v4 id.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Lifecycle of a session. Stored as its numeric code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(into = "u8", try_from = "u8")]
pub enum SessionState {
    /// Accepting members.
    #[default]
    Waiting,
    Playing,
    Ended,
}

impl From<SessionState> for u8 {
    fn from(state: SessionState) -> Self {
        match state {
            SessionState::Waiting => 0,
            SessionState::Playing => 1,
            SessionState::Ended => 2,
        }
    }
}

impl TryFrom<u8> for SessionState {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(SessionState::Waiting),
            1 => Ok(SessionState::Playing),
            2 => Ok(SessionState::Ended),
            other => Err(format!("unknown session state {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    #[serde(default)]
    pub app_data: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub members: Vec<User>,
    #[serde(default)]
    pub state: SessionState,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid state")]
    InvalidState,

    #[error("over capacity")]
    OverCapacity,
}
