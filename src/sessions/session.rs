use super::types::{MAX_MEMBERS, SessionData, SessionError, SessionState, User};
use crate::context::DataLayer;
use crate::dispatch::OpResult;
use crate::model::{Entity, Record};

use std::sync::Arc;

/// Type tag of session records; they live in the `Sessions` collection.
pub const SESSION_TYPE: &str = "session";

/// A game session backed by one record.
///
/// Clones share the same record, so a `load` through one clone is visible to
/// all of them.
#[derive(Clone)]
pub struct Session {
    record: Arc<Record<SessionData>>,
}

impl Session {
    /// A new, empty session in the `Waiting` state.
    pub fn new(key: &str) -> Self {
        Self::with_data(key, SessionData::default())
    }

    pub fn with_data(key: &str, data: SessionData) -> Self {
        Self {
            record: Record::shared(SESSION_TYPE, key, data),
        }
    }

    pub fn key(&self) -> &str {
        self.record.key()
    }

    pub fn entity(&self) -> Arc<dyn Entity> {
        self.record.clone()
    }

    pub fn data(&self) -> SessionData {
        self.record.snapshot()
    }

    pub fn state(&self) -> SessionState {
        self.record.payload().state
    }

    pub fn set_state(&self, state: SessionState) {
        self.record.update(|d| d.state = state);
    }

    pub fn app_data(&self) -> serde_json::Map<String, serde_json::Value> {
        self.record.payload().app_data.clone()
    }

    pub fn set_app_data(&self, app_data: serde_json::Map<String, serde_json::Value>) {
        self.record.update(|d| d.app_data = app_data);
    }

    pub fn members(&self) -> Vec<User> {
        self.record.payload().members.clone()
    }

    /// Adds a player. Only allowed while `Waiting` and below `MAX_MEMBERS`.
    pub fn add_member(&self, user: User) -> Result<(), SessionError> {
        self.record.update(|d| {
            if d.state != SessionState::Waiting {
                return Err(SessionError::InvalidState);
            }
            if d.members.len() >= MAX_MEMBERS {
                return Err(SessionError::OverCapacity);
            }
            d.members.push(user);
            Ok(())
        })
    }

    pub async fn load(&self, dal: &DataLayer) -> OpResult {
        dal.get(self.entity()).await.await
    }

    pub async fn save(&self, dal: &DataLayer) -> OpResult {
        dal.save(self.entity()).await.await
    }

    pub async fn delete(&self, dal: &DataLayer) -> OpResult {
        dal.delete(self.entity()).await.await
    }
}
