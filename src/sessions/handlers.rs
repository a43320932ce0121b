use super::session::Session;
use super::types::{SessionData, SessionError, User};
use crate::context::DataLayer;
use crate::error::StoreError;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub const ENDPOINT_ROOT: &str = "/";
pub const ENDPOINT_SESSION: &str = "/sessions/:key";
pub const ENDPOINT_SESSION_MEMBERS: &str = "/sessions/:key/members";

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// One mutex per session key with a join in progress.
///
/// A join is three dispatcher operations (load, add, save); holding the key's
/// lock across them keeps concurrent joins on one session from overwriting
/// each other. Entries are dropped once no join holds or waits on them.
#[derive(Default)]
pub struct JoinLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl JoinLocks {
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(key.to_string()).or_default().clone();
        lock.lock_owned().await
    }

    /// Call after dropping the guard from `acquire`.
    pub fn release(&self, key: &str) {
        self.locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Number of session keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.locks.len()
    }
}

pub fn router(dal: Arc<DataLayer>) -> Router {
    Router::new()
        .route(ENDPOINT_ROOT, get(handle_hello))
        .route(
            ENDPOINT_SESSION,
            get(handle_get_session)
                .put(handle_put_session)
                .delete(handle_delete_session),
        )
        .route(ENDPOINT_SESSION_MEMBERS, post(handle_add_member))
        .layer(Extension(Arc::new(JoinLocks::default())))
        .layer(Extension(dal))
}

pub async fn handle_hello() -> &'static str {
    "hello!\n"
}

pub async fn handle_get_session(
    Extension(dal): Extension<Arc<DataLayer>>,
    Path(key): Path<String>,
) -> Result<Json<SessionData>, ApiError> {
    let session = Session::new(&key);
    session.load(&dal).await.map_err(store_error)?;

    Ok(Json(session.data()))
}

pub async fn handle_put_session(
    Extension(dal): Extension<Arc<DataLayer>>,
    Path(key): Path<String>,
    Json(data): Json<SessionData>,
) -> Result<StatusCode, ApiError> {
    let session = Session::with_data(&key, data);
    session.save(&dal).await.map_err(store_error)?;

    tracing::debug!("Saved session {}", key);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn handle_delete_session(
    Extension(dal): Extension<Arc<DataLayer>>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    Session::new(&key).delete(&dal).await.map_err(store_error)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Load, add, save, under the session's join lock.
pub async fn handle_add_member(
    Extension(dal): Extension<Arc<DataLayer>>,
    Extension(locks): Extension<Arc<JoinLocks>>,
    Path(key): Path<String>,
    Json(req): Json<JoinRequest>,
) -> Result<Json<User>, ApiError> {
    let guard = locks.acquire(&key).await;
    let joined = join_session(&dal, &key, &req.name).await;
    drop(guard);
    locks.release(&key);

    let user = joined?;
    tracing::info!("{} joined session {}", user.name, key);
    Ok(Json(user))
}

async fn join_session(dal: &DataLayer, key: &str, name: &str) -> Result<User, ApiError> {
    let session = Session::new(key);
    session.load(dal).await.map_err(store_error)?;

    let user = User::new(name);
    session.add_member(user.clone()).map_err(session_error)?;
    session.save(dal).await.map_err(store_error)?;

    Ok(user)
}

fn store_error(err: StoreError) -> ApiError {
    let status = match &err {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::InvalidRecord(_) => StatusCode::BAD_REQUEST,
        StoreError::Transport(_) => StatusCode::BAD_GATEWAY,
        StoreError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::Encoding(_) | StoreError::Aborted(_) | StoreError::Cancelled => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    if status.is_server_error() {
        tracing::error!("Session request failed: {}", err);
    }

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

fn session_error(err: SessionError) -> ApiError {
    (
        StatusCode::CONFLICT,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}
