//! Session Service Module
//!
//! The game-session model that sits on top of the data-access layer, and the
//! HTTP glue that exposes it.
//!
//! ## Submodules
//! - **`types`**: `User`, `SessionState`, `SessionData` and membership errors.
//! - **`session`**: `Session`, a typed wrapper around a `Record<SessionData>`.
//! - **`handlers`**: Axum handlers; each builds a record, submits it and awaits
//!   the completion.

pub mod handlers;
pub mod session;
pub mod types;

pub use session::Session;
pub use types::{MAX_MEMBERS, SessionData, SessionError, SessionState, User};
