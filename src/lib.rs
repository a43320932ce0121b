//! Keyed Data-Access Layer Library
//!
//! This library crate holds the asynchronous data-access layer and the session
//! service built on it. It serves as the foundation for the binary executable
//! (`main.rs`).
//!
//! ## Architecture Modules
//! - **`model`**: Storable records. A record pairs a type tag and a key with a
//!   payload that can be encoded to and decoded from bytes.
//! - **`store`**: The `RemoteStore` trait and its two backends, an in-memory map
//!   and an HTTP client for the remote key-value service.
//! - **`dispatch`**: Per-key serialization. A single dispatcher routes every
//!   operation to the worker owning its routing key, so operations on one key run
//!   one at a time in submission order while distinct keys proceed in parallel.
//! - **`sessions`**: Game sessions stored as records, plus their HTTP handlers.
//! - **`config`** / **`context`**: Startup configuration and the `DataLayer`
//!   value that owns the store client and the dispatcher.

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod sessions;
pub mod store;

pub use context::DataLayer;
pub use dispatch::{Completion, OpResult};
pub use error::StoreError;
pub use model::{Entity, Record};
