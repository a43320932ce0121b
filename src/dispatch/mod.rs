//! Per-Key Dispatch Core
//!
//! Serializes operations on the same record while letting different records
//! proceed in parallel.
//!
//! ## Architecture Overview
//! 1. **Submission**: Callers hand an `Operation` to the `Dispatcher` and get a
//!    `Completion` back immediately. The only wait is for space in the bounded
//!    intake channel.
//! 2. **Routing**: A single dispatch loop maps each operation to the worker
//!    owning its routing key (`Collection/key`), spawning one if needed.
//! 3. **Execution**: Each `KeyWorker` drains its own queue in FIFO order and is
//!    the only task that calls the remote store for its key.
//! 4. **Retirement**: Workers whose queue stays empty for the idle window
//!    unregister themselves, racing safely with new submissions.
//!
//! ## Submodules
//! - **`types`**: `Operation`, `OperationKind` and `RoutingKey`.
//! - **`completion`**: The single-use `Completer`/`Completion` pair.
//! - **`dispatcher`**: Intake, registry, routing and shutdown.
//! - **`worker`**: Key worker lifecycle and per-operation processing.

pub mod completion;
pub mod dispatcher;
pub mod types;
mod worker;

pub use completion::{Completion, OpResult};
pub use dispatcher::{DeletePolicy, Dispatcher, DispatcherConfig, DispatcherStats};
pub use types::{Operation, OperationKind, RoutingKey};
