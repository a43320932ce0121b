//! Record Model
//!
//! Defines what the data-access layer stores: keyed records whose payload can be
//! turned into bytes and back, and the rule that maps a record's type tag to the
//! remote store's collection.
//!
//! ## Submodules
//! - **`types`**: `Record<P>`, the `Serializable` capability and the object-safe
//!   `Entity` view the dispatcher works with.
//! - **`naming`**: The collection naming policy (`"session"` -> `"Sessions"`).

pub mod naming;
pub mod types;

pub use naming::collection_name;
pub use types::{Entity, Record, Serializable};

#[cfg(test)]
mod tests;
