//! ActionStore - persisted default-action records
//!
//! Stores the ordered list of action-descriptor records that the bridge
//! appends to every check-equipment reply. The collection is written as a
//! single JSON document and replaced wholesale on every save; there is no
//! incremental update path.
//!
//! # Layout
//!
//! ```text
//! .actionstore/
//! ├── default_actions.json   # the saved collection + save timestamp
//! └── default_actions.lock   # advisory lock guarding writes
//! ```
//!
//! # Example
//!
//! ```ignore
//! use actionstore::ActionStore;
//!
//! let store = ActionStore::open(".actionstore")?;
//! store.save(&[serde_json::json!({"name": "Inspector"})])?;
//! let actions = store.load()?;
//! ```

pub mod cli;
pub mod config;
mod store;

pub use store::{ActionStore, SavedActions};

/// File name of the persisted collection
pub const ACTIONS_FILE: &str = "default_actions.json";

/// File name of the advisory write lock
pub const LOCK_FILE: &str = "default_actions.lock";
