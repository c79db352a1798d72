//! Board data model, geometry, configuration, and storage for Nodall
//! task-list boards.

pub mod config;
pub mod id;
pub mod layout;
pub mod model;
pub mod persist;

pub use config::{BoardConfig, ConfigError};
pub use id::{IdGenerator, NodeId};
pub use layout::Bounds;
pub use model::*;
pub use persist::{FileStorage, KeyValueStore, MemoryStorage, StorageError};
