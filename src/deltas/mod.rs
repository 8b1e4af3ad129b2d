// src/deltas/mod.rs

//! Deletion tracking for incremental (delta) sourcing.
//!
//! Once an entity is deleted the content store can no longer describe it,
//! so the tracker keeps a [`DeletedEntityRecord`] until a delta query
//! consumes it.
//!
//! - [`store`] defines the storage trait and its memory/file backends.
//! - [`tracker`] is the concurrency-safe facade used by the dispatcher.
//! - [`query`] exposes consumed records in the shape the sourcing pipeline
//!   expects.

pub mod query;
pub mod store;
pub mod tracker;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::{EntityId, SiteId};

pub use query::{DeletedNode, DeltaQuery};
pub use store::{DELTA_FILE_PATH, DeltaStore, FileDeltaStore, MemoryDeltaStore, open_store};
pub use tracker::DeltaTracker;

/// A permanent deletion of a canonical entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedEntityRecord {
    pub id: EntityId,
    pub type_name: String,
    pub site_id: SiteId,
    pub deleted_at: DateTime<Utc>,
}
