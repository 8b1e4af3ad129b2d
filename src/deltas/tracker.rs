// src/deltas/tracker.rs

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::content::{ContentEntity, canonical_of};
use crate::deltas::DeletedEntityRecord;
use crate::deltas::store::{DeltaStore, MemoryDeltaStore};
use crate::errors::{GatsbyHelperError, Result};

/// Shared handle to the deletion store.
///
/// Cloning is cheap; every clone talks to the same store. All store access
/// goes through one mutex, so `register_*` and `list_and_clear` calls from
/// concurrent requests are serialized and a consumed record is handed to
/// exactly one caller.
#[derive(Clone)]
pub struct DeltaTracker {
    store: Arc<Mutex<Box<dyn DeltaStore>>>,
}

impl fmt::Debug for DeltaTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeltaTracker").finish_non_exhaustive()
    }
}

impl DeltaTracker {
    pub fn new(store: Box<dyn DeltaStore>) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryDeltaStore::new()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Box<dyn DeltaStore>>> {
        self.store
            .lock()
            .map_err(|_| GatsbyHelperError::StoreError("delta store mutex poisoned".to_string()))
    }

    /// Record the permanent deletion of `entity`, stamped with the current time.
    ///
    /// Returns `Ok(true)` when a new record was written, `Ok(false)` when the
    /// entity is a draft/revision or its id was already recorded.
    pub fn register_deletion(&self, entity: &ContentEntity) -> Result<bool> {
        self.register_deletion_at(entity, Utc::now())
    }

    /// Same as [`DeltaTracker::register_deletion`] with an explicit timestamp.
    pub fn register_deletion_at(
        &self,
        entity: &ContentEntity,
        deleted_at: DateTime<Utc>,
    ) -> Result<bool> {
        if entity.is_variant() || canonical_of(entity).is_variant() {
            debug!(id = %entity.id, "ignoring deletion of draft/revision");
            return Ok(false);
        }

        let record = DeletedEntityRecord {
            id: entity.id,
            type_name: entity.type_name.clone(),
            site_id: entity.site_id,
            deleted_at,
        };

        let inserted = self.lock()?.insert(record)?;
        if inserted {
            info!(
                id = %entity.id,
                type_name = %entity.type_name,
                site_id = %entity.site_id,
                "registered deleted entity"
            );
        } else {
            debug!(id = %entity.id, "deletion already registered");
        }
        Ok(inserted)
    }

    /// Return and remove every record deleted at or after `since`.
    pub fn list_and_clear(&self, since: DateTime<Utc>) -> Result<Vec<DeletedEntityRecord>> {
        let records = self.lock()?.take_since(since)?;
        debug!(%since, count = records.len(), "consumed deletion records");
        Ok(records)
    }

    /// Records deleted at or after `since`, without consuming them.
    pub fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<DeletedEntityRecord>> {
        Ok(self.lock()?.list_since(since)?)
    }

    /// Retention hook: drop records deleted before `cutoff`.
    pub fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        Ok(self.lock()?.prune_before(cutoff)?)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len()?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty()?)
    }
}
