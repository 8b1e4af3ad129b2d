// src/deltas/store.rs

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::content::EntityId;
use crate::deltas::DeletedEntityRecord;
use crate::types::DeltaStorageMode;

/// Relative path (from the delta root) to the records file.
///
/// The effective path on disk is `<root>/.gatsby-helper/deleted-entities.json`.
pub const DELTA_FILE_PATH: &str = ".gatsby-helper/deleted-entities.json";

fn delta_file_path(root: &Path) -> PathBuf {
    root.join(DELTA_FILE_PATH)
}

/// Abstract storage for deleted-entity records, keyed by entity id.
///
/// Callers serialize access (see [`crate::deltas::DeltaTracker`]); a store
/// only has to keep each operation self-consistent.
pub trait DeltaStore: Send {
    /// Insert a record unless one already exists for its id.
    ///
    /// Returns `true` if the record was inserted.
    fn insert(&mut self, record: DeletedEntityRecord) -> Result<bool>;

    /// Records deleted at or after `since`, oldest first.
    fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<DeletedEntityRecord>>;

    /// Like [`DeltaStore::list_since`] but also removes the returned records.
    ///
    /// If removal cannot be persisted the records must stay in the store and
    /// an error is returned.
    fn take_since(&mut self, since: DateTime<Utc>) -> Result<Vec<DeletedEntityRecord>>;

    /// Remove records deleted before `cutoff`. Returns how many were removed.
    fn prune_before(&mut self, cutoff: DateTime<Utc>) -> Result<usize>;

    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Open the store selected by `mode`.
pub fn open_store(mode: DeltaStorageMode, root: &Path) -> Box<dyn DeltaStore> {
    match mode {
        DeltaStorageMode::File => Box::new(FileDeltaStore::new(root.to_path_buf())),
        DeltaStorageMode::Memory => Box::new(MemoryDeltaStore::new()),
    }
}

type RecordMap = BTreeMap<EntityId, DeletedEntityRecord>;

fn select_since(map: &RecordMap, since: DateTime<Utc>) -> Vec<DeletedEntityRecord> {
    let mut records: Vec<DeletedEntityRecord> = map
        .values()
        .filter(|r| r.deleted_at >= since)
        .cloned()
        .collect();
    records.sort_by(|a, b| a.deleted_at.cmp(&b.deleted_at).then(a.id.cmp(&b.id)));
    records
}

/// Stores records in memory only.
#[derive(Debug, Default)]
pub struct MemoryDeltaStore {
    map: RecordMap,
}

impl MemoryDeltaStore {
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }
}

impl DeltaStore for MemoryDeltaStore {
    fn insert(&mut self, record: DeletedEntityRecord) -> Result<bool> {
        if self.map.contains_key(&record.id) {
            return Ok(false);
        }
        debug!(id = %record.id, type_name = %record.type_name, "stored deletion (memory)");
        self.map.insert(record.id, record);
        Ok(true)
    }

    fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<DeletedEntityRecord>> {
        Ok(select_since(&self.map, since))
    }

    fn take_since(&mut self, since: DateTime<Utc>) -> Result<Vec<DeletedEntityRecord>> {
        let records = select_since(&self.map, since);
        for r in &records {
            self.map.remove(&r.id);
        }
        Ok(records)
    }

    fn prune_before(&mut self, cutoff: DateTime<Utc>) -> Result<usize> {
        let initial_len = self.map.len();
        self.map.retain(|_, r| r.deleted_at >= cutoff);
        let removed = initial_len - self.map.len();
        if removed > 0 {
            info!(removed, "pruned expired deletion records (memory)");
        }
        Ok(removed)
    }

    fn len(&self) -> Result<usize> {
        Ok(self.map.len())
    }
}

/// Stores records in a JSON file under `<root>/.gatsby-helper/`.
///
/// Every operation reloads the file, so the on-disk document is always the
/// source of truth.
#[derive(Debug, Clone)]
pub struct FileDeltaStore {
    root: PathBuf,
}

impl FileDeltaStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn path(&self) -> PathBuf {
        delta_file_path(&self.root)
    }
}

impl DeltaStore for FileDeltaStore {
    fn insert(&mut self, record: DeletedEntityRecord) -> Result<bool> {
        let mut map = load_all_records(&self.root)?;
        if map.contains_key(&record.id) {
            return Ok(false);
        }
        let id = record.id;
        map.insert(id, record);
        save_all_records(&self.root, &map)?;
        debug!(%id, "stored deletion (file)");
        Ok(true)
    }

    fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<DeletedEntityRecord>> {
        let map = load_all_records(&self.root)?;
        Ok(select_since(&map, since))
    }

    fn take_since(&mut self, since: DateTime<Utc>) -> Result<Vec<DeletedEntityRecord>> {
        let mut map = load_all_records(&self.root)?;
        let records = select_since(&map, since);
        if records.is_empty() {
            return Ok(records);
        }
        for r in &records {
            map.remove(&r.id);
        }
        save_all_records(&self.root, &map)?;
        Ok(records)
    }

    fn prune_before(&mut self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut map = load_all_records(&self.root)?;
        let initial_len = map.len();
        map.retain(|_, r| r.deleted_at >= cutoff);
        let removed = initial_len - map.len();
        if removed > 0 {
            save_all_records(&self.root, &map)?;
            info!(removed, "pruned expired deletion records (file)");
        }
        Ok(removed)
    }

    fn len(&self) -> Result<usize> {
        Ok(load_all_records(&self.root)?.len())
    }
}

/// Load all records from `<root>/.gatsby-helper/deleted-entities.json`.
fn load_all_records(root: &Path) -> Result<RecordMap> {
    let path = delta_file_path(root);

    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let file = File::open(&path)
        .with_context(|| format!("opening delta file at {:?}", path))?;
    let records: Vec<DeletedEntityRecord> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing delta file at {:?}", path))?;

    Ok(records.into_iter().map(|r| (r.id, r)).collect())
}

/// Persist all records. The document is written to a temporary sibling and
/// renamed over the target.
fn save_all_records(root: &Path, map: &RecordMap) -> Result<()> {
    let path = delta_file_path(root);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating delta directory at {:?}", parent))?;
    }

    let tmp_path = path.with_extension("json.tmp");
    {
        let file = File::create(&tmp_path)
            .with_context(|| format!("creating delta file at {:?}", tmp_path))?;
        let mut writer = BufWriter::new(file);
        let records: Vec<&DeletedEntityRecord> = map.values().collect();
        serde_json::to_writer_pretty(&mut writer, &records)?;
        writer.flush()?;
    }

    fs::rename(&tmp_path, &path)
        .with_context(|| format!("replacing delta file at {:?}", path))?;
    Ok(())
}
