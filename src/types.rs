use serde::Deserialize;

/// Where deleted-entity records are kept between delta queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaStorageMode {
    /// Store records in a JSON file (`.gatsby-helper/deleted-entities.json`).
    File,
    /// Store records in memory only (lost on restart).
    Memory,
}

impl Default for DeltaStorageMode {
    fn default() -> Self {
        DeltaStorageMode::Memory
    }
}
