// src/deltas/query.rs

//! Query surface for the sourcing pipeline's delta reconciliation.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::content::{EntityId, SiteId};
use crate::deltas::{DeletedEntityRecord, DeltaTracker};
use crate::errors::{GatsbyHelperError, Result};

/// One deleted node as reported to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedNode {
    pub node_id: EntityId,
    pub node_type: String,
    pub site_id: SiteId,
}

impl From<DeletedEntityRecord> for DeletedNode {
    fn from(record: DeletedEntityRecord) -> Self {
        Self {
            node_id: record.id,
            node_type: record.type_name,
            site_id: record.site_id,
        }
    }
}

/// Resolver for the `nodesDeletedSince` query.
#[derive(Debug, Clone)]
pub struct DeltaQuery {
    tracker: DeltaTracker,
}

impl DeltaQuery {
    pub fn new(tracker: DeltaTracker) -> Self {
        Self { tracker }
    }

    /// Parse `since` as RFC 3339 and consume the matching records.
    pub fn nodes_deleted_since(&self, since: &str) -> Result<Vec<DeletedNode>> {
        let since = parse_since(since)?;
        let records = self.tracker.list_and_clear(since)?;
        Ok(records.into_iter().map(DeletedNode::from).collect())
    }
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_since(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| GatsbyHelperError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}
