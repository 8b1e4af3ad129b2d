// src/builds/mod.rs

//! Rebuild triggering.
//!
//! A content mutation on a canonical entity means "the site should be
//! rebuilt". The signal carries no diff: the pipeline re-derives what changed
//! through delta queries. [`coalescer`] filters variant mutations and merges
//! bursts of triggers into one outbound webhook call.

pub mod coalescer;

use chrono::{DateTime, Utc};

pub use coalescer::{BuildTrigger, BuildTriggerOptions};

/// "A rebuild should occur", as of `requested_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildTrigger {
    pub requested_at: DateTime<Utc>,
}

impl RebuildTrigger {
    pub fn now() -> Self {
        Self {
            requested_at: Utc::now(),
        }
    }
}
