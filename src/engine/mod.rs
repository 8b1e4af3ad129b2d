// src/engine/mod.rs

//! Sidecar runtime.
//!
//! The content store writes one JSON [`LifecycleEvent`] per line to the
//! sidecar's stdin. [`input`] parses those lines into [`RuntimeEvent`]s and
//! [`runtime`] routes them to the [`crate::dispatch::EventDispatcher`], the
//! active preview relay and the delta query, writing [`RuntimeOutput`] lines
//! to stdout.

use serde::{Deserialize, Serialize};

use crate::content::{ContentEntity, EntityId};
use crate::deltas::DeletedNode;
use crate::preview::PreviewInstall;

/// Wire format of inbound hook notifications.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    AfterSave { entity: ContentEntity },
    AfterDelete { entity: ContentEntity },
    RegisterPreviewTargets { entity: ContentEntity },
    PreviewRefresh {
        preview_target_url: String,
        editor_preview_url: String,
    },
    PreviewClose,
    WindowUnload,
    NodesDeletedSince { since: String },
}

/// Events flowing into the runtime loop.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeEvent {
    Lifecycle(LifecycleEvent),
    /// The input stream reached EOF.
    InputClosed,
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Wire format of the sidecar's answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "output", rename_all = "snake_case")]
pub enum RuntimeOutput {
    PreviewInstalled { install: PreviewInstall },
    PreviewDisabled { entity_id: EntityId },
    NodesDeleted { since: String, nodes: Vec<DeletedNode> },
    QueryFailed { since: String, error: String },
}

pub mod input;
pub mod runtime;

pub use input::spawn_line_reader;
pub use runtime::Runtime;
