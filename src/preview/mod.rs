// src/preview/mod.rs

//! Live preview relay.
//!
//! While an editor previews an entity, every preview refresh is relayed to
//! the Gatsby preview webhook so the preview build can re-source that one
//! node. The relay is a single-session state machine:
//!
//! - [`core`] holds the pure `Idle → Watching → Notifying` transitions and
//!   the URL-path consistency check;
//! - [`debounce`] collapses bursts of editor events;
//! - [`token`] supplies short-lived preview tokens;
//! - [`relay`] is the async shell that owns one session per spawned relay.

pub mod core;
pub mod debounce;
pub mod relay;
pub mod token;

use serde::{Deserialize, Serialize};

use crate::content::{EntityId, SiteId};

pub use self::core::{RefreshDecision, RelayCore, RelayState, SkipReason};
pub use debounce::Debouncer;
pub use relay::{RelayHandle, RelayStatus, spawn_relay};
pub use token::{IssuedTokenSource, PreviewTokenSource};

/// Default quiescence window for preview events.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Value of the `x-preview-update-source` header.
pub const PREVIEW_UPDATE_SOURCE: &str = "Craft CMS";

pub const PREVIEW_SOURCE_HEADER: &str = "x-preview-update-source";
pub const DATA_SOURCE_HEADER: &str = "x-gatsby-cloud-data-source";

/// The only operation the relay ever reports.
pub const UPDATE_OPERATION: &str = "update";

/// Which entity a relay instance watches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewTarget {
    /// Canonical id of the edited entity.
    pub entity_id: EntityId,
    /// Query-schema type name, e.g. `entry_blogPost`.
    pub type_name: String,
    pub site_id: SiteId,
}

/// Where and how preview notifications are delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewWebhook {
    pub url: String,
    pub data_source: String,
}

/// Everything needed to install a relay for one preview target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewInstall {
    pub target: PreviewTarget,
    pub webhook: PreviewWebhook,
}

/// The live state of an active preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewSession {
    pub watched_entity_id: EntityId,
    pub gql_type_name: String,
    pub site_id: SiteId,
    pub preview_token: Option<String>,
}

/// JSON body sent to the preview webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewPayload {
    pub operation: String,
    pub type_name: String,
    pub id: EntityId,
    pub site_id: SiteId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Parameters of a `beforeUpdateIframe` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshEvent {
    /// URL the preview frame is about to load.
    pub preview_target_url: String,
    /// URL of the preview the editor currently has open.
    pub editor_preview_url: String,
}

/// Events raised by the preview surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewEvent {
    /// The preview frame is about to refresh.
    BeforeUpdateIframe(RefreshEvent),
    /// The preview pane is closing.
    BeforeClose,
    /// The window or tab is closing.
    WindowUnload,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    PreviewClosed,
    WindowUnload,
}
