// src/dispatch/mod.rs

//! Event dispatch shim.
//!
//! Routes content-store lifecycle hooks to the delta tracker, the rebuild
//! trigger and (for preview registration) the preview relay. It resolves
//! every entity to its root with [`canonical_of`] before filtering, and never
//! lets a downstream failure reach the content mutation that raised the hook.

use tracing::{debug, error};

use crate::builds::BuildTrigger;
use crate::config::ConfigFile;
use crate::content::{ContentEntity, canonical_of};
use crate::deltas::DeltaTracker;
use crate::preview::{PreviewInstall, PreviewTarget, PreviewWebhook};

/// Lifecycle-hook router.
///
/// Cloneable and `Send + Sync`; concurrent requests may share one instance.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    deltas: DeltaTracker,
    builds: BuildTrigger,
    preview: Option<PreviewWebhook>,
}

impl EventDispatcher {
    /// `preview` is `None` when no preview webhook is configured.
    pub fn new(deltas: DeltaTracker, builds: BuildTrigger, preview: Option<PreviewWebhook>) -> Self {
        Self {
            deltas,
            builds,
            preview,
        }
    }

    /// Preview webhook settings from a validated config, if the relay is enabled.
    pub fn preview_webhook_from(cfg: &ConfigFile) -> Option<PreviewWebhook> {
        cfg.preview_enabled().then(|| PreviewWebhook {
            url: cfg.settings.preview_webhook_url.clone(),
            data_source: cfg.settings.gatsby_cloud_data_source.clone(),
        })
    }

    pub fn deltas(&self) -> &DeltaTracker {
        &self.deltas
    }

    /// `AfterDelete`: record the deletion, then request a rebuild.
    pub fn after_delete(&self, entity: &ContentEntity) {
        if let Err(err) = self.deltas.register_deletion(entity) {
            error!(id = %entity.id, error = %err, "failed to register deleted entity");
        }

        let root = canonical_of(entity);
        self.builds.notify_mutation(entity, root);
    }

    /// `AfterSave`: request a rebuild.
    pub fn after_save(&self, entity: &ContentEntity) {
        let root = canonical_of(entity);
        self.builds.notify_mutation(entity, root);
    }

    /// `RegisterPreviewTargets`: parameterize a preview relay for `entity`.
    ///
    /// Returns `None` when the preview webhook is not configured.
    pub fn register_preview_targets(&self, entity: &ContentEntity) -> Option<PreviewInstall> {
        let Some(webhook) = &self.preview else {
            debug!(id = %entity.id, "preview webhook not configured; relay not installed");
            return None;
        };

        let install = PreviewInstall {
            target: PreviewTarget {
                entity_id: entity.canonical_id(),
                type_name: entity.type_name.clone(),
                site_id: entity.site_id,
            },
            webhook: webhook.clone(),
        };
        debug!(
            entity_id = %install.target.entity_id,
            type_name = %install.target.type_name,
            "preview relay parameterized"
        );
        Some(install)
    }
}
