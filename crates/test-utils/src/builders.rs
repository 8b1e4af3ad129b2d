#![allow(dead_code)]

use std::sync::Arc;

use gatsby_helper::config::{ConfigFile, RawConfigFile};
use gatsby_helper::content::{ContentEntity, EntityId, VariantKind};
use gatsby_helper::preview::RefreshEvent;
use gatsby_helper::types::DeltaStorageMode;

/// Builder for `ContentEntity` to simplify test setup.
pub struct EntityBuilder {
    entity: ContentEntity,
}

impl EntityBuilder {
    pub fn new(id: u64, type_name: &str) -> Self {
        Self {
            entity: ContentEntity::new(id, 1, type_name),
        }
    }

    pub fn site(mut self, site_id: u64) -> Self {
        self.entity.site_id = gatsby_helper::content::SiteId(site_id);
        self
    }

    /// Mark as a draft of `canonical`.
    pub fn draft_of(mut self, canonical: u64) -> Self {
        self.entity.variant = VariantKind::Draft;
        self.entity.canonical_id = Some(EntityId(canonical));
        self
    }

    /// Mark as a revision of `canonical`.
    pub fn revision_of(mut self, canonical: u64) -> Self {
        self.entity.variant = VariantKind::Revision;
        self.entity.canonical_id = Some(EntityId(canonical));
        self
    }

    pub fn owned_by(mut self, owner: ContentEntity) -> Self {
        self.entity.owner = Some(Arc::new(owner));
        self
    }

    pub fn build(self) -> ContentEntity {
        self.entity
    }
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn build_webhook(mut self, url: &str) -> Self {
        self.config.settings.build_webhook_url = url.to_string();
        self
    }

    pub fn preview_webhook(mut self, url: &str, data_source: &str) -> Self {
        self.config.settings.preview_webhook_url = url.to_string();
        self.config.settings.gatsby_cloud_data_source = data_source.to_string();
        self
    }

    pub fn coalesce_window_ms(mut self, ms: u64) -> Self {
        self.config.builds.coalesce_window_ms = ms;
        self
    }

    pub fn preview_debounce_ms(mut self, ms: u64) -> Self {
        self.config.preview.debounce_ms = ms;
        self
    }

    pub fn delta_storage(mut self, mode: DeltaStorageMode) -> Self {
        self.config.deltas.storage = mode;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    /// Validate without consulting the process environment.
    pub fn build(self) -> ConfigFile {
        ConfigFile::from_raw_with_env(self.config, |_| None)
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A refresh event whose target and editor URLs share the same path.
pub fn matching_refresh(path: &str) -> RefreshEvent {
    RefreshEvent {
        preview_target_url: format!("https://site.example.com{path}"),
        editor_preview_url: format!("https://site.example.com{path}?token=abc&x-craft-live-preview=1"),
    }
}

/// A refresh event whose URLs point at different pages.
pub fn mismatched_refresh() -> RefreshEvent {
    RefreshEvent {
        preview_target_url: "https://site.example.com/blog/a".to_string(),
        editor_preview_url: "https://site.example.com/blog/b".to_string(),
    }
}
