// src/content/entity.rs

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque content-store identifier of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the site an entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(pub u64);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether an entity is the published (canonical) version or a variant of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    #[default]
    Canonical,
    Draft,
    Revision,
}

/// A content entity at the moment a lifecycle event fires.
///
/// `owner` is a parent pointer: nested content (e.g. a block inside an
/// entry) points at the entity that owns it. Drafts and revisions are
/// flagged on the owning entity, so filters must look at the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentEntity {
    pub id: EntityId,
    pub site_id: SiteId,
    /// Schema type label, e.g. `entry_blogPost`.
    pub type_name: String,
    #[serde(default)]
    pub variant: VariantKind,
    /// For drafts and revisions: the canonical entity they derive from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Arc<ContentEntity>>,
}

impl ContentEntity {
    pub fn new(id: u64, site_id: u64, type_name: impl Into<String>) -> Self {
        Self {
            id: EntityId(id),
            site_id: SiteId(site_id),
            type_name: type_name.into(),
            variant: VariantKind::Canonical,
            canonical_id: None,
            owner: None,
        }
    }

    pub fn is_draft(&self) -> bool {
        self.variant == VariantKind::Draft
    }

    pub fn is_revision(&self) -> bool {
        self.variant == VariantKind::Revision
    }

    /// True for drafts and revisions.
    pub fn is_variant(&self) -> bool {
        self.is_draft() || self.is_revision()
    }

    /// Id of the canonical entity this one represents.
    ///
    /// Canonical entities return their own id.
    pub fn canonical_id(&self) -> EntityId {
        self.canonical_id.unwrap_or(self.id)
    }
}

/// Walk owner pointers up to the root entity.
///
/// Returns `entity` itself when it has no owner.
pub fn canonical_of(entity: &ContentEntity) -> &ContentEntity {
    let mut current = entity;
    while let Some(owner) = current.owner.as_deref() {
        current = owner;
    }
    current
}
