// src/content/mod.rs

//! Content-store data model as seen by gatsby-helper.
//!
//! The content store owns entities; this crate only observes them at
//! lifecycle transitions. [`entity`] holds the entity types and
//! [`canonical_of`] resolves any nested or variant entity to its root.

pub mod entity;

pub use entity::{ContentEntity, EntityId, SiteId, VariantKind, canonical_of};
