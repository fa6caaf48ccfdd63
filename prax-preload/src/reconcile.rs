//! Reconciliation of loaded targets with managed entities.

use indexmap::IndexMap;
use prax_mapper::{EntityRef, RelationCollection, Session};
use smol_str::SmolStr;
use std::sync::Arc;

use crate::error::{PreloadError, PreloadResult};

/// Targets of one preload call, keyed by identifier in first-seen order.
///
/// The first object recorded for an identifier is never replaced, and the
/// managed copy from the identity map is recorded in preference to the one
/// offered.
#[derive(Debug, Default)]
pub struct TargetSet {
    entries: IndexMap<SmolStr, EntityRef>,
}

impl TargetSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a target and return the object kept for its identifier.
    pub fn insert(&mut self, session: &Session, entity: EntityRef) -> PreloadResult<EntityRef> {
        let key = entity.id().key();
        if let Some(existing) = self.entries.get(&key) {
            return Ok(existing.clone());
        }

        let kept = session
            .try_get_by_id(entity.entity_type(), entity.id())
            .map_err(PreloadError::catalog)?
            .unwrap_or(entity);
        self.entries.insert(key, kept.clone());
        Ok(kept)
    }

    /// Number of distinct targets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The targets in first-seen order.
    pub fn into_vec(self) -> Vec<EntityRef> {
        self.entries.into_values().collect()
    }
}

/// Mark collections as loaded and record their current items as persisted.
pub fn finalize_collections<'a>(collections: impl IntoIterator<Item = &'a Arc<RelationCollection>>) {
    for collection in collections {
        collection.mark_initialized();
        collection.take_snapshot();
    }
}
