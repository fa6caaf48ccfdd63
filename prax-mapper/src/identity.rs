//! Identity map.

use parking_lot::RwLock;
use smol_str::SmolStr;
use std::collections::HashMap;

use crate::entity::EntityRef;

/// Key of one managed entity: hierarchy root type plus rendered identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    /// Root type of the entity's inheritance hierarchy.
    pub root: SmolStr,
    /// String-rendered identifier.
    pub id: SmolStr,
}

impl IdentityKey {
    /// Create a key.
    pub fn new(root: impl Into<SmolStr>, id: impl Into<SmolStr>) -> Self {
        Self {
            root: root.into(),
            id: id.into(),
        }
    }
}

/// Registry guaranteeing one in-memory entity per identity.
#[derive(Debug, Default)]
pub struct IdentityMap {
    entries: RwLock<HashMap<IdentityKey, EntityRef>>,
}

impl IdentityMap {
    /// Create an empty identity map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a managed entity.
    pub fn get(&self, key: &IdentityKey) -> Option<EntityRef> {
        self.entries.read().get(key).cloned()
    }

    /// Register an entity unless one with the same identity exists.
    ///
    /// Returns the entity that is managed afterwards.
    pub fn get_or_insert_with(
        &self,
        key: IdentityKey,
        create: impl FnOnce() -> EntityRef,
    ) -> EntityRef {
        if let Some(existing) = self.get(&key) {
            return existing;
        }
        self.entries.write().entry(key).or_insert_with(create).clone()
    }

    /// Check if an identity is managed.
    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Number of managed entities.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if nothing is managed.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Remove every entity, returning them.
    pub fn drain(&self) -> Vec<EntityRef> {
        self.entries.write().drain().map(|(_, e)| e).collect()
    }
}
