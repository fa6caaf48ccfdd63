//! Managed entities, lazy placeholders and relation collections.
//!
//! An [`Entity`] is either a lazy placeholder holding only its identifier or
//! an initialized object with its columns and associations populated. The
//! transition happens once, when a row is hydrated onto the instance.
//!
//! ```rust
//! use prax_mapper::{Entity, EntityId, LoadState};
//!
//! let entity = Entity::placeholder("Category", EntityId::Int(1));
//! assert_eq!(entity.load_state(), LoadState::Uninitialized);
//! assert!(entity.get_value("name").is_none());
//! ```

use indexmap::IndexMap;
use parking_lot::RwLock;
use smol_str::SmolStr;
use std::fmt;
use std::sync::Arc;

use crate::value::{EntityId, Value};

/// Shared handle to a managed entity.
pub type EntityRef = Arc<Entity>;

/// The state of a lazy placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadState {
    /// Only the identifier is known.
    Uninitialized,
    /// Columns and associations are populated.
    Initialized,
}

impl LoadState {
    /// Check if the body has been loaded.
    pub fn is_initialized(&self) -> bool {
        matches!(self, Self::Initialized)
    }
}

#[derive(Debug)]
struct EntityState {
    load: LoadState,
    values: IndexMap<SmolStr, Value>,
    references: IndexMap<SmolStr, Option<EntityRef>>,
    collections: IndexMap<SmolStr, Arc<RelationCollection>>,
}

/// A managed entity.
pub struct Entity {
    entity_type: SmolStr,
    id: EntityId,
    state: RwLock<EntityState>,
}

impl Entity {
    /// Create an uninitialized placeholder.
    pub fn placeholder(entity_type: impl Into<SmolStr>, id: EntityId) -> Self {
        Self::with_state(entity_type.into(), id, LoadState::Uninitialized)
    }

    /// Create an initialized entity that is not backed by a row yet.
    pub fn new(entity_type: impl Into<SmolStr>, id: EntityId) -> Self {
        Self::with_state(entity_type.into(), id, LoadState::Initialized)
    }

    fn with_state(entity_type: SmolStr, id: EntityId, load: LoadState) -> Self {
        Self {
            entity_type,
            id,
            state: RwLock::new(EntityState {
                load,
                values: IndexMap::new(),
                references: IndexMap::new(),
                collections: IndexMap::new(),
            }),
        }
    }

    /// The concrete entity type.
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// The identifier.
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// Current load state.
    pub fn load_state(&self) -> LoadState {
        self.state.read().load
    }

    /// Check if the body has been loaded.
    pub fn is_initialized(&self) -> bool {
        self.load_state().is_initialized()
    }

    /// Read a scalar column without triggering a load.
    pub fn get_value(&self, field: &str) -> Option<Value> {
        self.state.read().values.get(field).cloned()
    }

    /// Set a scalar column.
    pub fn set_value(&self, field: impl Into<SmolStr>, value: impl Into<Value>) {
        self.state.write().values.insert(field.into(), value.into());
    }

    /// Read a to-one association without triggering a load.
    ///
    /// The outer `None` means the association is not populated; the inner
    /// `None` means it is populated and null.
    pub fn get_reference(&self, field: &str) -> Option<Option<EntityRef>> {
        self.state.read().references.get(field).cloned()
    }

    /// Set a to-one association.
    pub fn set_reference(&self, field: impl Into<SmolStr>, target: Option<EntityRef>) {
        self.state.write().references.insert(field.into(), target);
    }

    /// Get the collection for a to-many association, if populated.
    pub fn get_collection(&self, field: &str) -> Option<Arc<RelationCollection>> {
        self.state.read().collections.get(field).cloned()
    }

    /// Get the collection for a to-many association, creating an empty
    /// uninitialized one when missing.
    pub fn collection_or_default(&self, field: &str) -> Arc<RelationCollection> {
        if let Some(collection) = self.get_collection(field) {
            return collection;
        }
        let mut state = self.state.write();
        state
            .collections
            .entry(SmolStr::new(field))
            .or_insert_with(|| Arc::new(RelationCollection::new()))
            .clone()
    }

    /// Populate the body of a placeholder. Returns `false` when the entity was
    /// already initialized, in which case nothing is changed.
    pub(crate) fn hydrate(
        &self,
        values: IndexMap<SmolStr, Value>,
        references: IndexMap<SmolStr, Option<EntityRef>>,
        collections: Vec<SmolStr>,
    ) -> bool {
        let mut state = self.state.write();
        if state.load.is_initialized() {
            return false;
        }
        state.values = values;
        state.references = references;
        for field in collections {
            state
                .collections
                .entry(field)
                .or_insert_with(|| Arc::new(RelationCollection::new()));
        }
        state.load = LoadState::Initialized;
        true
    }

    /// Drop all associations so reference cycles between entities are broken.
    pub(crate) fn detach(&self) {
        let mut state = self.state.write();
        state.references.clear();
        state.collections.clear();
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("type", &self.entity_type)
            .field("id", &self.id)
            .field("state", &self.load_state())
            .finish()
    }
}

#[derive(Debug, Default)]
struct CollectionState {
    initialized: bool,
    dirty: bool,
    items: Vec<EntityRef>,
    snapshot: Vec<EntityRef>,
}

/// The target set of one to-many association on one owning entity.
///
/// A collection is eligible for batch loading only while it is neither
/// initialized nor dirty. Local additions through [`add`](Self::add) make it
/// dirty until the next snapshot.
#[derive(Debug, Default)]
pub struct RelationCollection {
    state: RwLock<CollectionState>,
}

impl RelationCollection {
    /// Create an empty uninitialized collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the collection has been loaded from storage.
    pub fn is_initialized(&self) -> bool {
        self.state.read().initialized
    }

    /// Check if the collection was mutated locally since the last snapshot.
    pub fn is_dirty(&self) -> bool {
        self.state.read().dirty
    }

    /// Current items.
    pub fn items(&self) -> Vec<EntityRef> {
        self.state.read().items.clone()
    }

    /// Items as of the last snapshot.
    pub fn snapshot(&self) -> Vec<EntityRef> {
        self.state.read().snapshot.clone()
    }

    /// Number of items currently held.
    pub fn len(&self) -> usize {
        self.state.read().items.len()
    }

    /// Check if no items are held.
    pub fn is_empty(&self) -> bool {
        self.state.read().items.is_empty()
    }

    /// Check if an entity is held.
    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.state.read().items.iter().any(|e| Arc::ptr_eq(e, entity))
    }

    /// Add an entity as a local mutation.
    pub fn add(&self, entity: EntityRef) {
        let mut state = self.state.write();
        if !state.items.iter().any(|e| Arc::ptr_eq(e, &entity)) {
            state.items.push(entity);
        }
        state.dirty = true;
    }

    /// Attach an entity read from storage. Does not make the collection dirty.
    pub fn push_loaded(&self, entity: EntityRef) {
        let mut state = self.state.write();
        if !state.items.iter().any(|e| Arc::ptr_eq(e, &entity)) {
            state.items.push(entity);
        }
    }

    /// Mark the collection as loaded from storage.
    pub fn mark_initialized(&self) {
        self.state.write().initialized = true;
    }

    /// Record the current items as the persisted state and clear the dirty flag.
    pub fn take_snapshot(&self) {
        let mut state = self.state.write();
        state.snapshot = state.items.clone();
        state.dirty = false;
    }

    /// Merge rows loaded by the lazy path with pending local additions.
    ///
    /// Loaded items come first, followed by local additions not already among
    /// them. Local additions keep the collection dirty.
    pub(crate) fn restore(&self, loaded: Vec<EntityRef>) {
        let mut state = self.state.write();
        let local = std::mem::take(&mut state.items);
        state.snapshot = loaded.clone();
        state.items = loaded;
        for entity in local {
            if !state.items.iter().any(|e| Arc::ptr_eq(e, &entity)) {
                state.items.push(entity);
            }
        }
        state.initialized = true;
    }
}
