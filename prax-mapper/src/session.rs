//! Unit of work over one identity map.
//!
//! A [`Session`] owns the identity map, executes queries through a
//! [`QueryExecutor`] and hydrates the resulting rows onto managed entities.
//! It also provides the ordinary lazy path: reading an association or a
//! column of a placeholder issues one query per access.
//!
//! ```rust,ignore
//! let session = Session::new(schema, store);
//! let article = session.find("Article", &EntityId::Int(1)).await?.unwrap();
//!
//! // One query for the category body, on first access.
//! let category = session.reference(&article, "category").await?.unwrap();
//! let name = session.field(&category, "name").await?;
//! ```

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::entity::{Entity, EntityRef};
use crate::error::{MapperError, MapperResult};
use crate::identity::{IdentityKey, IdentityMap};
use crate::metadata::{AssociationKind, MetadataCatalog, Schema};
use crate::query::{JunctionFilter, PairQuery, SelectQuery};
use crate::store::QueryExecutor;
use crate::value::{EntityId, Value};

/// Alias used by queries the session issues on its own.
pub(crate) const LAZY_ALIAS: &str = "t0";

/// Identity map, query execution and lazy loading for one unit of work.
pub struct Session {
    schema: Arc<Schema>,
    executor: Arc<dyn QueryExecutor>,
    identity_map: IdentityMap,
}

impl Session {
    /// Create a session.
    pub fn new(schema: Arc<Schema>, executor: Arc<dyn QueryExecutor>) -> Self {
        Self {
            schema,
            executor,
            identity_map: IdentityMap::new(),
        }
    }

    /// The metadata catalog.
    pub fn catalog(&self) -> &dyn MetadataCatalog {
        self.schema.as_ref()
    }

    /// The schema backing the catalog.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The query executor.
    pub fn executor(&self) -> &Arc<dyn QueryExecutor> {
        &self.executor
    }

    /// The identity map.
    pub fn identity_map(&self) -> &IdentityMap {
        &self.identity_map
    }

    pub(crate) fn identity_key(&self, entity_type: &str, id: &EntityId) -> MapperResult<IdentityKey> {
        Ok(IdentityKey::new(self.schema.root_type(entity_type)?, id.key()))
    }

    /// Check if an entity is still a lazy placeholder.
    pub fn is_uninitialized(&self, entity: &Entity) -> bool {
        !entity.is_initialized()
    }

    /// Look up a managed entity without touching storage.
    pub fn try_get_by_id(&self, entity_type: &str, id: &EntityId) -> MapperResult<Option<EntityRef>> {
        let key = self.identity_key(entity_type, id)?;
        Ok(self.identity_map.get(&key))
    }

    /// Get the managed entity for an identity, creating a placeholder when it
    /// is not managed yet.
    ///
    /// Placeholders cannot be created for types with subtypes because the
    /// concrete type is only known once the row is read.
    pub fn get_reference(&self, entity_type: &str, id: EntityId) -> MapperResult<EntityRef> {
        let meta = self.schema.entity(entity_type)?;
        let key = self.identity_key(entity_type, &id)?;
        if let Some(existing) = self.identity_map.get(&key) {
            return Ok(existing);
        }
        if meta.is_abstract || !meta.subclasses.is_empty() {
            return Err(MapperError::invalid_mapping(
                entity_type,
                "cannot create a placeholder for a type with subtypes",
            ));
        }
        Ok(self
            .identity_map
            .get_or_insert_with(key, || Arc::new(Entity::placeholder(meta.name.clone(), id))))
    }

    /// Execute a select query and hydrate every row.
    pub async fn execute(&self, query: &SelectQuery) -> MapperResult<Vec<EntityRef>> {
        let rows = self.executor.select(query).await?;
        let mut entities = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut stack = Vec::new();
            entities.push(
                self.hydrate_row(&query.entity, &query.alias, &row.row, row, &mut stack)
                    .await?,
            );
        }
        Ok(entities)
    }

    /// Execute a junction pair projection and convert both sides to identifiers.
    pub async fn execute_pairs(&self, query: &PairQuery) -> MapperResult<Vec<(EntityId, EntityId)>> {
        let source_type = self.schema.entity(&query.source_entity)?.identifier_type;
        let target_type = self.schema.entity(&query.target_entity)?.identifier_type;

        self.executor
            .select_pairs(query)
            .await?
            .iter()
            .map(|(s, t)| -> MapperResult<(EntityId, EntityId)> {
                Ok((source_type.from_database(s)?, target_type.from_database(t)?))
            })
            .collect()
    }

    /// Find an entity by identifier. Managed initialized entities are
    /// returned without a query.
    #[instrument(skip(self))]
    pub async fn find(&self, entity_type: &str, id: &EntityId) -> MapperResult<Option<EntityRef>> {
        if let Some(existing) = self.try_get_by_id(entity_type, id)? {
            if existing.is_initialized() && self.schema.is_subtype_of(existing.entity_type(), entity_type) {
                return Ok(Some(existing));
            }
        }
        let meta = self.schema.entity(entity_type)?;
        let query = SelectQuery::for_entity(self.catalog(), entity_type, LAZY_ALIAS)?
            .where_eq(meta.identifier.clone(), meta.identifier_type.to_database(id)?);
        Ok(self.execute(&query).await?.into_iter().next())
    }

    /// Load every entity of a type.
    pub async fn find_all(&self, entity_type: &str) -> MapperResult<Vec<EntityRef>> {
        let query = SelectQuery::for_entity(self.catalog(), entity_type, LAZY_ALIAS)?;
        self.execute(&query).await
    }

    /// Load the entities of a type whose column equals a value.
    pub async fn find_by(
        &self,
        entity_type: &str,
        column: &str,
        value: impl Into<Value>,
    ) -> MapperResult<Vec<EntityRef>> {
        let query = SelectQuery::for_entity(self.catalog(), entity_type, LAZY_ALIAS)?.where_eq(column, value);
        self.execute(&query).await
    }

    /// Load the body of a placeholder. No-op for initialized entities.
    pub async fn initialize(&self, entity: &EntityRef) -> MapperResult<()> {
        if entity.is_initialized() {
            return Ok(());
        }
        debug!(entity = %entity.entity_type(), id = %entity.id(), "Initializing placeholder");
        let meta = self.schema.entity(entity.entity_type())?;
        let query = SelectQuery::for_entity(self.catalog(), entity.entity_type(), LAZY_ALIAS)?
            .where_eq(meta.identifier.clone(), meta.identifier_type.to_database(entity.id())?);
        self.execute(&query).await?;

        if entity.is_initialized() {
            Ok(())
        } else {
            Err(MapperError::not_found(entity.entity_type(), entity.id()))
        }
    }

    /// Read a column, loading the entity first when needed.
    pub async fn field(&self, entity: &EntityRef, field: &str) -> MapperResult<Value> {
        let meta = self.schema.entity(entity.entity_type())?;
        if meta.identifier == field {
            return meta.identifier_type.to_database(entity.id());
        }
        if !meta.has_column(field) {
            return Err(MapperError::unknown_field(entity.entity_type(), field));
        }
        self.initialize(entity).await?;
        Ok(entity.get_value(field).unwrap_or(Value::Null))
    }

    /// Read a to-one association, loading the owning entity first when needed.
    ///
    /// The returned entity may itself be a placeholder.
    pub async fn reference(&self, entity: &EntityRef, field: &str) -> MapperResult<Option<EntityRef>> {
        let assoc = self.schema.association(entity.entity_type(), field)?;
        if !assoc.is_to_one() {
            return Err(MapperError::invalid_mapping(
                entity.entity_type(),
                format!("`{}` is a {} association", field, assoc.kind),
            )
            .with_field(field));
        }
        self.initialize(entity).await?;
        Ok(entity.get_reference(field).flatten())
    }

    /// Read a to-many association, loading the collection when it is not
    /// initialized yet. Local additions are kept.
    pub async fn collection(&self, entity: &EntityRef, field: &str) -> MapperResult<Vec<EntityRef>> {
        let assoc = self.schema.association(entity.entity_type(), field)?.clone();
        if !assoc.is_to_many() {
            return Err(MapperError::invalid_mapping(
                entity.entity_type(),
                format!("`{}` is a {} association", field, assoc.kind),
            )
            .with_field(field));
        }
        self.initialize(entity).await?;

        let collection = entity.collection_or_default(field);
        if collection.is_initialized() {
            return Ok(collection.items());
        }

        let owner = self.schema.entity(entity.entity_type())?;
        let owner_id = owner.identifier_type.to_database(entity.id())?;
        let target = self.schema.entity(&assoc.target)?;
        let mut query = SelectQuery::for_entity(self.catalog(), &assoc.target, LAZY_ALIAS)?;

        query = match assoc.kind {
            AssociationKind::OneToMany => {
                let mapped_by = self.schema.mapped_inverse_field(entity.entity_type(), field)?;
                let owning = self.schema.association(&assoc.target, &mapped_by)?;
                let column = owning.join_column.clone().ok_or_else(|| {
                    MapperError::invalid_mapping(assoc.target.as_str(), "owning side without join column")
                })?;
                query.where_eq(column, owner_id)
            }
            _ => {
                let junction = assoc.junction.clone().ok_or_else(|| {
                    MapperError::invalid_mapping(entity.entity_type(), "association has no junction table")
                        .with_field(field)
                })?;
                query.through(JunctionFilter {
                    junction,
                    target_identifier: target.identifier.clone(),
                    source_id: owner_id,
                })
            }
        };
        for order in &assoc.order_by {
            query = query.order_by(order.clone());
        }

        let loaded = self.execute(&query).await?;
        collection.restore(loaded);
        Ok(collection.items())
    }

    /// Detach every managed entity and empty the identity map.
    pub fn clear(&self) {
        for entity in self.identity_map.drain() {
            entity.detach();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("entities", &self.schema.len())
            .field("managed", &self.identity_map.len())
            .finish()
    }
}
