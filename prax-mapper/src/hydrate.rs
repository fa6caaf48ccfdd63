//! Row hydration.
//!
//! Rows are wired onto managed entities through the identity map: an
//! existing placeholder is filled in place, an initialized entity is returned
//! untouched, and only unknown identities allocate a new entity.
//!
//! To-one associations are resolved per row:
//!
//! - a fetch join present in the result hydrates the joined row,
//! - an owning side reuses the managed target or creates a placeholder,
//!   except for polymorphic targets, which are read with a secondary query
//!   because the concrete type is unknown,
//! - an inverse side has no foreign key on the row and is read with a
//!   secondary query.

use futures::future::BoxFuture;
use indexmap::IndexMap;
use smol_str::SmolStr;
use std::sync::Arc;
use tracing::trace;

use crate::entity::{Entity, EntityRef};
use crate::error::{MapperError, MapperResult};
use crate::identity::IdentityKey;
use crate::metadata::{AssociationMapping, DISCRIMINATOR_COLUMN, EntityMetadata, MetadataCatalog};
use crate::query::SelectQuery;
use crate::session::{LAZY_ALIAS, Session};
use crate::store::{ResultRow, Row};
use crate::value::{EntityId, Value};

impl Session {
    /// Hydrate one row, declared as `declared_type`, read under `alias`.
    ///
    /// `stack` holds the identities being hydrated further up, so a row that
    /// refers back to one of them resolves to the managed instance instead of
    /// recursing.
    pub(crate) fn hydrate_row<'a>(
        &'a self,
        declared_type: &'a str,
        alias: &'a str,
        row: &'a Row,
        result: &'a ResultRow,
        stack: &'a mut Vec<IdentityKey>,
    ) -> BoxFuture<'a, MapperResult<EntityRef>> {
        Box::pin(async move {
            let meta = self.concrete_type(declared_type, row)?;
            let id_value = row.get(&meta.identifier).ok_or_else(|| {
                MapperError::database(format!(
                    "row of `{}` has no `{}` column",
                    meta.table, meta.identifier
                ))
            })?;
            let id = meta.identifier_type.from_database(id_value)?;
            let key = IdentityKey::new(meta.root.clone(), id.key());

            let entity = self.identity_map().get_or_insert_with(key.clone(), || {
                Arc::new(Entity::placeholder(meta.name.clone(), id.clone()))
            });
            if entity.is_initialized() || stack.contains(&key) {
                return Ok(entity);
            }

            stack.push(key);
            let values: IndexMap<SmolStr, Value> = meta
                .columns
                .iter()
                .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(Value::Null)))
                .collect();

            let mut references = IndexMap::new();
            let mut collections = Vec::new();
            for assoc in meta.associations.values() {
                if assoc.is_to_one() {
                    let target = self
                        .resolve_to_one(&entity, assoc, alias, row, result, stack)
                        .await?;
                    references.insert(assoc.field.clone(), target);
                } else {
                    collections.push(assoc.field.clone());
                }
            }
            stack.pop();

            entity.hydrate(values, references, collections);
            Ok(entity)
        })
    }

    fn concrete_type(&self, declared_type: &str, row: &Row) -> MapperResult<&EntityMetadata> {
        let declared = self.schema().entity(declared_type)?;
        if !declared.uses_discriminator {
            return Ok(declared);
        }
        let dtype = row
            .get(DISCRIMINATOR_COLUMN)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                MapperError::database(format!("row of `{}` has no discriminator", declared.table))
            })?;
        let concrete = self
            .schema()
            .resolve_discriminator(&declared.root, dtype)
            .ok_or_else(|| {
                MapperError::invalid_mapping(
                    declared.root.as_str(),
                    format!("unknown discriminator value '{}'", dtype),
                )
            })?;
        if concrete.is_abstract {
            return Err(MapperError::invalid_mapping(
                concrete.name.as_str(),
                "row discriminated as an abstract type",
            ));
        }
        Ok(concrete)
    }

    async fn resolve_to_one(
        &self,
        owner: &EntityRef,
        assoc: &AssociationMapping,
        alias: &str,
        row: &Row,
        result: &ResultRow,
        stack: &mut Vec<IdentityKey>,
    ) -> MapperResult<Option<EntityRef>> {
        let join_alias = format!("{}_{}", alias, assoc.field);
        if result.has_join(&join_alias) {
            return match result.joined(&join_alias) {
                Some(joined) => Ok(Some(
                    self.hydrate_row(&assoc.target, &join_alias, joined, result, stack)
                        .await?,
                )),
                None => Ok(None),
            };
        }

        let target = self.schema().entity(&assoc.target)?;

        if assoc.owning_side {
            let column = assoc.join_column.as_deref().unwrap_or_default();
            let fk = match row.get(column) {
                Some(v) if !v.is_null() => v,
                _ => return Ok(None),
            };
            let target_id = target.identifier_type.from_database(fk)?;
            let key = IdentityKey::new(target.root.clone(), target_id.key());
            if let Some(existing) = self.identity_map().get(&key) {
                return Ok(Some(existing));
            }
            if target.is_abstract || !target.subclasses.is_empty() {
                trace!(entity = %assoc.target, field = %assoc.field, "Secondary fetch of polymorphic reference");
                let query = SelectQuery::for_entity(self.catalog(), &assoc.target, LAZY_ALIAS)?
                    .where_eq(target.identifier.clone(), fk.clone());
                return self.fetch_one(&query, stack).await;
            }
            return Ok(Some(self.identity_map().get_or_insert_with(key, || {
                Arc::new(Entity::placeholder(target.name.clone(), target_id))
            })));
        }

        let mapped_by = self.schema().mapped_inverse_field(&assoc.source, &assoc.field)?;
        let owning = self.schema().association(&assoc.target, &mapped_by)?;
        let column = owning.join_column.clone().ok_or_else(|| {
            MapperError::invalid_mapping(owning.source.as_str(), "owning side without join column")
        })?;
        trace!(entity = %assoc.target, field = %assoc.field, "Secondary fetch of inverse reference");
        let owner_id = self.id_value(owner.entity_type(), owner.id())?;
        let query = SelectQuery::for_entity(self.catalog(), &assoc.target, LAZY_ALIAS)?
            .where_eq(column, owner_id);
        self.fetch_one(&query, stack).await
    }

    async fn fetch_one(
        &self,
        query: &SelectQuery,
        stack: &mut Vec<IdentityKey>,
    ) -> MapperResult<Option<EntityRef>> {
        let rows = self.executor().select(query).await?;
        match rows.first() {
            Some(first) => Ok(Some(
                self.hydrate_row(&query.entity, &query.alias, &first.row, first, stack)
                    .await?,
            )),
            None => Ok(None),
        }
    }

    fn id_value(&self, entity_type: &str, id: &EntityId) -> MapperResult<Value> {
        self.schema().entity(entity_type)?.identifier_type.to_database(id)
    }
}
