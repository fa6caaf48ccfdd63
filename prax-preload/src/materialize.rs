//! Batched placeholder materialization.

use indexmap::IndexMap;
use prax_mapper::{
    ArrayParameterType, EntityId, EntityMetadata, EntityRef, OrderByField, SelectQuery, Session,
    Value,
};
use smol_str::SmolStr;
use tracing::debug;

use crate::error::{PreloadError, PreloadResult};
use crate::joins::{JoinCounts, add_preventive_joins};

/// Alias of the entity a preload query selects.
pub(crate) const ROOT_ALIAS: &str = "e";

/// Load the bodies of every uninitialized placeholder in `entities`.
///
/// Placeholders are filled in place through the identity map, one query per
/// `batch_size` identifiers. Returns the entities deduplicated by identifier
/// in first-seen order. Issues no query when every entity is initialized.
pub async fn materialize(
    session: &Session,
    entity_type: &str,
    entities: &[EntityRef],
    batch_size: usize,
    max_join_depth: usize,
) -> PreloadResult<Vec<EntityRef>> {
    let mut unique: IndexMap<SmolStr, EntityRef> = IndexMap::with_capacity(entities.len());
    for entity in entities {
        unique
            .entry(entity.id().key())
            .or_insert_with(|| entity.clone());
    }

    let uninitialized: Vec<EntityId> = unique
        .values()
        .filter(|e| session.is_uninitialized(e))
        .map(|e| e.id().clone())
        .collect();

    if !uninitialized.is_empty() {
        load_by_identifiers(session, entity_type, &uninitialized, batch_size, max_join_depth).await?;
    }

    Ok(unique.into_values().collect())
}

/// Load entities of `entity_type` by identifier, `batch_size` per query.
pub async fn load_by_identifiers(
    session: &Session,
    entity_type: &str,
    ids: &[EntityId],
    batch_size: usize,
    max_join_depth: usize,
) -> PreloadResult<Vec<EntityRef>> {
    let meta = session.catalog().entity(entity_type).map_err(PreloadError::catalog)?;
    let param_type = meta.identifier_type.array_parameter_type();

    let mut loaded = Vec::with_capacity(ids.len());
    for chunk in ids.chunks(batch_size) {
        let values = database_ids(meta, chunk)?;
        loaded.extend(
            load_entities_by(
                session,
                entity_type,
                &meta.identifier,
                values,
                param_type,
                max_join_depth,
                &[],
            )
            .await?,
        );
    }
    Ok(loaded)
}

/// Issue one `SELECT` of `entity_type` filtered by `column IN (values)`, with
/// preventive joins and the given ordering.
pub(crate) async fn load_entities_by(
    session: &Session,
    entity_type: &str,
    column: &str,
    values: Vec<Value>,
    param_type: ArrayParameterType,
    max_join_depth: usize,
    order_by: &[OrderByField],
) -> PreloadResult<Vec<EntityRef>> {
    let catalog = session.catalog();
    let chunk_size = values.len();

    let mut query = SelectQuery::for_entity(catalog, entity_type, ROOT_ALIAS)
        .map_err(PreloadError::catalog)?
        .where_in(column, values, param_type);
    add_preventive_joins(
        catalog,
        &mut query,
        ROOT_ALIAS,
        entity_type,
        max_join_depth,
        &mut JoinCounts::new(),
    )?;
    for field in order_by {
        query = query.order_by(field.clone());
    }

    debug!(entity = %entity_type, column = %column, chunk = chunk_size, joins = query.joins.len(), "Loading chunk");
    Ok(session.execute(&query).await?)
}

/// Convert identifiers to their database representation.
pub(crate) fn database_ids<'a>(
    meta: &EntityMetadata,
    ids: impl IntoIterator<Item = &'a EntityId>,
) -> PreloadResult<Vec<Value>> {
    ids.into_iter()
        .map(|id| meta.identifier_type.to_database(id).map_err(PreloadError::catalog))
        .collect()
}
