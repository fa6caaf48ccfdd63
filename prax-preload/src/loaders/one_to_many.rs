//! One-to-many loader.

use prax_mapper::EntityRef;
use tracing::debug;

use super::{LoadContext, pending_collections};
use crate::classify::inverse_field;
use crate::error::{PreloadError, PreloadResult};
use crate::materialize::{database_ids, load_entities_by};
use crate::reconcile::{TargetSet, finalize_collections};

/// Load one-to-many collections through the foreign key of the owning
/// association on the target, one query per chunk of owners.
pub(super) async fn load(ctx: &LoadContext<'_>, roots: &[EntityRef]) -> PreloadResult<Vec<EntityRef>> {
    let catalog = ctx.catalog();
    let relation = ctx.relation;

    let inverse = inverse_field(catalog, relation)?;
    let owning = catalog
        .association(relation.target(), &inverse)
        .map_err(PreloadError::catalog)?;
    let foreign_key = owning.join_column.clone().ok_or_else(|| {
        PreloadError::invariant(format!(
            "`{}.{}` owns `{}.{}` but has no join column",
            relation.target(),
            inverse,
            relation.source(),
            relation.field()
        ))
    })?;
    let owner_of = catalog
        .field_accessor(relation.target(), &inverse)
        .map_err(PreloadError::catalog)?;
    let source = catalog.entity(relation.source()).map_err(PreloadError::catalog)?;
    let param_type = source.identifier_type.array_parameter_type();

    let mut targets = TargetSet::new();
    let pending = pending_collections(ctx, roots, &mut targets)?;
    let owners: Vec<_> = pending.values().map(|(id, _)| id).collect();

    for chunk in owners.chunks(ctx.collection_batch_size) {
        debug!(
            entity = %relation.source(),
            field = %relation.field(),
            chunk = chunk.len(),
            "Loading one-to-many chunk"
        );
        let values = database_ids(source, chunk.iter().copied())?;
        let loaded = load_entities_by(
            ctx.session,
            relation.target(),
            &foreign_key,
            values,
            param_type,
            ctx.max_join_depth,
            relation.order_by(),
        )
        .await?;

        for entity in loaded {
            let entity = targets.insert(ctx.session, entity)?;
            let Some(owner) = owner_of.reference(&entity).map_err(PreloadError::catalog)? else {
                continue;
            };
            if let Some((_, collection)) = pending.get(&owner.id().key()) {
                collection.push_loaded(entity);
            }
        }
    }

    finalize_collections(pending.values().map(|(_, c)| c));
    Ok(targets.into_vec())
}
