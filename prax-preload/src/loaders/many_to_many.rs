//! Many-to-many loader.

use indexmap::IndexMap;
use prax_mapper::{EntityId, EntityRef, PairQuery};
use smol_str::SmolStr;
use tracing::{debug, warn};

use super::{LoadContext, pending_collections};
use crate::error::{PreloadError, PreloadResult};
use crate::materialize::{database_ids, load_by_identifiers};
use crate::reconcile::{TargetSet, finalize_collections};

/// Load many-to-many collections, owning or inverse side.
///
/// Per chunk of owners the junction is read as `(source, target)` pairs,
/// then only the targets not yet initialized are loaded by identifier.
pub(super) async fn load(ctx: &LoadContext<'_>, roots: &[EntityRef]) -> PreloadResult<Vec<EntityRef>> {
    let catalog = ctx.catalog();
    let relation = ctx.relation;
    let session = ctx.session;

    let source = catalog.entity(relation.source()).map_err(PreloadError::catalog)?;
    let param_type = source.identifier_type.array_parameter_type();

    let mut targets = TargetSet::new();
    let pending = pending_collections(ctx, roots, &mut targets)?;
    let owners: Vec<_> = pending.values().map(|(id, _)| id).collect();

    for chunk in owners.chunks(ctx.collection_batch_size) {
        let values = database_ids(source, chunk.iter().copied())?;
        let query = PairQuery::for_association(catalog, &relation.mapping, values, param_type)
            .map_err(PreloadError::catalog)?;
        debug!(
            entity = %relation.source(),
            field = %relation.field(),
            chunk = chunk.len(),
            "Loading many-to-many pairs"
        );
        let pairs = session.execute_pairs(&query).await?;

        let mut queued: IndexMap<SmolStr, EntityId> = IndexMap::new();
        for (_, target_id) in &pairs {
            let managed = session
                .try_get_by_id(relation.target(), target_id)
                .map_err(PreloadError::catalog)?;
            if !managed.is_some_and(|e| e.is_initialized()) {
                queued
                    .entry(target_id.key())
                    .or_insert_with(|| target_id.clone());
            }
        }

        if !queued.is_empty() {
            let ids: Vec<EntityId> = queued.into_values().collect();
            load_by_identifiers(
                session,
                relation.target(),
                &ids,
                ctx.entity_batch_size,
                ctx.max_join_depth,
            )
            .await?;
        }

        for (source_id, target_id) in &pairs {
            let target = session
                .try_get_by_id(relation.target(), target_id)
                .map_err(PreloadError::catalog)?
                .filter(|e| e.is_initialized());
            let Some(target) = target else {
                warn!(
                    entity = %relation.target(),
                    id = %target_id,
                    field = %relation.field(),
                    "Linked entity missing after load, skipping"
                );
                continue;
            };
            let target = targets.insert(session, target)?;
            if let Some((_, collection)) = pending.get(&source_id.key()) {
                collection.push_loaded(target);
            }
        }
    }

    finalize_collections(pending.values().map(|(_, c)| c));
    Ok(targets.into_vec())
}
