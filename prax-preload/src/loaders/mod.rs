//! Relation loaders, one per cardinality.

mod many_to_many;
mod one_to_many;
mod to_one;

use indexmap::IndexMap;
use prax_mapper::{EntityId, EntityRef, MetadataCatalog, RelationCollection, Session};
use smol_str::SmolStr;
use std::sync::Arc;
use tracing::trace;

use crate::classify::{Cardinality, ClassifiedRelation};
use crate::error::{PreloadError, PreloadResult};
use crate::reconcile::TargetSet;

/// Everything one loader run needs.
pub(crate) struct LoadContext<'a> {
    pub session: &'a Session,
    pub relation: &'a ClassifiedRelation,
    pub entity_batch_size: usize,
    pub collection_batch_size: usize,
    pub max_join_depth: usize,
}

impl LoadContext<'_> {
    pub fn catalog(&self) -> &dyn MetadataCatalog {
        self.session.catalog()
    }
}

/// Load the relation for already materialized roots and return the
/// distinct targets.
pub(crate) async fn load(ctx: &LoadContext<'_>, roots: &[EntityRef]) -> PreloadResult<Vec<EntityRef>> {
    match ctx.relation.cardinality {
        Cardinality::ToOne => to_one::load(ctx, roots).await,
        Cardinality::OneToMany => one_to_many::load(ctx, roots).await,
        Cardinality::ManyToMany => many_to_many::load(ctx, roots).await,
    }
}

/// Collections still to be loaded, keyed by owner identifier.
type Pending = IndexMap<SmolStr, (EntityId, Arc<RelationCollection>)>;

/// Split the roots' collections into those needing a query and those whose
/// contents are used as they are.
///
/// Initialized and dirty collections contribute their current items to
/// `targets` without a query.
fn pending_collections(
    ctx: &LoadContext<'_>,
    roots: &[EntityRef],
    targets: &mut TargetSet,
) -> PreloadResult<Pending> {
    let accessor = ctx
        .catalog()
        .field_accessor(ctx.relation.source(), ctx.relation.field())
        .map_err(PreloadError::catalog)?;

    let mut pending = Pending::new();
    for root in roots {
        let collection = accessor.collection(root).map_err(PreloadError::catalog)?;
        if collection.is_initialized() || collection.is_dirty() {
            if collection.is_dirty() {
                trace!(
                    entity = %root.entity_type(),
                    id = %root.id(),
                    field = %ctx.relation.field(),
                    "Skipping dirty collection"
                );
            }
            for item in collection.items() {
                targets.insert(ctx.session, item)?;
            }
            continue;
        }
        pending
            .entry(root.id().key())
            .or_insert_with(|| (root.id().clone(), collection));
    }
    Ok(pending)
}
