//! To-one loader.

use prax_mapper::EntityRef;

use super::LoadContext;
use crate::error::{PreloadError, PreloadResult};
use crate::materialize::materialize;
use crate::reconcile::TargetSet;

pub(super) async fn load(ctx: &LoadContext<'_>, roots: &[EntityRef]) -> PreloadResult<Vec<EntityRef>> {
    let accessor = ctx
        .catalog()
        .field_accessor(ctx.relation.source(), ctx.relation.field())
        .map_err(PreloadError::catalog)?;

    let mut targets = TargetSet::new();
    for root in roots {
        if let Some(target) = accessor.reference(root).map_err(PreloadError::catalog)? {
            targets.insert(ctx.session, target)?;
        }
    }
    if targets.is_empty() {
        return Ok(Vec::new());
    }

    materialize(
        ctx.session,
        ctx.relation.target(),
        &targets.into_vec(),
        ctx.entity_batch_size,
        ctx.max_join_depth,
    )
    .await
}
