//! Preventive fetch joins.
//!
//! Hydrating a row issues a secondary query for every to-one association
//! whose target cannot be represented by a placeholder: inverse sides (the
//! foreign key lives on the other table) and polymorphic targets (the
//! concrete type is only known from the row). Joining those associations
//! into the query that loads the row removes the per-row queries.

use prax_mapper::{FetchJoin, MetadataCatalog, SelectQuery};
use smol_str::SmolStr;
use std::collections::HashMap;
use tracing::trace;

use crate::error::{PreloadError, PreloadResult};

/// How often each `(type, field)` was joined while building one query.
pub type JoinCounts = HashMap<(SmolStr, SmolStr), usize>;

/// Add fetch joins under `alias` for the to-one associations of
/// `entity_type` that would otherwise be loaded row by row, recursing into
/// each joined target.
///
/// `seen` is shared by the whole recursion, so `max_depth` bounds the joins
/// of one `(type, field)` per query, which also terminates self-references.
pub fn add_preventive_joins(
    catalog: &dyn MetadataCatalog,
    query: &mut SelectQuery,
    alias: &str,
    entity_type: &str,
    max_depth: usize,
    seen: &mut JoinCounts,
) -> PreloadResult<()> {
    let associations = catalog
        .associations(entity_type)
        .map_err(PreloadError::catalog)?;

    for assoc in associations {
        if !assoc.is_to_one() {
            continue;
        }

        let key = (SmolStr::new(entity_type), assoc.field.clone());
        if seen.get(&key).copied().unwrap_or(0) >= max_depth {
            continue;
        }

        let polymorphic = catalog
            .has_subclasses(&assoc.target)
            .map_err(PreloadError::catalog)?;
        if !assoc.is_inverse_side() && !polymorphic {
            continue;
        }

        let join = FetchJoin::for_association(catalog, alias, assoc).map_err(PreloadError::catalog)?;
        let join_alias = join.alias.clone();
        trace!(entity = %entity_type, field = %assoc.field, alias = %join_alias, "Adding preventive join");
        query.left_join(join);
        *seen.entry(key).or_insert(0) += 1;

        add_preventive_joins(catalog, query, &join_alias, &assoc.target, max_depth, seen)?;
    }

    Ok(())
}
