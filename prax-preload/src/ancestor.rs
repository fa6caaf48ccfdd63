//! Common ancestor resolution for heterogeneous roots.

use prax_mapper::{EntityRef, MetadataCatalog};
use smol_str::SmolStr;

use crate::error::{PreloadError, PreloadResult};

/// Find the most specific type every entity is an instance of.
///
/// Starts from the concrete type of the first entity and walks up the parent
/// chain until each following entity is a subtype of the candidate. Returns
/// `None` for an empty slice.
pub fn resolve_common_ancestor(
    catalog: &dyn MetadataCatalog,
    entities: &[EntityRef],
) -> PreloadResult<Option<SmolStr>> {
    let Some(first) = entities.first() else {
        return Ok(None);
    };

    let mut candidate: SmolStr = catalog
        .entity(first.entity_type())
        .map_err(PreloadError::catalog)?
        .name
        .clone();

    for entity in &entities[1..] {
        let ty = entity.entity_type();
        while !catalog.is_subtype_of(ty, &candidate) {
            match catalog.parent_type(&candidate).map_err(PreloadError::catalog)? {
                Some(parent) => candidate = SmolStr::new(parent),
                None => {
                    return Err(PreloadError::NoCommonAncestor {
                        first: first.entity_type().to_string(),
                        other: ty.to_string(),
                    });
                }
            }
        }
    }

    Ok(Some(candidate))
}
