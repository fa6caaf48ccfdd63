//! Entity and association metadata.
//!
//! [`MetadataCatalog`] is the read-only view consumers use to inspect types,
//! inheritance and associations. [`Schema`] is the in-process implementation,
//! assembled with [`SchemaBuilder`].
//!
//! ```rust
//! use prax_mapper::metadata::{AssociationMapping, EntityMetadata, MetadataCatalog, Schema};
//!
//! let schema = Schema::builder()
//!     .entity(
//!         EntityMetadata::new("Category")
//!             .column("name")
//!             .association(AssociationMapping::one_to_many("articles", "Article").mapped_by("category")),
//!     )
//!     .entity(
//!         EntityMetadata::new("Article")
//!             .column("title")
//!             .association(AssociationMapping::many_to_one("category", "Category").inversed_by("articles")),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let category = schema.association("Article", "category").unwrap();
//! assert_eq!(category.join_column.as_deref(), Some("category_id"));
//! ```

mod accessor;
mod association;
mod entity;
mod schema;

pub use accessor::{FieldAccessor, FieldKind};
pub use association::{AssociationKind, AssociationMapping, JunctionTable};
pub use entity::{DISCRIMINATOR_COLUMN, EntityMetadata};
pub use schema::{Schema, SchemaBuilder};

use smol_str::SmolStr;

use crate::error::{MapperError, MapperResult};

/// Read-only access to entity metadata.
///
/// Only [`entity`](Self::entity) is required; every other lookup is derived
/// from the resolved [`EntityMetadata`].
pub trait MetadataCatalog: Send + Sync {
    /// Get the metadata of an entity type.
    fn entity(&self, name: &str) -> MapperResult<&EntityMetadata>;

    /// Get the direct parent of an entity type.
    fn parent_type(&self, name: &str) -> MapperResult<Option<&str>> {
        Ok(self.entity(name)?.parent.as_deref())
    }

    /// Check if `name` is `ancestor` or inherits from it.
    fn is_subtype_of(&self, name: &str, ancestor: &str) -> bool {
        let mut current = Some(name);
        while let Some(ty) = current {
            if ty == ancestor {
                return true;
            }
            current = match self.parent_type(ty) {
                Ok(parent) => parent,
                Err(_) => return false,
            };
        }
        false
    }

    /// Get the root of the inheritance hierarchy of an entity type.
    fn root_type(&self, name: &str) -> MapperResult<&str> {
        Ok(self.entity(name)?.root.as_str())
    }

    /// Check if any type inherits from this one.
    fn has_subclasses(&self, name: &str) -> MapperResult<bool> {
        Ok(!self.entity(name)?.subclasses.is_empty())
    }

    /// Get one association mapping, inherited ones included.
    fn association(&self, entity: &str, field: &str) -> MapperResult<&AssociationMapping> {
        self.entity(entity)?
            .get_association(field)
            .ok_or_else(|| MapperError::unknown_field(entity, field))
    }

    /// Get all association mappings in declaration order, inherited first.
    fn associations(&self, entity: &str) -> MapperResult<Vec<&AssociationMapping>> {
        Ok(self.entity(entity)?.associations.values().collect())
    }

    /// Get the accessor for the identifier field.
    fn identifier_field(&self, entity: &str) -> MapperResult<FieldAccessor> {
        let meta = self.entity(entity)?;
        Ok(FieldAccessor::new(
            meta.name.clone(),
            meta.identifier.clone(),
            FieldKind::Identifier,
        ))
    }

    /// Get the accessor for any mapped field.
    fn field_accessor(&self, entity: &str, field: &str) -> MapperResult<FieldAccessor> {
        let meta = self.entity(entity)?;
        let kind = if meta.identifier == field {
            FieldKind::Identifier
        } else if meta.has_column(field) {
            FieldKind::Column
        } else {
            match meta.get_association(field) {
                Some(assoc) if assoc.is_to_one() => FieldKind::Reference,
                Some(_) => FieldKind::Collection,
                None => return Err(MapperError::unknown_field(entity, field)),
            }
        };
        Ok(FieldAccessor::new(meta.name.clone(), field, kind))
    }

    /// Get the field on the target type mapping the other side of an
    /// association.
    fn mapped_inverse_field(&self, entity: &str, field: &str) -> MapperResult<SmolStr> {
        let assoc = self.association(entity, field)?;
        assoc
            .mapped_by
            .clone()
            .or_else(|| assoc.inversed_by.clone())
            .ok_or_else(|| {
                MapperError::invalid_mapping(entity, format!("`{}` is unidirectional", field))
                    .with_field(field)
            })
    }
}
