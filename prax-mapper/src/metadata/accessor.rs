//! Typed field accessors.

use smol_str::SmolStr;
use std::sync::Arc;

use crate::entity::{Entity, EntityRef, RelationCollection};
use crate::error::{MapperError, MapperResult};
use crate::value::{EntityId, Value};

/// What a mapped field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// The identifier.
    Identifier,
    /// A scalar column.
    Column,
    /// A to-one association.
    Reference,
    /// A to-many association.
    Collection,
}

/// Reads one mapped field off entities of a given type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAccessor {
    /// Entity type the field belongs to.
    pub owner: SmolStr,
    /// Field name.
    pub field: SmolStr,
    /// Field kind.
    pub kind: FieldKind,
}

impl FieldAccessor {
    /// Create an accessor.
    pub fn new(owner: impl Into<SmolStr>, field: impl Into<SmolStr>, kind: FieldKind) -> Self {
        Self {
            owner: owner.into(),
            field: field.into(),
            kind,
        }
    }

    fn expect(&self, kind: FieldKind) -> MapperResult<()> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(MapperError::invalid_mapping(
                self.owner.as_str(),
                format!("`{}` is a {:?} field, not {:?}", self.field, self.kind, kind),
            )
            .with_field(self.field.as_str()))
        }
    }

    /// Read the identifier.
    pub fn identifier(&self, entity: &Entity) -> MapperResult<EntityId> {
        self.expect(FieldKind::Identifier)?;
        Ok(entity.id().clone())
    }

    /// Read a scalar column. Returns [`Value::Null`] when not populated.
    pub fn value(&self, entity: &Entity) -> MapperResult<Value> {
        self.expect(FieldKind::Column)?;
        Ok(entity.get_value(&self.field).unwrap_or(Value::Null))
    }

    /// Read a to-one association without triggering a load.
    pub fn reference(&self, entity: &Entity) -> MapperResult<Option<EntityRef>> {
        self.expect(FieldKind::Reference)?;
        Ok(entity.get_reference(&self.field).flatten())
    }

    /// Get the collection of a to-many association, creating it when missing.
    pub fn collection(&self, entity: &Entity) -> MapperResult<Arc<RelationCollection>> {
        self.expect(FieldKind::Collection)?;
        Ok(entity.collection_or_default(&self.field))
    }
}
