//! Relation classification.

use prax_mapper::{AssociationKind, AssociationMapping, MetadataCatalog, OrderByField};
use smol_str::SmolStr;
use std::fmt;

use crate::error::{PreloadError, PreloadResult, RelationShape};

/// How many entities sit on the far side of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// One-to-one or many-to-one.
    ToOne,
    /// One-to-many, always the inverse side.
    OneToMany,
    /// Many-to-many, either side.
    ManyToMany,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToOne => write!(f, "to-one"),
            Self::OneToMany => write!(f, "one-to-many"),
            Self::ManyToMany => write!(f, "many-to-many"),
        }
    }
}

/// A relation the preloader knows how to load.
#[derive(Debug, Clone)]
pub struct ClassifiedRelation {
    /// Cardinality of the relation.
    pub cardinality: Cardinality,
    /// The mapping, as declared on the source type.
    pub mapping: AssociationMapping,
}

impl ClassifiedRelation {
    /// Field name on the source type.
    pub fn field(&self) -> &str {
        &self.mapping.field
    }

    /// Type the relation was resolved on.
    pub fn source(&self) -> &str {
        &self.mapping.source
    }

    /// Declared target type.
    pub fn target(&self) -> &str {
        &self.mapping.target
    }

    /// Whether the source type holds the foreign key or owns the junction.
    pub fn owning_side(&self) -> bool {
        self.mapping.owning_side
    }

    /// Ordering applied to loaded collections.
    pub fn order_by(&self) -> &[OrderByField] {
        &self.mapping.order_by
    }
}

/// Classify `relation` on `entity_type`.
///
/// Unsupported shapes are rejected here, before anything touches storage.
pub fn classify(
    catalog: &dyn MetadataCatalog,
    entity_type: &str,
    relation: &str,
) -> PreloadResult<ClassifiedRelation> {
    let meta = catalog.entity(entity_type).map_err(PreloadError::catalog)?;
    let mapping = meta
        .get_association(relation)
        .ok_or_else(|| PreloadError::unknown_relation(entity_type, relation))?;

    if mapping.index_by.is_some() {
        return Err(PreloadError::unsupported_shape(
            entity_type,
            relation,
            RelationShape::Indexed,
        ));
    }

    let cardinality = match mapping.kind {
        AssociationKind::OneToOne | AssociationKind::ManyToOne => Cardinality::ToOne,
        AssociationKind::OneToMany => Cardinality::OneToMany,
        AssociationKind::ManyToMany => Cardinality::ManyToMany,
        AssociationKind::ElementCollection => {
            return Err(PreloadError::UnsupportedRelationKind {
                entity: entity_type.to_string(),
                relation: relation.to_string(),
                kind: mapping.kind.to_string(),
            });
        }
    };

    if cardinality == Cardinality::ManyToMany && !mapping.order_by.is_empty() {
        return Err(PreloadError::unsupported_shape(
            entity_type,
            relation,
            RelationShape::OrderedManyToMany,
        ));
    }

    catalog.entity(&mapping.target).map_err(|e| {
        PreloadError::MappingInvariantViolation {
            message: format!(
                "target `{}` of `{}.{}` is not mapped",
                mapping.target, entity_type, relation
            ),
            source: Some(e),
        }
    })?;

    Ok(ClassifiedRelation {
        cardinality,
        mapping: mapping.clone(),
    })
}

/// The field on the target type that maps the other side of `relation`.
pub(crate) fn inverse_field(
    catalog: &dyn MetadataCatalog,
    relation: &ClassifiedRelation,
) -> PreloadResult<SmolStr> {
    catalog
        .mapped_inverse_field(relation.source(), relation.field())
        .map_err(PreloadError::catalog)
}
