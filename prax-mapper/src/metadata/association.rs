//! Association mappings between entity types.

use smol_str::SmolStr;

use crate::types::OrderByField;

/// Kind of association between entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssociationKind {
    /// One-to-one association (e.g., Bot has one active PromptVersion).
    OneToOne,
    /// Many-to-one association (e.g., Article belongs to Category).
    ManyToOne,
    /// One-to-many association (e.g., Category has many Articles).
    OneToMany,
    /// Many-to-many association (e.g., Article has many Tags).
    ManyToMany,
    /// Collection of embedded values rather than entities.
    ElementCollection,
}

impl AssociationKind {
    /// Check if this association points to a single entity.
    pub fn is_to_one(&self) -> bool {
        matches!(self, Self::OneToOne | Self::ManyToOne)
    }

    /// Check if this association holds a collection of entities.
    pub fn is_to_many(&self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }

    /// Get a human-readable name for the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneToOne => "one-to-one",
            Self::ManyToOne => "many-to-one",
            Self::OneToMany => "one-to-many",
            Self::ManyToMany => "many-to-many",
            Self::ElementCollection => "element collection",
        }
    }
}

impl std::fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Junction table of a many-to-many association, seen from one side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JunctionTable {
    /// Name of the junction table.
    pub table: SmolStr,
    /// Column referencing the entity that declares the association.
    pub source_column: SmolStr,
    /// Column referencing the associated entity.
    pub target_column: SmolStr,
}

impl JunctionTable {
    /// Create a junction table description.
    pub fn new(
        table: impl Into<SmolStr>,
        source_column: impl Into<SmolStr>,
        target_column: impl Into<SmolStr>,
    ) -> Self {
        Self {
            table: table.into(),
            source_column: source_column.into(),
            target_column: target_column.into(),
        }
    }

    /// The same junction seen from the other side of the association.
    pub fn swapped(&self) -> Self {
        Self {
            table: self.table.clone(),
            source_column: self.target_column.clone(),
            target_column: self.source_column.clone(),
        }
    }
}

/// Mapping of one named association on an entity type.
///
/// Mappings are immutable once the [`Schema`](super::Schema) is built. Missing
/// join columns and junction tables are filled in with defaults at build time.
#[derive(Debug, Clone)]
pub struct AssociationMapping {
    /// Field name on the declaring entity.
    pub field: SmolStr,
    /// Association kind.
    pub kind: AssociationKind,
    /// Entity type declaring the association.
    pub source: SmolStr,
    /// Target entity type.
    pub target: SmolStr,
    /// Whether this side stores the foreign key or owns the junction rows.
    pub owning_side: bool,
    /// Field on the target that owns this association (inverse side only).
    pub mapped_by: Option<SmolStr>,
    /// Field on the target mapping the other side (owning side only).
    pub inversed_by: Option<SmolStr>,
    /// Foreign key column for owning to-one associations.
    pub join_column: Option<SmolStr>,
    /// Junction table for many-to-many associations.
    pub junction: Option<JunctionTable>,
    /// Ordering applied when the collection is loaded.
    pub order_by: Vec<OrderByField>,
    /// Field the collection is keyed by, if any.
    pub index_by: Option<SmolStr>,
}

impl AssociationMapping {
    fn new(field: impl Into<SmolStr>, kind: AssociationKind, target: impl Into<SmolStr>) -> Self {
        Self {
            field: field.into(),
            kind,
            source: SmolStr::default(),
            target: target.into(),
            owning_side: kind != AssociationKind::OneToMany,
            mapped_by: None,
            inversed_by: None,
            join_column: None,
            junction: None,
            order_by: Vec::new(),
            index_by: None,
        }
    }

    /// Create a one-to-one association. Owning unless [`mapped_by`](Self::mapped_by) is set.
    pub fn one_to_one(field: impl Into<SmolStr>, target: impl Into<SmolStr>) -> Self {
        Self::new(field, AssociationKind::OneToOne, target)
    }

    /// Create a many-to-one association.
    pub fn many_to_one(field: impl Into<SmolStr>, target: impl Into<SmolStr>) -> Self {
        Self::new(field, AssociationKind::ManyToOne, target)
    }

    /// Create a one-to-many association; always the inverse side.
    pub fn one_to_many(field: impl Into<SmolStr>, target: impl Into<SmolStr>) -> Self {
        Self::new(field, AssociationKind::OneToMany, target)
    }

    /// Create a many-to-many association. Owning unless [`mapped_by`](Self::mapped_by) is set.
    pub fn many_to_many(field: impl Into<SmolStr>, target: impl Into<SmolStr>) -> Self {
        Self::new(field, AssociationKind::ManyToMany, target)
    }

    /// Create an element collection.
    pub fn element_collection(field: impl Into<SmolStr>, target: impl Into<SmolStr>) -> Self {
        Self::new(field, AssociationKind::ElementCollection, target)
    }

    /// Mark this as the inverse side, owned by `field` on the target.
    pub fn mapped_by(mut self, field: impl Into<SmolStr>) -> Self {
        self.mapped_by = Some(field.into());
        self.owning_side = false;
        self
    }

    /// Name the inverse field on the target.
    pub fn inversed_by(mut self, field: impl Into<SmolStr>) -> Self {
        self.inversed_by = Some(field.into());
        self
    }

    /// Set the foreign key column.
    pub fn join_column(mut self, column: impl Into<SmolStr>) -> Self {
        self.join_column = Some(column.into());
        self
    }

    /// Set the junction table.
    pub fn junction(mut self, junction: JunctionTable) -> Self {
        self.junction = Some(junction);
        self
    }

    /// Append an ordering column.
    pub fn order_by(mut self, field: OrderByField) -> Self {
        self.order_by.push(field);
        self
    }

    /// Key the collection by a field of the target.
    pub fn index_by(mut self, field: impl Into<SmolStr>) -> Self {
        self.index_by = Some(field.into());
        self
    }

    /// Check if this association points to a single entity.
    pub fn is_to_one(&self) -> bool {
        self.kind.is_to_one()
    }

    /// Check if this association holds a collection of entities.
    pub fn is_to_many(&self) -> bool {
        self.kind.is_to_many()
    }

    /// Check if this is the inverse side of a bidirectional association.
    pub fn is_inverse_side(&self) -> bool {
        !self.owning_side
    }
}
