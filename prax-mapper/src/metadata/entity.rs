//! Per-type entity metadata.

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::association::AssociationMapping;
use crate::value::IdentifierType;

/// Name of the discriminator column used by single-table inheritance.
pub const DISCRIMINATOR_COLUMN: &str = "dtype";

/// Metadata for one entity type.
///
/// Built with the fluent methods below and then registered on a
/// [`SchemaBuilder`](super::SchemaBuilder). Once the schema is built,
/// `table`, `columns` and `associations` include everything inherited from
/// parent types, and the hierarchy fields (`root`, `subclasses`,
/// `discriminator_values`) are populated.
#[derive(Debug, Clone)]
pub struct EntityMetadata {
    /// Entity type name.
    pub name: SmolStr,
    /// Storage table. Subtypes share the table of their hierarchy root.
    pub table: SmolStr,
    /// Direct parent type, if any.
    pub parent: Option<SmolStr>,
    /// Abstract types never appear as concrete rows.
    pub is_abstract: bool,
    /// Identifier field name.
    pub identifier: SmolStr,
    /// Storage type of the identifier.
    pub identifier_type: IdentifierType,
    /// Scalar columns, excluding the identifier.
    pub columns: Vec<SmolStr>,
    /// Associations keyed by field name, in declaration order.
    pub associations: IndexMap<SmolStr, AssociationMapping>,
    /// Value stored in the discriminator column for rows of this type.
    pub discriminator_value: SmolStr,
    /// Hierarchy root type.
    pub root: SmolStr,
    /// Direct subtypes.
    pub subclasses: Vec<SmolStr>,
    /// Discriminator values of this type and all of its descendants.
    pub discriminator_values: Vec<SmolStr>,
    /// Whether the table carries a discriminator column.
    pub uses_discriminator: bool,
}

impl EntityMetadata {
    /// Create metadata for an entity type with an integer `id` identifier.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        let name = name.into();
        Self {
            discriminator_value: SmolStr::new(to_snake_case(&name)),
            root: name.clone(),
            name,
            table: SmolStr::default(),
            parent: None,
            is_abstract: false,
            identifier: SmolStr::new_static("id"),
            identifier_type: IdentifierType::Integer,
            columns: Vec::new(),
            associations: IndexMap::new(),
            subclasses: Vec::new(),
            discriminator_values: Vec::new(),
            uses_discriminator: false,
        }
    }

    /// Set the storage table.
    pub fn table(mut self, table: impl Into<SmolStr>) -> Self {
        self.table = table.into();
        self
    }

    /// Declare the parent type.
    pub fn extends(mut self, parent: impl Into<SmolStr>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Mark the type as abstract.
    pub fn abstract_entity(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Set the identifier field and its storage type.
    pub fn identifier(mut self, field: impl Into<SmolStr>, ty: IdentifierType) -> Self {
        self.identifier = field.into();
        self.identifier_type = ty;
        self
    }

    /// Add a scalar column.
    pub fn column(mut self, name: impl Into<SmolStr>) -> Self {
        self.columns.push(name.into());
        self
    }

    /// Add an association.
    pub fn association(mut self, mapping: AssociationMapping) -> Self {
        self.associations.insert(mapping.field.clone(), mapping);
        self
    }

    /// Set the discriminator value.
    pub fn discriminator(mut self, value: impl Into<SmolStr>) -> Self {
        self.discriminator_value = value.into();
        self
    }

    /// Look up an association by field name.
    pub fn get_association(&self, field: &str) -> Option<&AssociationMapping> {
        self.associations.get(field)
    }

    /// Check if a scalar column is mapped.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Check if this type is the root of its hierarchy.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Convert `camelCase` or `PascalCase` to `snake_case`.
pub(crate) fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
