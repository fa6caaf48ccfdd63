//! Select queries and their SQL rendering.
//!
//! [`SelectQuery`] selects rows of one entity type, optionally with fetch
//! joins for to-one associations that are hydrated from the same row.
//! [`PairQuery`] projects `(source_id, target_id)` pairs out of a
//! many-to-many junction table without hydrating anything.
//!
//! ```rust
//! use prax_mapper::query::SelectQuery;
//! use prax_mapper::value::{ArrayParameterType, Value};
//!
//! let query = SelectQuery::new("Article", "article", "e").where_in(
//!     "category_id",
//!     vec![Value::Int(1), Value::Int(2)],
//!     ArrayParameterType::Integer,
//! );
//! assert_eq!(query.to_sql(), "SELECT * FROM article e WHERE e.category_id IN (?, ?)");
//! ```

use smol_str::SmolStr;
use std::fmt;

use crate::error::{MapperError, MapperResult};
use crate::metadata::{AssociationMapping, DISCRIMINATOR_COLUMN, JunctionTable, MetadataCatalog};
use crate::types::OrderByField;
use crate::value::{ArrayParameterType, Value};

/// A filter on the root alias of a [`SelectQuery`].
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column IN (...)`, bound as one typed array parameter.
    In {
        /// Column name.
        column: SmolStr,
        /// Values in the list.
        values: Vec<Value>,
        /// Binding type of the array parameter.
        param_type: ArrayParameterType,
    },
    /// `column = ?`.
    Eq {
        /// Column name.
        column: SmolStr,
        /// Bound value.
        value: Value,
    },
    /// `column IS NULL`.
    IsNull {
        /// Column name.
        column: SmolStr,
    },
}

/// A fetched `LEFT JOIN` of a to-one association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchJoin {
    /// Alias of the joined-from row.
    pub parent_alias: SmolStr,
    /// Association field on the parent.
    pub field: SmolStr,
    /// Alias of the joined row, `{parent_alias}_{field}`.
    pub alias: SmolStr,
    /// Declared target type.
    pub target: SmolStr,
    /// Table of the target.
    pub table: SmolStr,
    /// Column on the parent row.
    pub parent_column: SmolStr,
    /// Column on the joined row.
    pub target_column: SmolStr,
    /// Discriminator values accepted for the joined row; empty when the
    /// target is a hierarchy root.
    pub discriminator: Vec<SmolStr>,
}

impl FetchJoin {
    /// Build the join for a to-one association.
    ///
    /// Owning sides join on their foreign key; inverse sides join on the
    /// foreign key of the owning association on the target.
    pub fn for_association(
        catalog: &dyn MetadataCatalog,
        parent_alias: &str,
        assoc: &AssociationMapping,
    ) -> MapperResult<Self> {
        if !assoc.is_to_one() {
            return Err(MapperError::invalid_mapping(
                assoc.source.as_str(),
                format!("`{}` is a {} association and cannot be fetch-joined", assoc.field, assoc.kind),
            )
            .with_field(assoc.field.as_str()));
        }
        let parent = catalog.entity(&assoc.source)?;
        let target = catalog.entity(&assoc.target)?;

        let (parent_column, target_column) = if assoc.owning_side {
            let join_column = assoc.join_column.clone().ok_or_else(|| {
                MapperError::invalid_mapping(assoc.source.as_str(), "owning side without join column")
                    .with_field(assoc.field.as_str())
            })?;
            (join_column, target.identifier.clone())
        } else {
            let mapped_by = catalog.mapped_inverse_field(&assoc.source, &assoc.field)?;
            let owning = catalog.association(&assoc.target, &mapped_by)?;
            let join_column = owning.join_column.clone().ok_or_else(|| {
                MapperError::invalid_mapping(owning.source.as_str(), "owning side without join column")
                    .with_field(owning.field.as_str())
            })?;
            (parent.identifier.clone(), join_column)
        };

        Ok(Self {
            parent_alias: SmolStr::new(parent_alias),
            field: assoc.field.clone(),
            alias: SmolStr::new(format!("{}_{}", parent_alias, assoc.field)),
            target: target.name.clone(),
            table: target.table.clone(),
            parent_column,
            target_column,
            discriminator: if target.is_root() {
                Vec::new()
            } else {
                target.discriminator_values.clone()
            },
        })
    }
}

/// Restricts a [`SelectQuery`] to the targets linked to one source entity
/// through a junction table.
#[derive(Debug, Clone, PartialEq)]
pub struct JunctionFilter {
    /// Junction table, seen from the source side.
    pub junction: JunctionTable,
    /// Identifier column of the selected entity.
    pub target_identifier: SmolStr,
    /// Identifier of the source entity.
    pub source_id: Value,
}

/// A query selecting rows of one entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    /// Selected entity type.
    pub entity: SmolStr,
    /// Table of the entity type.
    pub table: SmolStr,
    /// Root alias.
    pub alias: SmolStr,
    /// Accepted discriminator values; empty for hierarchy roots.
    pub discriminator: Vec<SmolStr>,
    /// Fetch joins in the order they were added.
    pub joins: Vec<FetchJoin>,
    /// Junction restriction, if any.
    pub junction: Option<JunctionFilter>,
    /// Filters combined with `AND`.
    pub conditions: Vec<Condition>,
    /// Ordering.
    pub order_by: Vec<OrderByField>,
}

impl SelectQuery {
    /// Create a query over a table.
    pub fn new(entity: impl Into<SmolStr>, table: impl Into<SmolStr>, alias: impl Into<SmolStr>) -> Self {
        Self {
            entity: entity.into(),
            table: table.into(),
            alias: alias.into(),
            discriminator: Vec::new(),
            joins: Vec::new(),
            junction: None,
            conditions: Vec::new(),
            order_by: Vec::new(),
        }
    }

    /// Create a query for an entity type, restricted to its discriminator
    /// values when it is not the hierarchy root.
    pub fn for_entity(
        catalog: &dyn MetadataCatalog,
        entity: &str,
        alias: impl Into<SmolStr>,
    ) -> MapperResult<Self> {
        let meta = catalog.entity(entity)?;
        let mut query = Self::new(meta.name.clone(), meta.table.clone(), alias);
        if !meta.is_root() {
            query.discriminator = meta.discriminator_values.clone();
        }
        Ok(query)
    }

    /// Add a `column IN (...)` filter.
    pub fn where_in(
        mut self,
        column: impl Into<SmolStr>,
        values: Vec<Value>,
        param_type: ArrayParameterType,
    ) -> Self {
        self.conditions.push(Condition::In {
            column: column.into(),
            values,
            param_type,
        });
        self
    }

    /// Add a `column = ?` filter.
    pub fn where_eq(mut self, column: impl Into<SmolStr>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    /// Add a `column IS NULL` filter.
    pub fn where_null(mut self, column: impl Into<SmolStr>) -> Self {
        self.conditions.push(Condition::IsNull { column: column.into() });
        self
    }

    /// Restrict to rows linked to one source through a junction table.
    pub fn through(mut self, filter: JunctionFilter) -> Self {
        self.junction = Some(filter);
        self
    }

    /// Append an ordering column.
    pub fn order_by(mut self, field: OrderByField) -> Self {
        self.order_by.push(field);
        self
    }

    /// Add a fetch join.
    pub fn left_join(&mut self, join: FetchJoin) {
        self.joins.push(join);
    }

    /// Check if a join alias is already present.
    pub fn has_join(&self, alias: &str) -> bool {
        self.joins.iter().any(|j| j.alias == alias)
    }

    /// Get a join by alias.
    pub fn join(&self, alias: &str) -> Option<&FetchJoin> {
        self.joins.iter().find(|j| j.alias == alias)
    }

    /// Bound parameters in placeholder order.
    pub fn params(&self) -> Vec<Value> {
        let mut params = Vec::new();
        if let Some(filter) = &self.junction {
            params.push(filter.source_id.clone());
        }
        for condition in &self.conditions {
            match condition {
                Condition::In { values, .. } => params.extend(values.iter().cloned()),
                Condition::Eq { value, .. } => params.push(value.clone()),
                Condition::IsNull { .. } => {}
            }
        }
        params
    }

    /// Render the SQL text with `?` placeholders.
    pub fn to_sql(&self) -> String {
        let mut sql = String::with_capacity(64);
        sql.push_str("SELECT * FROM ");
        sql.push_str(&self.table);
        sql.push(' ');
        sql.push_str(&self.alias);

        for join in &self.joins {
            sql.push_str(" LEFT JOIN ");
            sql.push_str(&join.table);
            sql.push(' ');
            sql.push_str(&join.alias);
            sql.push_str(" ON ");
            write_column(&mut sql, &join.parent_alias, &join.parent_column);
            sql.push_str(" = ");
            write_column(&mut sql, &join.alias, &join.target_column);
            if !join.discriminator.is_empty() {
                sql.push_str(" AND ");
                write_discriminator(&mut sql, &join.alias, &join.discriminator);
            }
        }

        let mut predicates: Vec<String> = Vec::new();
        if let Some(filter) = &self.junction {
            let jt = &filter.junction;
            sql.push_str(" INNER JOIN ");
            sql.push_str(&jt.table);
            sql.push_str(" ON ");
            write_column(&mut sql, &self.alias, &filter.target_identifier);
            sql.push_str(" = ");
            write_column(&mut sql, &jt.table, &jt.target_column);
            predicates.push(format!("{}.{} = ?", jt.table, jt.source_column));
        }

        for condition in &self.conditions {
            predicates.push(match condition {
                Condition::In { values, .. } if values.is_empty() => "1 = 0".to_string(),
                Condition::In { column, values, .. } => {
                    format!("{}.{} IN ({})", self.alias, column, placeholders(values.len()))
                }
                Condition::Eq { column, .. } => format!("{}.{} = ?", self.alias, column),
                Condition::IsNull { column } => format!("{}.{} IS NULL", self.alias, column),
            });
        }

        if !self.discriminator.is_empty() {
            let mut predicate = String::new();
            write_discriminator(&mut predicate, &self.alias, &self.discriminator);
            predicates.push(predicate);
        }

        if !predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicates.join(" AND "));
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            for (i, field) in self.order_by.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                field.write_sql(&self.alias, &mut sql);
            }
        }

        sql
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// A projection of `(source_id, target_id)` pairs out of a junction table.
#[derive(Debug, Clone, PartialEq)]
pub struct PairQuery {
    /// Entity type declaring the association.
    pub source_entity: SmolStr,
    /// Target entity type.
    pub target_entity: SmolStr,
    /// Table of the source entity.
    pub source_table: SmolStr,
    /// Identifier column of the source entity.
    pub source_identifier: SmolStr,
    /// Table of the target entity.
    pub target_table: SmolStr,
    /// Identifier column of the target entity.
    pub target_identifier: SmolStr,
    /// Accepted discriminator values of the target; empty for roots.
    pub target_discriminator: Vec<SmolStr>,
    /// Junction table, seen from the source side.
    pub junction: JunctionTable,
    /// Source identifiers.
    pub source_ids: Vec<Value>,
    /// Binding type of the source identifier array.
    pub param_type: ArrayParameterType,
}

impl PairQuery {
    /// Build the pair projection of a many-to-many association.
    pub fn for_association(
        catalog: &dyn MetadataCatalog,
        assoc: &AssociationMapping,
        source_ids: Vec<Value>,
        param_type: ArrayParameterType,
    ) -> MapperResult<Self> {
        let junction = assoc.junction.clone().ok_or_else(|| {
            MapperError::invalid_mapping(assoc.source.as_str(), "association has no junction table")
                .with_field(assoc.field.as_str())
        })?;
        let source = catalog.entity(&assoc.source)?;
        let target = catalog.entity(&assoc.target)?;

        Ok(Self {
            source_entity: source.name.clone(),
            target_entity: target.name.clone(),
            source_table: source.table.clone(),
            source_identifier: source.identifier.clone(),
            target_table: target.table.clone(),
            target_identifier: target.identifier.clone(),
            target_discriminator: if target.is_root() {
                Vec::new()
            } else {
                target.discriminator_values.clone()
            },
            junction,
            source_ids,
            param_type,
        })
    }

    /// Bound parameters in placeholder order.
    pub fn params(&self) -> Vec<Value> {
        self.source_ids.clone()
    }

    /// Render the SQL text with `?` placeholders.
    pub fn to_sql(&self) -> String {
        let mut sql = format!(
            "SELECT e.{sid} AS source_id, t.{tid} AS target_id FROM {src} e \
             INNER JOIN {jt} j ON e.{sid} = j.{scol} \
             INNER JOIN {tgt} t ON t.{tid} = j.{tcol}",
            sid = self.source_identifier,
            tid = self.target_identifier,
            src = self.source_table,
            tgt = self.target_table,
            jt = self.junction.table,
            scol = self.junction.source_column,
            tcol = self.junction.target_column,
        );
        if !self.target_discriminator.is_empty() {
            sql.push_str(" AND ");
            write_discriminator(&mut sql, "t", &self.target_discriminator);
        }
        sql.push_str(" WHERE ");
        if self.source_ids.is_empty() {
            sql.push_str("1 = 0");
        } else {
            sql.push_str(&format!(
                "e.{} IN ({})",
                self.source_identifier,
                placeholders(self.source_ids.len())
            ));
        }
        sql
    }
}

impl fmt::Display for PairQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

fn write_column(sql: &mut String, alias: &str, column: &str) {
    sql.push_str(alias);
    sql.push('.');
    sql.push_str(column);
}

fn write_discriminator(sql: &mut String, alias: &str, values: &[SmolStr]) {
    write_column(sql, alias, DISCRIMINATOR_COLUMN);
    sql.push_str(" IN (");
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        sql.push('\'');
        sql.push_str(value);
        sql.push('\'');
    }
    sql.push(')');
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
