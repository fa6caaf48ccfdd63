//! In-process metadata catalog.

use indexmap::IndexMap;
use smol_str::SmolStr;
use std::collections::HashMap;

use super::association::{AssociationKind, JunctionTable};
use super::entity::{EntityMetadata, to_snake_case};
use super::MetadataCatalog;
use crate::error::{MapperError, MapperResult};

/// A validated set of entity types.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entities: IndexMap<SmolStr, EntityMetadata>,
}

impl Schema {
    /// Start building a schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Look up an entity type.
    pub fn get(&self, name: &str) -> Option<&EntityMetadata> {
        self.entities.get(name)
    }

    /// All entity types in registration order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityMetadata> {
        self.entities.values()
    }

    /// Find the type of a hierarchy stored under a discriminator value.
    pub fn resolve_discriminator(&self, root: &str, value: &str) -> Option<&EntityMetadata> {
        self.entities
            .values()
            .find(|m| m.root == root && m.discriminator_value == value)
    }

    /// Number of registered entity types.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if no entity type is registered.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl MetadataCatalog for Schema {
    fn entity(&self, name: &str) -> MapperResult<&EntityMetadata> {
        self.entities
            .get(name)
            .ok_or_else(|| MapperError::unknown_entity(name))
    }
}

/// Builder for [`Schema`].
///
/// [`build`](Self::build) validates inheritance and associations and fills in
/// defaults:
///
/// - tables default to the snake-cased root type name; subtypes share it,
/// - owning to-one join columns default to `{field}_id`,
/// - owning many-to-many junctions default to `{source}_{target}` with
///   `{source}_id` / `{target}_id` columns,
/// - inverse sides take their junction from the owning side, swapped.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    entities: Vec<EntityMetadata>,
}

impl SchemaBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type.
    pub fn entity(mut self, meta: EntityMetadata) -> Self {
        self.entities.push(meta);
        self
    }

    /// Validate and resolve the registered types.
    pub fn build(self) -> MapperResult<Schema> {
        let mut declared: IndexMap<SmolStr, EntityMetadata> = IndexMap::new();
        for meta in self.entities {
            if declared.contains_key(&meta.name) {
                return Err(MapperError::invalid_mapping(
                    meta.name.as_str(),
                    "entity type registered twice",
                ));
            }
            declared.insert(meta.name.clone(), meta);
        }

        let chains = resolve_chains(&declared)?;
        resolve_hierarchy(&mut declared, &chains);
        resolve_owning_sides(&mut declared)?;
        resolve_inverse_sides(&mut declared)?;
        let entities = resolve_inheritance(declared, &chains)?;

        Ok(Schema { entities })
    }
}

/// Ancestor chain of every type, starting with the type itself.
fn resolve_chains(
    declared: &IndexMap<SmolStr, EntityMetadata>,
) -> MapperResult<HashMap<SmolStr, Vec<SmolStr>>> {
    let mut chains = HashMap::with_capacity(declared.len());
    for (name, meta) in declared {
        let mut chain = vec![name.clone()];
        let mut parent = meta.parent.clone();
        while let Some(p) = parent {
            let Some(parent_meta) = declared.get(&p) else {
                return Err(MapperError::invalid_mapping(
                    name.as_str(),
                    format!("parent type `{}` is not registered", p),
                ));
            };
            if chain.contains(&p) {
                return Err(MapperError::invalid_mapping(name.as_str(), "inheritance cycle"));
            }
            chain.push(p);
            parent = parent_meta.parent.clone();
        }
        chains.insert(name.clone(), chain);
    }
    Ok(chains)
}

fn resolve_hierarchy(
    declared: &mut IndexMap<SmolStr, EntityMetadata>,
    chains: &HashMap<SmolStr, Vec<SmolStr>>,
) {
    let names: Vec<SmolStr> = declared.keys().cloned().collect();

    for name in &names {
        let root = chains[name].last().cloned().unwrap_or_else(|| name.clone());
        let (table, identifier, identifier_type) = {
            let root_meta = &declared[&root];
            let table = if root_meta.table.is_empty() {
                SmolStr::new(to_snake_case(&root))
            } else {
                root_meta.table.clone()
            };
            (table, root_meta.identifier.clone(), root_meta.identifier_type)
        };
        let meta = &mut declared[name];
        meta.root = root;
        meta.table = table;
        meta.identifier = identifier;
        meta.identifier_type = identifier_type;
    }

    for name in &names {
        if let Some(parent) = declared[name].parent.clone() {
            declared[&parent].subclasses.push(name.clone());
        }
    }

    for name in &names {
        let root = declared[name].root.clone();
        let uses_discriminator = !declared[&root].subclasses.is_empty();
        let values = descendant_discriminators(declared, name);
        let meta = &mut declared[name];
        meta.uses_discriminator = uses_discriminator;
        meta.discriminator_values = values;
    }
}

fn descendant_discriminators(
    declared: &IndexMap<SmolStr, EntityMetadata>,
    name: &SmolStr,
) -> Vec<SmolStr> {
    let mut values = Vec::new();
    let mut stack = vec![name.clone()];
    while let Some(current) = stack.pop() {
        let meta = &declared[&current];
        values.push(meta.discriminator_value.clone());
        stack.extend(meta.subclasses.iter().rev().cloned());
    }
    values
}

fn resolve_owning_sides(declared: &mut IndexMap<SmolStr, EntityMetadata>) -> MapperResult<()> {
    let tables: HashMap<SmolStr, SmolStr> = declared
        .values()
        .map(|m| (m.name.clone(), m.table.clone()))
        .collect();

    for meta in declared.values_mut() {
        let name = meta.name.clone();
        for assoc in meta.associations.values_mut() {
            assoc.source = name.clone();
            if assoc.kind == AssociationKind::ElementCollection {
                continue;
            }
            let Some(target_table) = tables.get(&assoc.target) else {
                return Err(MapperError::invalid_mapping(
                    name.as_str(),
                    format!("target type `{}` is not registered", assoc.target),
                )
                .with_field(assoc.field.as_str()));
            };
            if !assoc.owning_side {
                continue;
            }
            match assoc.kind {
                AssociationKind::OneToOne | AssociationKind::ManyToOne => {
                    if assoc.join_column.is_none() {
                        assoc.join_column =
                            Some(SmolStr::new(format!("{}_id", to_snake_case(&assoc.field))));
                    }
                }
                AssociationKind::ManyToMany => {
                    if assoc.junction.is_none() {
                        assoc.junction = Some(JunctionTable::new(
                            format!("{}_{}", meta.table, target_table),
                            format!("{}_id", meta.table),
                            format!("{}_id", target_table),
                        ));
                    }
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn resolve_inverse_sides(declared: &mut IndexMap<SmolStr, EntityMetadata>) -> MapperResult<()> {
    let mut junctions = Vec::new();

    for meta in declared.values() {
        for assoc in meta.associations.values() {
            if assoc.owning_side || assoc.kind == AssociationKind::ElementCollection {
                continue;
            }
            let Some(mapped_by) = assoc.mapped_by.as_ref() else {
                return Err(MapperError::invalid_mapping(
                    meta.name.as_str(),
                    format!("inverse association `{}` needs mapped_by", assoc.field),
                )
                .with_field(assoc.field.as_str()));
            };
            let owning = find_declared(declared, &assoc.target, mapped_by).filter(|o| {
                o.owning_side
                    && match assoc.kind {
                        AssociationKind::OneToMany => o.kind == AssociationKind::ManyToOne,
                        kind => o.kind == kind,
                    }
            });
            let Some(owning) = owning else {
                return Err(MapperError::invalid_mapping(
                    meta.name.as_str(),
                    format!(
                        "`{}` is mapped by `{}.{}`, which is not a matching owning association",
                        assoc.field, assoc.target, mapped_by
                    ),
                )
                .with_field(assoc.field.as_str()));
            };
            if assoc.kind == AssociationKind::ManyToMany {
                if let Some(junction) = owning.junction.as_ref() {
                    junctions.push((meta.name.clone(), assoc.field.clone(), junction.swapped()));
                }
            }
        }
    }

    for (entity, field, junction) in junctions {
        if let Some(assoc) = declared[&entity].associations.get_mut(&field) {
            assoc.junction = Some(junction);
        }
    }
    Ok(())
}

fn find_declared<'a>(
    declared: &'a IndexMap<SmolStr, EntityMetadata>,
    entity: &str,
    field: &str,
) -> Option<&'a super::AssociationMapping> {
    let mut current = declared.get(entity);
    while let Some(meta) = current {
        if let Some(assoc) = meta.associations.get(field) {
            return Some(assoc);
        }
        current = meta.parent.as_ref().and_then(|p| declared.get(p));
    }
    None
}

fn resolve_inheritance(
    declared: IndexMap<SmolStr, EntityMetadata>,
    chains: &HashMap<SmolStr, Vec<SmolStr>>,
) -> MapperResult<IndexMap<SmolStr, EntityMetadata>> {
    let order: Vec<SmolStr> = declared.keys().cloned().collect();
    let mut by_depth = order.clone();
    by_depth.sort_by_key(|name| chains[name].len());

    let mut resolved: HashMap<SmolStr, EntityMetadata> = HashMap::with_capacity(declared.len());
    let mut declared = declared;
    for name in by_depth {
        let Some(mut meta) = declared.swap_remove(&name) else {
            continue;
        };
        if let Some(parent) = meta.parent.as_ref().and_then(|p| resolved.get(p)) {
            let mut columns = parent.columns.clone();
            columns.extend(meta.columns.iter().cloned());

            let mut associations = parent.associations.clone();
            for (field, assoc) in std::mem::take(&mut meta.associations) {
                if associations.contains_key(&field) {
                    return Err(MapperError::invalid_mapping(
                        name.as_str(),
                        format!("`{}` is already mapped by a parent type", field),
                    )
                    .with_field(field.as_str()));
                }
                associations.insert(field, assoc);
            }
            meta.columns = columns;
            meta.associations = associations;
        }
        resolved.insert(name, meta);
    }

    Ok(order
        .into_iter()
        .filter_map(|name| resolved.remove(&name).map(|meta| (name, meta)))
        .collect())
}
