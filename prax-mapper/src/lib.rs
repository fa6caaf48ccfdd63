//! # prax-mapper
//!
//! The object mapper underneath the Prax preloader.
//!
//! This crate provides:
//! - Entity metadata with single-table inheritance ([`metadata`])
//! - Managed entities with two-state lazy placeholders and relation
//!   collections ([`entity`])
//! - An identity map guaranteeing one instance per identity ([`identity`])
//! - Select and junction-pair queries with SQL rendering ([`query`])
//! - A [`QueryExecutor`] seam and an in-memory backend with a query log
//!   ([`store`], [`query_log`])
//! - A [`Session`] that hydrates rows and implements ordinary lazy loading
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use prax_mapper::prelude::*;
//!
//! let schema = Schema::builder()
//!     .entity(EntityMetadata::new("Tag").column("label"))
//!     .build()
//!     .unwrap();
//!
//! let store = Arc::new(InMemoryStore::new());
//! store.insert("tag", [("id", Value::Int(1)), ("label", Value::from("rust"))]);
//!
//! let session = Session::new(Arc::new(schema), store.clone());
//! let tag = session.get_reference("Tag", EntityId::Int(1)).unwrap();
//! assert!(session.is_uninitialized(&tag));
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod entity;
pub mod error;
mod hydrate;
pub mod identity;
pub mod logging;
pub mod metadata;
pub mod query;
pub mod query_log;
pub mod session;
pub mod store;
pub mod types;
pub mod value;

pub use entity::{Entity, EntityRef, LoadState, RelationCollection};
pub use error::{ErrorCode, ErrorContext, MapperError, MapperResult};
pub use identity::{IdentityKey, IdentityMap};
pub use metadata::{
    AssociationKind, AssociationMapping, EntityMetadata, FieldAccessor, FieldKind, JunctionTable,
    MetadataCatalog, Schema, SchemaBuilder,
};
pub use query::{Condition, FetchJoin, JunctionFilter, PairQuery, SelectQuery};
pub use query_log::{LoggedQuery, QueryLog};
pub use session::Session;
pub use store::{InMemoryStore, QueryExecutor, ResultRow, Row};
pub use types::{OrderByField, SortOrder};
pub use value::{ArrayParameterType, EntityId, IdentifierType, Value};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::entity::{Entity, EntityRef, LoadState, RelationCollection};
    pub use crate::error::{MapperError, MapperResult};
    pub use crate::metadata::{
        AssociationMapping, EntityMetadata, JunctionTable, MetadataCatalog, Schema,
    };
    pub use crate::query::{FetchJoin, PairQuery, SelectQuery};
    pub use crate::session::Session;
    pub use crate::store::{InMemoryStore, QueryExecutor};
    pub use crate::types::{OrderByField, SortOrder};
    pub use crate::value::{EntityId, IdentifierType, Value};
}
