//! # Prax entity preloader
//!
//! Batched, N+1-free relation preloading for the Prax object mapper.
//!
//! Reading a relation of many entities one by one costs one query per
//! entity, plus one query per row for every inverse or polymorphic to-one
//! association the rows carry. The preloader replaces that with a bounded
//! number of chunked queries:
//!
//! - to-one targets are loaded in chunks of identifiers,
//! - one-to-many collections in chunks of owners through the foreign key,
//! - many-to-many collections through one junction projection per chunk
//!   plus one query for the targets not yet in memory,
//! - inverse and polymorphic to-one associations of every loaded row are
//!   fetch-joined into the same query, bounded by a join depth.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use prax_entity_preloader::prelude::*;
//!
//! # futures::executor::block_on(async {
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
//!     .build()?;
//!
//! let store = Arc::new(InMemoryStore::new());
//! store.insert("category", [("id", Value::Int(1)), ("name", Value::from("rust"))]);
//! store.insert(
//!     "article",
//!     [("id", Value::Int(1)), ("title", Value::from("ownership")), ("category_id", Value::Int(1))],
//! );
//!
//! let session = Arc::new(Session::new(Arc::new(schema), store.clone()));
//! let categories = session.find_all("Category").await?;
//!
//! let preloader = EntityPreloader::new(session.clone());
//! let articles = preloader.preload(&categories, "articles").await?;
//! assert_eq!(articles.len(), 1);
//!
//! // Already loaded: no further query.
//! let before = store.log().len();
//! session.collection(&categories[0], "articles").await?;
//! assert_eq!(store.log().len(), before);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```
//!
//! ## Crates
//!
//! - [`mapper`]: metadata catalog, entities, identity map, queries, storage
//! - [`preload`]: the preloader

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// The object mapper: metadata, entities, sessions and storage.
pub mod mapper {
    pub use prax_mapper::*;
}

/// Batched relation preloading.
pub mod preload {
    pub use prax_preload::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::mapper::prelude::*;
    pub use crate::preload::{
        EntityPreloader, PreloadConfig, PreloadError, PreloadOptions, PreloadResult,
    };
}

// Re-export key types at the crate root
pub use prax_mapper::{MapperError, Session};
pub use prax_preload::{EntityPreloader, PreloadConfig, PreloadError, PreloadOptions};
