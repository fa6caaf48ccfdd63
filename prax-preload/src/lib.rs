//! # prax-preload
//!
//! Batched relation preloading for the Prax mapper.
//!
//! Reading one relation of many entities through the lazy path costs one
//! query per entity. [`EntityPreloader`] loads the relation for all of them
//! with a bounded number of chunked `IN (...)` queries and wires the results
//! onto the session's identity map.
//!
//! This crate provides:
//! - Common ancestor resolution for heterogeneous roots ([`ancestor`])
//! - Relation classification ([`classify`])
//! - Batched placeholder materialization ([`materialize`])
//! - Depth-bounded preventive fetch joins ([`joins`])
//! - Loaders for to-one, one-to-many and many-to-many relations
//! - Target reconciliation against the identity map ([`reconcile`])
//! - Configuration from code, TOML or the environment ([`config`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use prax_preload::{EntityPreloader, PreloadOptions};
//!
//! let preloader = EntityPreloader::new(session.clone());
//! let categories = session.find_all("Category").await?;
//!
//! // One query for the articles of every category.
//! let articles = preloader.preload(&categories, "articles").await?;
//!
//! // Then their comments, 50 articles per query.
//! preloader
//!     .preload_with(&articles, "comments", PreloadOptions::new().batch_size(50))
//!     .await?;
//! ```

pub mod ancestor;
pub mod classify;
pub mod config;
pub mod error;
pub mod joins;
mod loaders;
pub mod materialize;
pub mod preloader;
pub mod reconcile;

pub use ancestor::resolve_common_ancestor;
pub use classify::{Cardinality, ClassifiedRelation, classify};
pub use config::{PreloadConfig, PreloadOptions};
pub use error::{PreloadError, PreloadResult, RelationShape};
pub use joins::{JoinCounts, add_preventive_joins};
pub use materialize::{load_by_identifiers, materialize};
pub use preloader::EntityPreloader;
pub use reconcile::{TargetSet, finalize_collections};
