//! The preloading entry point.

use prax_mapper::{EntityRef, Session};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::ancestor::resolve_common_ancestor;
use crate::classify::classify;
use crate::config::{PreloadConfig, PreloadOptions};
use crate::error::{PreloadError, PreloadResult};
use crate::loaders::{self, LoadContext};
use crate::materialize::materialize;

/// Loads one relation of many entities with a bounded number of queries.
///
/// Every entity reached is wired onto the session's identity map, so reading
/// the relation afterwards, and the to-one associations joined while loading
/// it, triggers no lazy query.
///
/// ```rust,ignore
/// let preloader = EntityPreloader::new(session.clone());
/// let articles = session.find_all("Article").await?;
///
/// // One query for all categories instead of one per article.
/// let categories = preloader.preload(&articles, "category").await?;
/// ```
#[derive(Debug, Clone)]
pub struct EntityPreloader {
    session: Arc<Session>,
    config: PreloadConfig,
}

impl EntityPreloader {
    /// Create a preloader with the default configuration.
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            config: PreloadConfig::default(),
        }
    }

    /// Create a preloader with an explicit configuration.
    pub fn with_config(session: Arc<Session>, config: PreloadConfig) -> PreloadResult<Self> {
        config.validate()?;
        Ok(Self { session, config })
    }

    /// The session entities are loaded into.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// The configuration.
    pub fn config(&self) -> &PreloadConfig {
        &self.config
    }

    /// Load `relation` of every root and return the distinct related
    /// entities.
    ///
    /// Roots may be placeholders and may have different concrete types as
    /// long as they share an ancestor declaring the relation. Collections
    /// that are already initialized or were modified locally are not
    /// reloaded; their current items are part of the result.
    pub async fn preload(&self, roots: &[EntityRef], relation: &str) -> PreloadResult<Vec<EntityRef>> {
        self.preload_with(roots, relation, PreloadOptions::default()).await
    }

    /// [`preload`](Self::preload) with per-call overrides.
    #[instrument(name = "preload", skip(self, roots, options), fields(relation = %relation, roots = roots.len()))]
    pub async fn preload_with(
        &self,
        roots: &[EntityRef],
        relation: &str,
        options: PreloadOptions,
    ) -> PreloadResult<Vec<EntityRef>> {
        if roots.is_empty() {
            return Ok(Vec::new());
        }
        if options.batch_size == Some(0) {
            return Err(PreloadError::invalid_configuration("batch_size must be at least 1"));
        }

        let catalog = self.session.catalog();
        let Some(source) = resolve_common_ancestor(catalog, roots)? else {
            return Ok(Vec::new());
        };
        let relation = classify(catalog, &source, relation)?;

        let ctx = LoadContext {
            session: &self.session,
            relation: &relation,
            entity_batch_size: options.batch_size.unwrap_or(self.config.entity_batch_size),
            collection_batch_size: options
                .batch_size
                .unwrap_or(self.config.collection_batch_size),
            max_join_depth: options.max_join_depth.unwrap_or(self.config.max_join_depth),
        };

        let roots = materialize(
            &self.session,
            &source,
            roots,
            ctx.entity_batch_size,
            ctx.max_join_depth,
        )
        .await?;

        let targets = loaders::load(&ctx, &roots).await?;
        debug!(
            entity = %source,
            field = %relation.field(),
            kind = %relation.cardinality,
            targets = targets.len(),
            "Preloaded relation"
        );
        Ok(targets)
    }
}
