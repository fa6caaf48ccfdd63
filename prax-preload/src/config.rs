//! Preloader configuration.
//!
//! Configuration can be built in code, read from the `[preload]` table of a
//! TOML file, and overridden from the environment:
//!
//! ```toml
//! [preload]
//! entity_batch_size = 500
//! collection_batch_size = 50
//! max_join_depth = 2
//! ```
//!
//! | Variable | Field |
//! |----------|-------|
//! | `PRAX_PRELOAD_ENTITY_BATCH_SIZE` | `entity_batch_size` |
//! | `PRAX_PRELOAD_COLLECTION_BATCH_SIZE` | `collection_batch_size` |
//! | `PRAX_PRELOAD_MAX_JOIN_DEPTH` | `max_join_depth` |

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::error::{PreloadError, PreloadResult};

/// Default chunk size when loading entity bodies by identifier.
pub const DEFAULT_ENTITY_BATCH_SIZE: usize = 1000;

/// Default chunk size when loading collections by owner identifier.
pub const DEFAULT_COLLECTION_BATCH_SIZE: usize = 100;

/// Default cap on preventive joins per `(type, field)`.
pub const DEFAULT_MAX_JOIN_DEPTH: usize = 1;

/// Defaults applied to every preload call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PreloadConfig {
    /// Identifiers per query when materializing to-one targets and placeholders.
    #[serde(default = "default_entity_batch_size")]
    pub entity_batch_size: usize,

    /// Owner identifiers per query when loading one-to-many and many-to-many
    /// collections.
    #[serde(default = "default_collection_batch_size")]
    pub collection_batch_size: usize,

    /// How many times one `(type, field)` may be fetch-joined in one query.
    #[serde(default = "default_max_join_depth")]
    pub max_join_depth: usize,
}

fn default_entity_batch_size() -> usize {
    DEFAULT_ENTITY_BATCH_SIZE
}

fn default_collection_batch_size() -> usize {
    DEFAULT_COLLECTION_BATCH_SIZE
}

fn default_max_join_depth() -> usize {
    DEFAULT_MAX_JOIN_DEPTH
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            entity_batch_size: DEFAULT_ENTITY_BATCH_SIZE,
            collection_batch_size: DEFAULT_COLLECTION_BATCH_SIZE,
            max_join_depth: DEFAULT_MAX_JOIN_DEPTH,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    preload: PreloadConfig,
}

impl PreloadConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entity batch size.
    pub fn with_entity_batch_size(mut self, size: usize) -> Self {
        self.entity_batch_size = size;
        self
    }

    /// Set the collection batch size.
    pub fn with_collection_batch_size(mut self, size: usize) -> Self {
        self.collection_batch_size = size;
        self
    }

    /// Set the join depth cap.
    pub fn with_max_join_depth(mut self, depth: usize) -> Self {
        self.max_join_depth = depth;
        self
    }

    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> PreloadResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| PreloadError::ConfigIo {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&content)
    }

    /// Parse the `[preload]` table of a TOML document. Other tables are
    /// ignored; a missing table yields the defaults.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> PreloadResult<Self> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| PreloadError::ConfigParse { source: e })?;
        file.preload.validate()?;
        Ok(file.preload)
    }

    /// The defaults with environment overrides applied.
    pub fn from_env() -> PreloadResult<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `PRAX_PRELOAD_*` environment overrides.
    pub fn with_env_overrides(self) -> PreloadResult<Self> {
        self.with_overrides(|key| env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> PreloadResult<Self> {
        let parse = |key: &str| -> PreloadResult<Option<usize>> {
            match lookup(key) {
                Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
                    PreloadError::invalid_configuration(format!(
                        "{} must be a non-negative integer, got '{}'",
                        key, raw
                    ))
                }),
                None => Ok(None),
            }
        };

        if let Some(size) = parse("PRAX_PRELOAD_ENTITY_BATCH_SIZE")? {
            self.entity_batch_size = size;
        }
        if let Some(size) = parse("PRAX_PRELOAD_COLLECTION_BATCH_SIZE")? {
            self.collection_batch_size = size;
        }
        if let Some(depth) = parse("PRAX_PRELOAD_MAX_JOIN_DEPTH")? {
            self.max_join_depth = depth;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject zero batch sizes.
    pub fn validate(&self) -> PreloadResult<()> {
        if self.entity_batch_size == 0 {
            return Err(PreloadError::invalid_configuration(
                "entity_batch_size must be at least 1",
            ));
        }
        if self.collection_batch_size == 0 {
            return Err(PreloadError::invalid_configuration(
                "collection_batch_size must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Per-call overrides of [`PreloadConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreloadOptions {
    /// Chunk size for this call, replacing both configured batch sizes.
    pub batch_size: Option<usize>,
    /// Join depth cap for this call.
    pub max_join_depth: Option<usize>,
}

impl PreloadOptions {
    /// No overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the batch size.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Override the join depth cap.
    pub fn max_join_depth(mut self, depth: usize) -> Self {
        self.max_join_depth = Some(depth);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = PreloadConfig::default();
        assert_eq!(config.entity_batch_size, 1000);
        assert_eq!(config.collection_batch_size, 100);
        assert_eq!(config.max_join_depth, 1);
    }

    #[test]
    fn test_from_str_partial_table() {
        let config = PreloadConfig::from_str(
            r#"
            [database]
            url = "postgres://localhost/blog"

            [preload]
            collection_batch_size = 25
            "#,
        )
        .unwrap();

        assert_eq!(config.collection_batch_size, 25);
        assert_eq!(config.entity_batch_size, 1000);
    }

    #[test]
    fn test_from_str_without_table() {
        assert_eq!(PreloadConfig::from_str("").unwrap(), PreloadConfig::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = PreloadConfig::from_str("[preload]\nbatch = 3\n").unwrap_err();
        assert!(matches!(err, PreloadError::ConfigParse { .. }));
    }

    #[test]
    fn test_zero_batch_rejected() {
        let err = PreloadConfig::from_str("[preload]\nentity_batch_size = 0\n").unwrap_err();
        assert!(matches!(err, PreloadError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PRAX_PRELOAD_ENTITY_BATCH_SIZE", "10"),
            ("PRAX_PRELOAD_MAX_JOIN_DEPTH", " 3 "),
        ]
        .into_iter()
        .collect();

        let config = PreloadConfig::default()
            .with_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.entity_batch_size, 10);
        assert_eq!(config.collection_batch_size, 100);
        assert_eq!(config.max_join_depth, 3);
    }

    #[test]
    fn test_env_override_not_a_number() {
        let err = PreloadConfig::default()
            .with_overrides(|k| (k == "PRAX_PRELOAD_COLLECTION_BATCH_SIZE").then(|| "many".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("PRAX_PRELOAD_COLLECTION_BATCH_SIZE"));
    }

    #[test]
    fn test_from_missing_file() {
        let err = PreloadConfig::from_file("/nonexistent/prax.toml").unwrap_err();
        assert!(matches!(err, PreloadError::ConfigIo { .. }));
    }

    #[test]
    fn test_options_builder() {
        let options = PreloadOptions::new().batch_size(7).max_join_depth(2);
        assert_eq!(options.batch_size, Some(7));
        assert_eq!(options.max_join_depth, Some(2));
    }
}
