//! Error types for preloading.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use prax_mapper::MapperError;
use std::fmt;
use thiserror::Error;

/// Result type for preload operations.
pub type PreloadResult<T> = Result<T, PreloadError>;

/// Relation shapes the preloader refuses to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationShape {
    /// The collection is keyed by a field of its items.
    Indexed,
    /// A many-to-many collection with an explicit ordering.
    OrderedManyToMany,
}

impl fmt::Display for RelationShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Indexed => f.write_str("indexed collections are not supported"),
            Self::OrderedManyToMany => {
                f.write_str("ordered many-to-many collections are not supported")
            }
        }
    }
}

/// Errors raised by [`EntityPreloader`](crate::EntityPreloader).
///
/// Every variant except [`Storage`](Self::Storage) is a programming or
/// mapping error and is never retried.
#[derive(Error, Debug, Diagnostic)]
pub enum PreloadError {
    /// The roots share no type in their inheritance chains.
    #[error("`{first}` and `{other}` have no common ancestor")]
    #[diagnostic(
        code(prax::preload::no_common_ancestor),
        help("preload roots of one inheritance hierarchy per call")
    )]
    NoCommonAncestor { first: String, other: String },

    /// The relation is not mapped on the resolved type.
    #[error("`{entity}` has no relation named `{relation}`")]
    #[diagnostic(code(prax::preload::unknown_relation))]
    UnknownRelation { entity: String, relation: String },

    /// The relation is neither to-one, one-to-many nor many-to-many.
    #[error("`{entity}.{relation}` ({kind}) cannot be preloaded")]
    #[diagnostic(code(prax::preload::unsupported_relation_kind))]
    UnsupportedRelationKind {
        entity: String,
        relation: String,
        kind: String,
    },

    /// The relation has a shape the preloader cannot reattach.
    #[error("`{entity}.{relation}`: {shape}")]
    #[diagnostic(code(prax::preload::unsupported_relation_shape))]
    UnsupportedRelationShape {
        entity: String,
        relation: String,
        shape: RelationShape,
    },

    /// The metadata catalog did not provide something it must provide.
    #[error("mapping invariant violated: {message}")]
    #[diagnostic(code(prax::preload::mapping_invariant))]
    MappingInvariantViolation {
        message: String,
        #[source]
        source: Option<MapperError>,
    },

    /// A configuration value is out of range.
    #[error("invalid preload configuration: {message}")]
    #[diagnostic(code(prax::preload::invalid_configuration))]
    InvalidConfiguration { message: String },

    /// Reading a configuration file failed.
    #[error("failed to read configuration file: {path}")]
    #[diagnostic(code(prax::preload::config_io))]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A configuration file is not valid TOML for this crate.
    #[error("failed to parse preload configuration")]
    #[diagnostic(code(prax::preload::config_parse))]
    ConfigParse {
        #[source]
        source: toml::de::Error,
    },

    /// A query failed in the storage layer.
    #[error(transparent)]
    #[diagnostic(code(prax::preload::storage))]
    Storage(#[from] MapperError),
}

impl PreloadError {
    /// Create an unknown relation error.
    pub fn unknown_relation(entity: impl Into<String>, relation: impl Into<String>) -> Self {
        Self::UnknownRelation {
            entity: entity.into(),
            relation: relation.into(),
        }
    }

    /// Create an unsupported relation shape error.
    pub fn unsupported_shape(
        entity: impl Into<String>,
        relation: impl Into<String>,
        shape: RelationShape,
    ) -> Self {
        Self::UnsupportedRelationShape {
            entity: entity.into(),
            relation: relation.into(),
            shape,
        }
    }

    /// Create a mapping invariant violation.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::MappingInvariantViolation {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a catalog lookup failure as a mapping invariant violation.
    pub fn catalog(source: MapperError) -> Self {
        Self::MappingInvariantViolation {
            message: source.message.clone(),
            source: Some(source),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Check if this is a programming or mapping error rather than a storage
    /// failure.
    pub fn is_logic_error(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }

    /// The storage error, if this is one.
    pub fn as_storage(&self) -> Option<&MapperError> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(unused_assignments)]
mod tests {
    use super::*;
    use miette::Diagnostic;

    #[test]
    fn test_shape_message() {
        let err = PreloadError::unsupported_shape("Article", "tags", RelationShape::OrderedManyToMany);
        assert_eq!(
            err.to_string(),
            "`Article.tags`: ordered many-to-many collections are not supported"
        );
        assert!(err.is_logic_error());
    }

    #[test]
    fn test_diagnostic_codes() {
        let err = PreloadError::unknown_relation("Article", "nope");
        assert_eq!(
            err.code().map(|c| c.to_string()).as_deref(),
            Some("prax::preload::unknown_relation")
        );

        let err = PreloadError::NoCommonAncestor {
            first: "User".into(),
            other: "Tag".into(),
        };
        assert!(err.help().is_some());
    }

    #[test]
    fn test_storage_is_transparent() {
        let inner = MapperError::connection("refused");
        let expected = inner.to_string();
        let err = PreloadError::from(inner);

        assert!(!err.is_logic_error());
        assert_eq!(err.to_string(), expected);
        assert!(err.as_storage().unwrap().is_connection_error());
    }
}
