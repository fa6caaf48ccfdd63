//! Integration tests for preloader configuration.
//!
//! These tests verify that configuration read from files reaches the
//! queries a preloader issues.

mod common;

use common::{BlogData, placeholders};
use pretty_assertions::assert_eq;
use prax_entity_preloader::prelude::*;
use std::io::Write;

/// Test minimal configuration
#[test]
fn test_config_minimal() {
    let config = PreloadConfig::from_str("[preload]").expect("Failed to parse config");
    assert_eq!(config, PreloadConfig::default());
}

/// Test full configuration with all options
#[test]
fn test_config_full() {
    let config_str = r#"
        [database]
        url = "postgresql://localhost/test"

        [preload]
        entity_batch_size = 250
        collection_batch_size = 25
        max_join_depth = 3
    "#;

    let config = PreloadConfig::from_str(config_str).expect("Failed to parse config");
    assert_eq!(config.entity_batch_size, 250);
    assert_eq!(config.collection_batch_size, 25);
    assert_eq!(config.max_join_depth, 3);
}

/// Test configuration round trip through TOML
#[test]
fn test_config_serialize() {
    let config = PreloadConfig::new().with_entity_batch_size(42);
    let rendered = toml::to_string(&config).expect("Failed to serialize config");
    assert!(rendered.contains("entity_batch_size = 42"));
}

/// Test invalid configuration values
#[test]
fn test_config_invalid() {
    let err = PreloadConfig::from_str("[preload]\nentity_batch_size = 0").unwrap_err();
    assert!(matches!(err, PreloadError::InvalidConfiguration { .. }));

    let err = PreloadConfig::from_str("[preload]\nbatch = 10").unwrap_err();
    assert!(matches!(err, PreloadError::ConfigParse { .. }));

    let err = PreloadConfig::from_str("[preload]\nentity_batch_size = \"many\"").unwrap_err();
    assert!(matches!(err, PreloadError::ConfigParse { .. }));
}

/// Test loading configuration from a file
#[tokio::test]
async fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    writeln!(file, "[preload]\nentity_batch_size = 2").unwrap();

    let config = PreloadConfig::from_file(file.path()).expect("Failed to load config");
    assert_eq!(config.entity_batch_size, 2);
    assert_eq!(config.collection_batch_size, 100);

    let blog = BlogData::new().categories(3).build();
    let articles = blog.session.find_all("Article").await.unwrap();
    blog.clear_queries();

    let preloader = EntityPreloader::with_config(blog.session.clone(), config).unwrap();
    preloader.preload(&articles, "category").await.unwrap();

    assert_eq!(
        blog.queries(),
        vec![
            (1, format!("SELECT * FROM category e WHERE e.id IN ({})", placeholders(2))),
            (1, "SELECT * FROM category e WHERE e.id IN (?)".to_string()),
        ]
    );
}

/// Test missing configuration file
#[test]
fn test_config_missing_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let err = PreloadConfig::from_file(dir.path().join("prax.toml")).unwrap_err();

    assert!(matches!(err, PreloadError::ConfigIo { .. }));
    assert!(err.to_string().contains("prax.toml"));
}

/// Test per-call options take precedence over the configuration
#[tokio::test]
async fn test_options_override_config() {
    let blog = BlogData::new().categories(3).build();
    let articles = blog.session.find_all("Article").await.unwrap();
    blog.clear_queries();

    let config = PreloadConfig::new().with_entity_batch_size(1);
    let preloader = EntityPreloader::with_config(blog.session.clone(), config).unwrap();
    preloader
        .preload_with(&articles, "category", PreloadOptions::new().batch_size(10))
        .await
        .unwrap();

    assert_eq!(
        blog.queries(),
        vec![(1, format!("SELECT * FROM category e WHERE e.id IN ({})", placeholders(3)))]
    );
}
