//! Integration tests for preloading to-one relations.

mod common;

use common::{BlogData, placeholders};
use pretty_assertions::assert_eq;
use prax_entity_preloader::prelude::*;
use std::sync::Arc;

async fn read_category_names(session: &Session, articles: &[EntityRef]) {
    for article in articles {
        let category = session
            .reference(article, "category")
            .await
            .expect("category")
            .expect("every article has a category");
        session.field(&category, "name").await.expect("name");
    }
}

/// Reading the category of every article lazily costs one query per category.
#[tokio::test]
async fn test_many_has_one_unoptimized() {
    let blog = BlogData::new().categories(5).articles_per_category(5).build();

    let articles = blog.session.find_all("Article").await.unwrap();
    read_category_names(&blog.session, &articles).await;

    assert_eq!(
        blog.queries(),
        vec![
            (1, "SELECT * FROM article t0".to_string()),
            (5, "SELECT * FROM category t0 WHERE t0.id = ?".to_string()),
        ]
    );
}

/// Preloading the categories loads all of them with one query.
#[tokio::test]
async fn test_many_has_one_with_preload() {
    let blog = BlogData::new().categories(5).articles_per_category(5).build();

    let articles = blog.session.find_all("Article").await.unwrap();
    let categories = blog.preloader.preload(&articles, "category").await.unwrap();
    read_category_names(&blog.session, &articles).await;

    assert_eq!(categories.len(), 5);
    assert!(categories.iter().all(|c| c.is_initialized()));
    assert_eq!(
        blog.queries(),
        vec![
            (1, "SELECT * FROM article t0".to_string()),
            (1, format!("SELECT * FROM category e WHERE e.id IN ({})", placeholders(5))),
        ]
    );
}

/// Preloading parents of preloaded categories costs one query per level.
#[tokio::test]
async fn test_many_has_one_deep_with_preload() {
    let blog = BlogData::new()
        .categories(5)
        .category_parents(1)
        .articles_per_category(5)
        .build();

    let articles = blog.session.find_all("Article").await.unwrap();
    let categories = blog.preloader.preload(&articles, "category").await.unwrap();
    let parents = blog.preloader.preload(&categories, "parent").await.unwrap();

    for article in &articles {
        let category = blog.session.reference(article, "category").await.unwrap().unwrap();
        let parent = blog.session.reference(&category, "parent").await.unwrap().unwrap();
        blog.session.field(&parent, "name").await.unwrap();
    }

    assert_eq!(parents.len(), 5);
    assert_eq!(
        blog.queries(),
        vec![
            (1, "SELECT * FROM article t0".to_string()),
            (2, format!("SELECT * FROM category e WHERE e.id IN ({})", placeholders(5))),
        ]
    );
}

/// Targets are loaded in chunks of the batch size.
#[tokio::test]
async fn test_many_has_one_batched() {
    let blog = BlogData::new().categories(5).articles_per_category(2).build();

    let articles = blog.session.find_all("Article").await.unwrap();
    blog.clear_queries();

    let categories = blog
        .preloader
        .preload_with(&articles, "category", PreloadOptions::new().batch_size(2))
        .await
        .unwrap();

    assert_eq!(categories.len(), 5);
    assert_eq!(
        blog.queries(),
        vec![
            (2, format!("SELECT * FROM category e WHERE e.id IN ({})", placeholders(2))),
            (1, "SELECT * FROM category e WHERE e.id IN (?)".to_string()),
        ]
    );
}

/// A second preload of the same relation issues no query.
#[tokio::test]
async fn test_preload_is_idempotent() {
    let blog = BlogData::new().categories(3).articles_per_category(2).build();

    let articles = blog.session.find_all("Article").await.unwrap();
    let first = blog.preloader.preload(&articles, "category").await.unwrap();
    let count = blog.query_count();

    let second = blog.preloader.preload(&articles, "category").await.unwrap();

    assert_eq!(blog.query_count(), count);
    assert_eq!(first.len(), second.len());
    assert!(first.iter().zip(&second).all(|(a, b)| Arc::ptr_eq(a, b)));
}

/// Articles sharing a category share one entity instance.
#[tokio::test]
async fn test_shared_targets_deduplicated() {
    let blog = BlogData::new().categories(1).articles_per_category(5).build();

    let articles = blog.session.find_all("Article").await.unwrap();
    let categories = blog.preloader.preload(&articles, "category").await.unwrap();

    assert_eq!(categories.len(), 1);
    for article in &articles {
        let category = article.get_reference("category").flatten().unwrap();
        assert!(Arc::ptr_eq(&category, &categories[0]));
    }
}

/// Null references contribute nothing and cost nothing.
#[tokio::test]
async fn test_null_references_skipped() {
    let blog = BlogData::new().categories(4).build();

    let categories = blog.session.find_all("Category").await.unwrap();
    blog.clear_queries();

    let parents = blog.preloader.preload(&categories, "parent").await.unwrap();

    assert!(parents.is_empty());
    assert_eq!(blog.query_count(), 0);
}

/// Placeholder roots are loaded before their relation.
#[tokio::test]
async fn test_placeholder_roots() {
    let blog = BlogData::new().categories(5).build();

    let articles: Vec<EntityRef> = (1..=5)
        .map(|n| blog.session.get_reference("Article", EntityId::Int(n)).unwrap())
        .collect();
    assert!(articles.iter().all(|a| !a.is_initialized()));

    let categories = blog.preloader.preload(&articles, "category").await.unwrap();

    assert!(articles.iter().all(|a| a.is_initialized()));
    assert_eq!(categories.len(), 5);
    assert_eq!(
        blog.queries(),
        vec![
            (1, format!("SELECT * FROM article e WHERE e.id IN ({})", placeholders(5))),
            (1, format!("SELECT * FROM category e WHERE e.id IN ({})", placeholders(5))),
        ]
    );
}

/// Owning one-to-one targets without a subclass are plain identifier loads.
#[tokio::test]
async fn test_one_to_one_owning_side() {
    let blog = BlogData::new()
        .articles_per_category(1)
        .comments_per_article(4)
        .prompt_changes(2)
        .build();

    let bots = blog.session.find_all("Bot").await.unwrap();
    blog.clear_queries();

    let prompts = blog.preloader.preload(&bots, "active_prompt").await.unwrap();

    assert_eq!(bots.len(), 2);
    assert_eq!(prompts.len(), 2);
    for prompt in &prompts {
        assert_eq!(prompt.get_value("version"), Some(Value::Int(3)));
    }
    assert_eq!(
        blog.queries(),
        vec![(
            1,
            format!(
                "SELECT * FROM bot_prompt_version e \
                 LEFT JOIN bot_prompt_version e_next_version ON e.id = e_next_version.prev_version_id \
                 WHERE e.id IN ({})",
                placeholders(2)
            )
        )]
    );
}

/// Walking a chain of one-to-one links costs one query per step.
#[tokio::test]
async fn test_one_to_one_chain() {
    let blog = BlogData::new()
        .articles_per_category(1)
        .comments_per_article(2)
        .prompt_changes(3)
        .build();

    let bots = blog.session.find_all("Bot").await.unwrap();
    let mut versions = blog.preloader.preload(&bots, "active_prompt").await.unwrap();
    blog.clear_queries();

    let mut steps = 0;
    loop {
        versions = blog.preloader.preload(&versions, "prev_version").await.unwrap();
        if versions.is_empty() {
            break;
        }
        steps += 1;
    }

    assert_eq!(steps, 3);
    for bot in &bots {
        let mut version = blog.session.reference(bot, "active_prompt").await.unwrap();
        let mut seen = 0;
        while let Some(current) = version {
            seen += 1;
            version = blog.session.reference(&current, "prev_version").await.unwrap();
        }
        assert_eq!(seen, 4);
    }
    assert_eq!(blog.query_count(), 3);
}

/// Roots of sibling types resolve to their common ancestor.
#[tokio::test]
async fn test_heterogeneous_roots() {
    let blog = BlogData::new().articles_per_category(1).comments_per_article(4).build();

    let mut contributors = blog.session.find_all("User").await.unwrap();
    contributors.extend(blog.session.find_all("Bot").await.unwrap());
    assert_eq!(contributors.len(), 4);
    blog.clear_queries();

    let comments = blog.preloader.preload(&contributors, "comments").await.unwrap();

    assert_eq!(comments.len(), 4);
    for contributor in &contributors {
        let collection = contributor.get_collection("comments").unwrap();
        assert!(collection.is_initialized());
        assert_eq!(collection.len(), 1);
    }
    assert_eq!(
        blog.queries(),
        vec![(
            1,
            format!(
                "SELECT * FROM comment e \
                 LEFT JOIN contributor e_author ON e.author_id = e_author.id \
                 WHERE e.author_id IN ({})",
                placeholders(4)
            )
        )]
    );
}
