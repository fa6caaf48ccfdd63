//! Integration tests for preloading many-to-many collections.

mod common;

use common::{BlogData, placeholders};
use pretty_assertions::assert_eq;
use prax_entity_preloader::prelude::*;

const ARTICLE_TAGS: &str = "SELECT e.id AS source_id, t.id AS target_id FROM article e \
     INNER JOIN article_tag j ON e.id = j.article_id \
     INNER JOIN tag t ON t.id = j.tag_id";

const TAG_ARTICLES: &str = "SELECT e.id AS source_id, t.id AS target_id FROM tag e \
     INNER JOIN article_tag j ON e.id = j.tag_id \
     INNER JOIN article t ON t.id = j.article_id";

async fn read_tag_labels(session: &Session, articles: &[EntityRef]) {
    for article in articles {
        for tag in session.collection(article, "tags").await.unwrap() {
            session.field(&tag, "label").await.unwrap();
        }
    }
}

/// Reading the tags of every article lazily costs one query per article.
#[tokio::test]
async fn test_many_has_many_unoptimized() {
    let blog = BlogData::new().articles_per_category(5).tags_per_article(5).build();

    let articles = blog.session.find_all("Article").await.unwrap();
    read_tag_labels(&blog.session, &articles).await;

    assert_eq!(
        blog.queries(),
        vec![
            (1, "SELECT * FROM article t0".to_string()),
            (
                5,
                "SELECT * FROM tag t0 INNER JOIN article_tag ON t0.id = article_tag.tag_id \
                 WHERE article_tag.article_id = ?"
                    .to_string()
            ),
        ]
    );
}

/// Preloading reads the junction once and the targets once.
#[tokio::test]
async fn test_many_has_many_with_preload() {
    let blog = BlogData::new().articles_per_category(5).tags_per_article(5).build();

    let articles = blog.session.find_all("Article").await.unwrap();
    let tags = blog.preloader.preload(&articles, "tags").await.unwrap();
    read_tag_labels(&blog.session, &articles).await;

    assert_eq!(tags.len(), 25);
    for article in &articles {
        let collection = article.get_collection("tags").unwrap();
        assert!(collection.is_initialized());
        assert_eq!(collection.len(), 5);
        assert_eq!(collection.snapshot().len(), 5);
    }
    assert_eq!(
        blog.queries(),
        vec![
            (1, "SELECT * FROM article t0".to_string()),
            (1, format!("{} WHERE e.id IN ({})", ARTICLE_TAGS, placeholders(5))),
            (1, format!("SELECT * FROM tag e WHERE e.id IN ({})", placeholders(25))),
        ]
    );
}

/// The inverse side reads the same junction with the columns swapped.
#[tokio::test]
async fn test_many_has_many_inverse_side() {
    let blog = BlogData::new().articles_per_category(5).tags_per_article(5).build();

    let tags = blog.session.find_all("Tag").await.unwrap();
    let articles = blog.preloader.preload(&tags, "articles").await.unwrap();

    assert_eq!(articles.len(), 5);
    for tag in &tags {
        assert_eq!(tag.get_collection("articles").unwrap().len(), 1);
    }
    assert_eq!(
        blog.queries(),
        vec![
            (1, "SELECT * FROM tag t0".to_string()),
            (1, format!("{} WHERE e.id IN ({})", TAG_ARTICLES, placeholders(25))),
            (1, format!("SELECT * FROM article e WHERE e.id IN ({})", placeholders(5))),
        ]
    );
}

/// Targets already initialized in the session are not loaded again.
#[tokio::test]
async fn test_many_has_many_reuses_managed_targets() {
    let blog = BlogData::new().articles_per_category(2).tags_per_article(3).build();

    let known = blog.session.find("Tag", &EntityId::Int(1)).await.unwrap().unwrap();
    let articles = blog.session.find_all("Article").await.unwrap();
    blog.clear_queries();

    let tags = blog.preloader.preload(&articles, "tags").await.unwrap();

    assert_eq!(tags.len(), 6);
    assert!(tags.iter().any(|t| std::sync::Arc::ptr_eq(t, &known)));
    assert_eq!(
        blog.queries(),
        vec![
            (1, format!("{} WHERE e.id IN ({})", ARTICLE_TAGS, placeholders(2))),
            (1, format!("SELECT * FROM tag e WHERE e.id IN ({})", placeholders(5))),
        ]
    );
}

/// Owners are chunked by the collection batch size, targets by the entity one.
#[tokio::test]
async fn test_many_has_many_batched() {
    let blog = BlogData::new().articles_per_category(3).tags_per_article(2).build();

    let articles = blog.session.find_all("Article").await.unwrap();
    blog.clear_queries();

    let config = PreloadConfig::new()
        .with_collection_batch_size(2)
        .with_entity_batch_size(3);
    let preloader = EntityPreloader::with_config(blog.session.clone(), config).unwrap();
    let tags = preloader.preload(&articles, "tags").await.unwrap();

    assert_eq!(tags.len(), 6);
    assert_eq!(
        blog.queries(),
        vec![
            (1, format!("{} WHERE e.id IN ({})", ARTICLE_TAGS, placeholders(2))),
            (1, format!("SELECT * FROM tag e WHERE e.id IN ({})", placeholders(3))),
            (1, "SELECT * FROM tag e WHERE e.id IN (?)".to_string()),
            (1, format!("{} WHERE e.id IN (?)", ARTICLE_TAGS)),
            (1, format!("SELECT * FROM tag e WHERE e.id IN ({})", placeholders(2))),
        ]
    );
}

/// Article identifiers of every storage type bind in their database form.
#[tokio::test]
async fn test_many_has_many_identifier_types() {
    for ty in [
        IdentifierType::Integer,
        IdentifierType::String,
        IdentifierType::Ascii,
        IdentifierType::Binary,
        IdentifierType::Uuid,
    ] {
        let blog = BlogData::new()
            .article_id(ty)
            .articles_per_category(3)
            .tags_per_article(2)
            .build();

        let articles = blog.session.find_all("Article").await.unwrap();
        blog.clear_queries();

        let tags = blog.preloader.preload(&articles, "tags").await.unwrap();
        assert_eq!(tags.len(), 6, "{:?}", ty);
        for article in &articles {
            assert_eq!(article.get_collection("tags").unwrap().len(), 2, "{:?}", ty);
        }

        let pairs = &blog.store.log().entries()[0];
        assert_eq!(
            pairs.params,
            (1..=3).map(|n| blog.article_key(n)).collect::<Vec<_>>(),
            "{:?}",
            ty
        );

        let tags = blog.session.find_all("Tag").await.unwrap();
        blog.session.clear();
        let tags: Vec<EntityRef> = tags
            .iter()
            .map(|t| blog.session.get_reference("Tag", t.id().clone()).unwrap())
            .collect();
        let articles = blog.preloader.preload(&tags, "articles").await.unwrap();
        assert_eq!(articles.len(), 3, "{:?}", ty);
    }
}

/// Relations preloaded one after another are read back without a query.
#[tokio::test]
async fn test_preload_chain_across_kinds() {
    let blog = BlogData::new()
        .categories(2)
        .articles_per_category(3)
        .tags_per_article(2)
        .comments_per_article(2)
        .build();

    let categories = blog.session.find_all("Category").await.unwrap();
    let articles = blog.preloader.preload(&categories, "articles").await.unwrap();
    let tags = blog.preloader.preload(&articles, "tags").await.unwrap();
    let comments = blog.preloader.preload(&articles, "comments").await.unwrap();
    let count = blog.query_count();

    read_tag_labels(&blog.session, &articles).await;
    for article in &articles {
        for comment in blog.session.collection(article, "comments").await.unwrap() {
            let author = blog.session.reference(&comment, "author").await.unwrap().unwrap();
            blog.session.field(&author, "name").await.unwrap();
        }
    }

    assert_eq!(tags.len(), 12);
    assert_eq!(comments.len(), 12);
    assert_eq!(blog.query_count(), count);
    assert_eq!(count, 5);
}
