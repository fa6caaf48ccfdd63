//! Blog fixture shared by the integration tests.
//!
//! Categories form a parent chain and own articles; articles carry tags
//! through the `article_tag` junction and comments written by contributors,
//! which are either users or bots (single-table inheritance). Bots point to
//! the active version of a prompt, versions form a doubly linked chain.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use prax_entity_preloader::prelude::*;
use uuid::Uuid;

/// Build the blog schema. Only the article identifier type varies.
pub fn blog_schema(article_id: IdentifierType) -> Schema {
    Schema::builder()
        .entity(
            EntityMetadata::new("Category")
                .column("name")
                .association(AssociationMapping::many_to_one("parent", "Category").inversed_by("children"))
                .association(AssociationMapping::one_to_many("children", "Category").mapped_by("parent"))
                .association(AssociationMapping::one_to_many("articles", "Article").mapped_by("category")),
        )
        .entity(
            EntityMetadata::new("Article")
                .identifier("id", article_id)
                .column("title")
                .column("content")
                .association(AssociationMapping::many_to_one("category", "Category").inversed_by("articles"))
                .association(AssociationMapping::many_to_many("tags", "Tag").inversed_by("articles"))
                .association(
                    AssociationMapping::one_to_many("comments", "Comment")
                        .mapped_by("article")
                        .order_by(OrderByField::desc("id")),
                ),
        )
        .entity(
            EntityMetadata::new("Tag")
                .column("label")
                .association(AssociationMapping::many_to_many("articles", "Article").mapped_by("tags")),
        )
        .entity(
            EntityMetadata::new("Comment")
                .column("content")
                .association(AssociationMapping::many_to_one("article", "Article").inversed_by("comments"))
                .association(AssociationMapping::many_to_one("author", "Contributor").inversed_by("comments")),
        )
        .entity(
            EntityMetadata::new("Contributor")
                .abstract_entity()
                .column("name")
                .association(AssociationMapping::one_to_many("comments", "Comment").mapped_by("author")),
        )
        .entity(
            EntityMetadata::new("User")
                .extends("Contributor")
                .column("email")
                .column("password_hash"),
        )
        .entity(
            EntityMetadata::new("Bot")
                .extends("Contributor")
                .column("api_key_hash")
                .association(AssociationMapping::one_to_one("active_prompt", "BotPromptVersion")),
        )
        .entity(
            EntityMetadata::new("BotPromptVersion")
                .column("version")
                .column("prompt")
                .association(
                    AssociationMapping::one_to_one("prev_version", "BotPromptVersion").inversed_by("next_version"),
                )
                .association(
                    AssociationMapping::one_to_one("next_version", "BotPromptVersion").mapped_by("prev_version"),
                ),
        )
        .build()
        .expect("blog schema is valid")
}

/// A populated blog.
pub struct Blog {
    pub session: Arc<Session>,
    pub store: Arc<InMemoryStore>,
    pub preloader: EntityPreloader,
    pub article_id: IdentifierType,
}

impl Blog {
    /// The query log aggregated by SQL text, in first-seen order.
    pub fn queries(&self) -> Vec<(usize, String)> {
        self.store.log().aggregated()
    }

    /// Number of queries issued since the last clear.
    pub fn query_count(&self) -> usize {
        self.store.log().len()
    }

    pub fn clear_queries(&self) {
        self.store.log().clear();
    }

    /// Database value of the n-th article identifier.
    pub fn article_key(&self, n: i64) -> Value {
        article_value(self.article_id, n)
    }
}

/// Shape of the generated blog data.
#[derive(Debug, Clone)]
pub struct BlogData {
    categories: usize,
    category_parents: usize,
    articles_per_category: usize,
    tags_per_article: usize,
    comments_per_article: usize,
    prompt_changes: usize,
    article_id: IdentifierType,
}

impl Default for BlogData {
    fn default() -> Self {
        Self {
            categories: 1,
            category_parents: 0,
            articles_per_category: 1,
            tags_per_article: 0,
            comments_per_article: 0,
            prompt_changes: 0,
            article_id: IdentifierType::Integer,
        }
    }
}

impl BlogData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn categories(mut self, n: usize) -> Self {
        self.categories = n;
        self
    }

    /// Length of the parent chain above every category.
    pub fn category_parents(mut self, n: usize) -> Self {
        self.category_parents = n;
        self
    }

    pub fn articles_per_category(mut self, n: usize) -> Self {
        self.articles_per_category = n;
        self
    }

    /// Every article gets its own tags.
    pub fn tags_per_article(mut self, n: usize) -> Self {
        self.tags_per_article = n;
        self
    }

    /// Every comment gets its own author; even ones are users, odd ones bots.
    pub fn comments_per_article(mut self, n: usize) -> Self {
        self.comments_per_article = n;
        self
    }

    pub fn prompt_changes(mut self, n: usize) -> Self {
        self.prompt_changes = n;
        self
    }

    pub fn article_id(mut self, ty: IdentifierType) -> Self {
        self.article_id = ty;
        self
    }

    pub fn build(self) -> Blog {
        let schema = Arc::new(blog_schema(self.article_id));
        let store = Arc::new(InMemoryStore::new());
        for table in [
            "category",
            "article",
            "tag",
            "article_tag",
            "comment",
            "contributor",
            "bot_prompt_version",
        ] {
            store.create_table(table);
        }

        let mut seq = Sequences::default();
        for h in 0..self.categories {
            let mut parent: Option<i64> = None;
            for i in 0..self.category_parents {
                let id = seq.next("category");
                store.insert(
                    "category",
                    [
                        ("id", Value::Int(id)),
                        ("name", Value::from(format!("CategoryParent#{}", i))),
                        ("parent_id", Value::from(parent)),
                    ],
                );
                parent = Some(id);
            }

            let category = seq.next("category");
            store.insert(
                "category",
                [
                    ("id", Value::Int(category)),
                    ("name", Value::from(format!("Category#{}", h))),
                    ("parent_id", Value::from(parent)),
                ],
            );

            for i in 0..self.articles_per_category {
                let article = article_value(self.article_id, seq.next("article"));
                store.insert(
                    "article",
                    [
                        ("id", article.clone()),
                        ("title", Value::from(format!("Article#{}", i))),
                        ("content", Value::from(format!("Content of article #{}", i))),
                        ("category_id", Value::Int(category)),
                    ],
                );

                for j in 0..self.tags_per_article {
                    let tag = seq.next("tag");
                    store.insert(
                        "tag",
                        [("id", Value::Int(tag)), ("label", Value::from(format!("Tag#{}", j)))],
                    );
                    store.insert(
                        "article_tag",
                        [("article_id", article.clone()), ("tag_id", Value::Int(tag))],
                    );
                }

                for j in 0..self.comments_per_article {
                    let author = seq.next("contributor");
                    if j % 2 == 0 {
                        store.insert(
                            "contributor",
                            [
                                ("id", Value::Int(author)),
                                ("dtype", Value::from("user")),
                                ("name", Value::from(format!("User#{}", j))),
                                ("email", Value::from(format!("user{}@example.com", j))),
                                ("password_hash", Value::from("hash")),
                            ],
                        );
                    } else {
                        let mut prompt: Option<i64> = None;
                        for k in 0..=self.prompt_changes {
                            let version = seq.next("bot_prompt_version");
                            store.insert(
                                "bot_prompt_version",
                                [
                                    ("id", Value::Int(version)),
                                    ("version", Value::Int(k as i64 + 1)),
                                    ("prompt", Value::from(format!("Prompt #{}", k))),
                                    ("prev_version_id", Value::from(prompt)),
                                ],
                            );
                            prompt = Some(version);
                        }
                        store.insert(
                            "contributor",
                            [
                                ("id", Value::Int(author)),
                                ("dtype", Value::from("bot")),
                                ("name", Value::from(format!("Bot#{}", i))),
                                ("api_key_hash", Value::from("abcdef")),
                                ("active_prompt_id", Value::from(prompt)),
                            ],
                        );
                    }

                    let comment = seq.next("comment");
                    store.insert(
                        "comment",
                        [
                            ("id", Value::Int(comment)),
                            ("content", Value::from(format!("Comment #{}", j))),
                            ("article_id", article.clone()),
                            ("author_id", Value::Int(author)),
                        ],
                    );
                }
            }
        }

        let session = Arc::new(Session::new(schema, store.clone()));
        let preloader = EntityPreloader::new(session.clone());
        Blog {
            session,
            store,
            preloader,
            article_id: self.article_id,
        }
    }
}

#[derive(Default)]
struct Sequences(HashMap<&'static str, i64>);

impl Sequences {
    fn next(&mut self, table: &'static str) -> i64 {
        let id = self.0.entry(table).or_insert(0);
        *id += 1;
        *id
    }
}

/// Database value of the n-th article identifier for an identifier type.
pub fn article_value(ty: IdentifierType, n: i64) -> Value {
    match ty {
        IdentifierType::Integer => Value::Int(n),
        IdentifierType::String | IdentifierType::Ascii => Value::from(format!("article-{:04}", n)),
        IdentifierType::Binary => Value::Bytes(n.to_be_bytes().to_vec()),
        IdentifierType::Uuid => Value::from(Uuid::from_u128(n as u128).hyphenated().to_string()),
    }
}

/// `?, ?, ...` with `n` placeholders.
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
