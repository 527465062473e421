//! Test fixtures
//!
//! Factory functions for creating test data with sensible defaults.

use chrono::{TimeZone, Utc};

use crate::domain::entities::{Article, ArticleId, ArticleRef, CategoryRef, FetchedPost, Slug};

/// The sports category most scenarios use
pub fn test_sports() -> CategoryRef {
    CategoryRef {
        id: 3,
        slug: "deportes".to_string(),
        name: "Deportes".to_string(),
    }
}

/// Create a test article with default values
pub fn test_article(id: i64, slug: &str, category: Option<CategoryRef>) -> Article {
    Article {
        id: ArticleId(id),
        slug: Slug::parse(slug).unwrap(),
        title: format!("Noticia {}", slug),
        body: format!("<p>Contenido de {}</p>", slug),
        category,
        published_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        featured_image: None,
    }
}

/// Create a fetched post with its related references
pub fn test_post(
    id: i64,
    slug: &str,
    category: Option<CategoryRef>,
    related: Vec<ArticleRef>,
) -> FetchedPost {
    FetchedPost {
        article: test_article(id, slug, category),
        related,
    }
}

/// Create a candidate reference without a category
pub fn test_ref(id: i64, slug: &str) -> ArticleRef {
    ArticleRef {
        id: ArticleId(id),
        slug: Slug::parse(slug).unwrap(),
        category: None,
    }
}
