//! Article domain entity
//!
//! Articles are owned by the CMS. The feed only ever reads them and appends
//! them to a session, so nothing here is mutable after construction.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Longest slug the CMS will hand out
const MAX_SLUG_LEN: usize = 200;

static SLUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_%-]*$").expect("valid slug regex"));

/// CMS database identifier of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub i64);

impl From<i64> for ArticleId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// URL-safe routing key of a post
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Validate and wrap a slug coming from outside the CMS adapter
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::Validation("slug must not be empty".to_string()));
        }
        if trimmed.len() > MAX_SLUG_LEN {
            return Err(DomainError::Validation(format!(
                "slug longer than {} characters",
                MAX_SLUG_LEN
            )));
        }
        if !SLUG_PATTERN.is_match(trimmed) {
            return Err(DomainError::Validation(format!(
                "slug '{}' contains invalid characters",
                trimmed
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Slug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Slug {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Primary category of a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

/// A fully fetched post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub id: ArticleId,
    pub slug: Slug,
    pub title: String,
    /// Rendered HTML body
    pub body: String,
    pub category: Option<CategoryRef>,
    pub published_at: DateTime<Utc>,
    pub featured_image: Option<String>,
}

impl Article {
    /// Shareable site path: `/{category}/{slug}`, or `/{slug}` without a category.
    /// Slugs from the CMS are already percent-encoded.
    pub fn public_path(&self) -> String {
        match &self.category {
            Some(category) => format!("/{}/{}", category.slug, self.slug),
            None => format!("/{}", self.slug),
        }
    }
}

/// A candidate discovered through a related or same-category listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleRef {
    pub id: ArticleId,
    pub slug: Slug,
    pub category: Option<CategoryRef>,
}

/// What the content source returns for a single post lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchedPost {
    pub article: Article,
    pub related: Vec<ArticleRef>,
}
