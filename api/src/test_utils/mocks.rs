//! Mock implementations of port traits
//!
//! In-memory content source that can be configured per test and records
//! every call it receives.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::domain::entities::{ArticleId, ArticleRef, CategoryRef, FetchedPost, Slug};
use crate::domain::ports::ContentSource;
use crate::error::ContentSourceError;

// ============================================================================
// In-Memory Content Source
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    Post(String),
    Category { id: i64, excluded: Vec<i64> },
}

#[derive(Default)]
pub struct InMemoryContentSource {
    posts: HashMap<String, FetchedPost>,
    listings: HashMap<i64, Vec<ArticleRef>>,
    failing: HashSet<String>,
    failing_categories: HashSet<i64>,
    hanging: HashSet<String>,
    delay: Option<Duration>,
    calls: Arc<RwLock<Vec<SourceCall>>>,
}

impl InMemoryContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a post by its slug
    pub fn with_post(mut self, post: FetchedPost) -> Self {
        self.posts.insert(post.article.slug.to_string(), post);
        self
    }

    /// Answer requests for `slug` with a post that may carry another canonical slug
    pub fn with_post_at(mut self, slug: &str, post: FetchedPost) -> Self {
        self.posts.insert(slug.to_string(), post);
        self
    }

    /// Serve a "more in category" listing; excluded ids are filtered out per call
    pub fn with_category_listing(mut self, category: &CategoryRef, refs: Vec<ArticleRef>) -> Self {
        self.listings.insert(category.id, refs);
        self
    }

    /// Fail every fetch of this slug
    pub fn failing(mut self, slug: &str) -> Self {
        self.failing.insert(slug.to_string());
        self
    }

    /// Fail every lookup in this category
    pub fn failing_category(mut self, category: &CategoryRef) -> Self {
        self.failing_categories.insert(category.id);
        self
    }

    /// Never answer fetches of this slug
    pub fn hanging(mut self, slug: &str) -> Self {
        self.hanging.insert(slug.to_string());
        self
    }

    /// Delay every answer
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<SourceCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    pub fn post_fetches_of(&self, slug: &str) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, SourceCall::Post(s) if s == slug))
            .count()
    }

    /// (category id, excluded ids) for every category lookup
    pub fn category_lookups(&self) -> Vec<(i64, Vec<i64>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SourceCall::Category { id, excluded } => Some((id, excluded)),
                SourceCall::Post(_) => None,
            })
            .collect()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ContentSource for InMemoryContentSource {
    async fn fetch_post(&self, slug: &Slug) -> Result<Option<FetchedPost>, ContentSourceError> {
        self.calls
            .write()
            .unwrap()
            .push(SourceCall::Post(slug.to_string()));

        if self.hanging.contains(slug.as_str()) {
            std::future::pending::<()>().await;
        }
        self.pause().await;

        if self.failing.contains(slug.as_str()) {
            return Err(ContentSourceError::Api {
                status: 500,
                message: format!("failed to load {}", slug),
            });
        }
        Ok(self.posts.get(slug.as_str()).cloned())
    }

    async fn fetch_more_in_category(
        &self,
        category: &CategoryRef,
        exclude: &[ArticleId],
    ) -> Result<Vec<ArticleRef>, ContentSourceError> {
        self.calls.write().unwrap().push(SourceCall::Category {
            id: category.id,
            excluded: exclude.iter().map(|id| id.0).collect(),
        });
        self.pause().await;

        if self.failing_categories.contains(&category.id) {
            return Err(ContentSourceError::GraphQl("category lookup failed".into()));
        }
        Ok(self
            .listings
            .get(&category.id)
            .map(|refs| {
                refs.iter()
                    .filter(|r| !exclude.contains(&r.id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
