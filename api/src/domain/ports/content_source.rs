//! Content source port trait
//!
//! Defines the interface for reading posts from the CMS.

use async_trait::async_trait;

use crate::domain::entities::{ArticleId, ArticleRef, CategoryRef, FetchedPost, Slug};
use crate::error::ContentSourceError;

/// Port trait for the remote content query service
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch a post by slug together with the posts related to it.
    /// `Ok(None)` when the CMS has no such post.
    async fn fetch_post(&self, slug: &Slug) -> Result<Option<FetchedPost>, ContentSourceError>;

    /// List more posts in a category, leaving out every id in `exclude`
    async fn fetch_more_in_category(
        &self,
        category: &CategoryRef,
        exclude: &[ArticleId],
    ) -> Result<Vec<ArticleRef>, ContentSourceError>;
}
