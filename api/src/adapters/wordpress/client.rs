//! WPGraphQL content source

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::queries::{
    GraphQlRequest, GraphQlResponse, PostData, PostsData, POSTS_IN_CATEGORY, POST_BY_SLUG,
    RELATED_BY_TAGS,
};
use crate::domain::entities::{ArticleId, ArticleRef, CategoryRef, FetchedPost, Slug};
use crate::domain::ports::ContentSource;
use crate::error::ContentSourceError;

/// Content source backed by a WordPress site running WPGraphQL
pub struct WordPressClient {
    http: Client,
    endpoint: String,
    auth_token: Option<String>,
    related_limit: u32,
    category_limit: u32,
}

impl WordPressClient {
    pub fn new(
        endpoint: String,
        auth_token: Option<String>,
        related_limit: u32,
        category_limit: u32,
    ) -> Self {
        Self {
            http: Client::new(),
            endpoint,
            auth_token,
            related_limit,
            category_limit,
        }
    }

    async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, ContentSourceError> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .json(&GraphQlRequest { query, variables });
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        let resp = request.send().await?;

        let body: GraphQlResponse<T> = self.handle_response(resp).await?;
        if !body.errors.is_empty() {
            let messages: Vec<_> = body.errors.into_iter().map(|e| e.message).collect();
            return Err(ContentSourceError::GraphQl(messages.join("; ")));
        }
        body.data.ok_or_else(|| {
            ContentSourceError::Deserialization("response has no data".to_string())
        })
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ContentSourceError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| ContentSourceError::Deserialization(e.to_string()))
        } else if status.as_u16() == 401 {
            Err(ContentSourceError::Unauthorized)
        } else if status.as_u16() == 429 {
            Err(ContentSourceError::RateLimited)
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(ContentSourceError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn related_posts(
        &self,
        post_id: i64,
        tags: Vec<i64>,
        category: Option<&CategoryRef>,
    ) -> Result<Vec<ArticleRef>, ContentSourceError> {
        let data: PostsData = if !tags.is_empty() {
            self.query(
                RELATED_BY_TAGS,
                json!({ "tags": tags, "exclude": [post_id], "first": self.related_limit }),
            )
            .await?
        } else if let Some(category) = category {
            self.query(
                POSTS_IN_CATEGORY,
                json!({
                    "category": category.id,
                    "exclude": [post_id],
                    "first": self.related_limit
                }),
            )
            .await?
        } else {
            return Ok(Vec::new());
        };
        Ok(data.into_refs())
    }
}

#[async_trait]
impl ContentSource for WordPressClient {
    async fn fetch_post(&self, slug: &Slug) -> Result<Option<FetchedPost>, ContentSourceError> {
        let data: PostData = self
            .query(POST_BY_SLUG, json!({ "slug": slug.as_str() }))
            .await?;
        let Some(node) = data.post else {
            tracing::debug!(slug = %slug, "Post not found in CMS");
            return Ok(None);
        };

        let related = self
            .related_posts(node.database_id, node.tag_ids(), node.category().as_ref())
            .await?;
        tracing::debug!(
            slug = %slug,
            article_id = node.database_id,
            related = related.len(),
            "Fetched post"
        );
        node.into_fetched_post(related).map(Some)
    }

    async fn fetch_more_in_category(
        &self,
        category: &CategoryRef,
        exclude: &[ArticleId],
    ) -> Result<Vec<ArticleRef>, ContentSourceError> {
        let exclude: Vec<i64> = exclude.iter().map(|id| id.0).collect();
        let data: PostsData = self
            .query(
                POSTS_IN_CATEGORY,
                json!({
                    "category": category.id,
                    "exclude": exclude,
                    "first": self.category_limit
                }),
            )
            .await?;
        Ok(data.into_refs())
    }
}
