//! WPGraphQL documents and response shapes

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{Article, ArticleId, ArticleRef, CategoryRef, FetchedPost, Slug};
use crate::error::ContentSourceError;

pub const POST_BY_SLUG: &str = r#"
query PostBySlug($slug: ID!) {
  post(id: $slug, idType: SLUG) {
    databaseId
    slug
    title
    content
    dateGmt
    categories(first: 1) { nodes { databaseId slug name } }
    tags { nodes { databaseId } }
    featuredImage { node { sourceUrl } }
  }
}
"#;

pub const RELATED_BY_TAGS: &str = r#"
query RelatedByTags($tags: [ID], $exclude: [ID], $first: Int) {
  posts(first: $first, where: { tagIn: $tags, notIn: $exclude }) {
    nodes {
      databaseId
      slug
      categories(first: 1) { nodes { databaseId slug name } }
    }
  }
}
"#;

pub const POSTS_IN_CATEGORY: &str = r#"
query PostsInCategory($category: Int, $exclude: [ID], $first: Int) {
  posts(first: $first, where: { categoryId: $category, notIn: $exclude }) {
    nodes {
      databaseId
      slug
      categories(first: 1) { nodes { databaseId slug name } }
    }
  }
}
"#;

/// Request body for a GraphQL call
#[derive(Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: serde_json::Value,
}

#[derive(Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryNode {
    pub database_id: i64,
    pub slug: String,
    pub name: String,
}

impl From<CategoryNode> for CategoryRef {
    fn from(node: CategoryNode) -> Self {
        CategoryRef {
            id: node.database_id,
            slug: node.slug,
            name: node.name,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagNode {
    pub database_id: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaNode {
    pub source_url: Option<String>,
}

#[derive(Deserialize)]
pub struct FeaturedImageEdge {
    pub node: Option<MediaNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostNode {
    pub database_id: i64,
    pub slug: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub date_gmt: Option<String>,
    #[serde(default)]
    pub categories: Option<Connection<CategoryNode>>,
    #[serde(default)]
    pub tags: Option<Connection<TagNode>>,
    pub featured_image: Option<FeaturedImageEdge>,
}

impl PostNode {
    pub fn category(&self) -> Option<CategoryRef> {
        self.categories
            .as_ref()
            .and_then(|c| c.nodes.first())
            .map(|node| CategoryRef {
                id: node.database_id,
                slug: node.slug.clone(),
                name: node.name.clone(),
            })
    }

    pub fn tag_ids(&self) -> Vec<i64> {
        self.tags
            .as_ref()
            .map(|t| t.nodes.iter().map(|n| n.database_id).collect())
            .unwrap_or_default()
    }

    pub fn into_fetched_post(
        self,
        related: Vec<ArticleRef>,
    ) -> Result<FetchedPost, ContentSourceError> {
        let category = self.category();
        let slug = Slug::parse(&self.slug).map_err(|e| {
            ContentSourceError::Deserialization(format!("post {}: {}", self.database_id, e))
        })?;
        let published_at = match self.date_gmt.as_deref() {
            Some(raw) => parse_wp_date(raw)?,
            None => DateTime::<Utc>::default(),
        };

        Ok(FetchedPost {
            article: Article {
                id: ArticleId(self.database_id),
                slug,
                title: self.title.unwrap_or_default(),
                body: self.content.unwrap_or_default(),
                category,
                published_at,
                featured_image: self
                    .featured_image
                    .and_then(|edge| edge.node)
                    .and_then(|node| node.source_url),
            },
            related,
        })
    }
}

#[derive(Deserialize)]
pub struct PostData {
    pub post: Option<PostNode>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryNode {
    pub database_id: i64,
    pub slug: String,
    #[serde(default)]
    pub categories: Option<Connection<CategoryNode>>,
}

#[derive(Deserialize)]
pub struct PostsData {
    #[serde(default)]
    pub posts: Connection<SummaryNode>,
}

impl PostsData {
    /// Convert a listing to candidate references, dropping entries whose
    /// slug cannot be used in a path
    pub fn into_refs(self) -> Vec<ArticleRef> {
        self.posts
            .nodes
            .into_iter()
            .filter_map(|node| match Slug::parse(&node.slug) {
                Ok(slug) => Some(ArticleRef {
                    id: ArticleId(node.database_id),
                    slug,
                    category: node
                        .categories
                        .and_then(|c| c.nodes.into_iter().next())
                        .map(CategoryRef::from),
                }),
                Err(e) => {
                    tracing::warn!(
                        article_id = node.database_id,
                        error = %e,
                        "Ignoring listed post with unusable slug"
                    );
                    None
                }
            })
            .collect()
    }
}

/// `dateGmt` comes without an offset and is read as UTC.
/// RFC 3339 values keep their offset.
pub fn parse_wp_date(raw: &str) -> Result<DateTime<Utc>, ContentSourceError> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Ok(date.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| ContentSourceError::Deserialization(format!("date {:?}: {}", raw, e)))
}
