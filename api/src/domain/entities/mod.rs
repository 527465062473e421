//! Domain entities
//!
//! Pure domain models for the article feed. Nothing in here performs I/O.

pub mod article;
pub mod feed_session;
pub mod visibility;

pub use article::{Article, ArticleId, ArticleRef, CategoryRef, FetchedPost, Slug};
pub use feed_session::{AppendResult, FeedPhase, FeedSession, Prefetched};
pub use visibility::{AddressBarUpdate, ArticleBounds};
