//! Test utilities
//!
//! `InMemoryContentSource` stands in for the CMS: posts and category
//! listings are registered up front, and individual slugs can be made to
//! fail, hang or answer late. Every call is recorded so tests can assert on
//! what the feed asked for. `fixtures` builds posts, refs and categories.

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
