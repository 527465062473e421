//! WordPress adapter
//!
//! Content source backed by the CMS's WPGraphQL endpoint.

pub mod client;
pub mod queries;

pub use client::WordPressClient;
