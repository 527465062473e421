//! Application layer
//!
//! Contains the feed use cases. The controller drives a single feed; the
//! session service owns all open feeds and fans live-coverage reports out
//! to them.

pub mod feed_controller;
pub mod feed_session_service;

pub use feed_controller::{AdvanceOutcome, FeedController, FeedSettings, FeedSnapshot};
pub use feed_session_service::{spawn_session_sweeper, FeedSessionService, SessionId};
