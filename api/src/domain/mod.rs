//! Domain layer
//!
//! Contains pure feed logic with no external dependencies.
//! - `entities`: Articles, the feed session state machine, viewport geometry
//! - `ports`: Trait definitions for external dependencies

pub mod entities;
pub mod ports;
