//! # syncterest-store
//!
//! Local cache layer for the Syncterest client. Two parts:
//!
//! - a SQLite-backed offline copy of rows synced from the backend
//!   (profiles, conversations, messages, reactions, channels, events,
//!   groups, notifications), exposed as typed CRUD helpers on a
//!   [`Database`] handle;
//! - the in-memory [`QueryCache`] and per-conversation
//!   [`ConversationTimeline`], which hold transient query results and the
//!   optimistic-merge state the UI renders from.

pub mod channels;
pub mod conversations;
pub mod database;
pub mod events;
pub mod groups;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod notifications;
pub mod profiles;
pub mod query_cache;
pub mod reactions;
pub mod timeline;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
pub use query_cache::{CacheEntry, QueryCache, QueryKey};
pub use timeline::{ConversationTimeline, ReactionToggle};
