//! Data models
//!
//! Database entities (User, Client, Post) and the service-level inputs used
//! to create and modify them.

mod client;
mod post;
mod user;

pub use client::{Client, CreateClientInput};
pub use post::{CreatePostInput, Post, PostFilter, PostPatch, PostStatus};
pub use user::{CreateUserInput, User, UserRole};

/// Offset/limit window for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    pub skip: i64,
    pub limit: i64,
}

impl ListParams {
    pub const DEFAULT_LIMIT: i64 = 100;
    pub const MAX_LIMIT: i64 = 1000;

    /// Negative values are clamped to zero and the limit is capped at
    /// [`Self::MAX_LIMIT`].
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip: skip.max(0),
            limit: limit.clamp(0, Self::MAX_LIMIT),
        }
    }
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}
