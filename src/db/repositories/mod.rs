//! Database repositories
//!
//! One repository per entity. Each hides the SQLite/MySQL split behind a
//! trait so services can be tested against an in-memory database.

pub mod client;
pub mod post;
pub mod user;

pub use client::{ClientRepository, SqlxClientRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use user::{SqlxUserRepository, UserRepository};
