//! Services layer - Business logic
//!
//! Services validate input, enforce uniqueness and ownership rules and
//! translate repository failures into typed errors for the HTTP layer.

pub mod client;
pub mod password;
pub mod post;
pub mod token;
pub mod upload;
pub mod user;

pub use client::{ClientService, ClientServiceError};
pub use password::{hash_password, verify_password};
pub use post::{PostDetails, PostService, PostServiceError};
pub use token::{Claims, TokenError, TokenService};
pub use upload::{ImageStore, StoredImage, UploadError};
pub use user::{UserService, UserServiceError};
