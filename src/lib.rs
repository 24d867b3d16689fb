//! Blog Panel - a multi-tenant blog content backend
//!
//! Clients (tenants identified by domain) own blog posts written by
//! registered users. Everything except login and registration sits behind
//! bearer-token authentication.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
