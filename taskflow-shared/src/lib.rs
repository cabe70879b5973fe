//! # Taskflow Shared Library
//!
//! Domain core of the Taskflow collaborative board service: everything the
//! HTTP server needs except the HTTP layer itself.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their SQL
//! - `store`: Persistence boundary (PostgreSQL and in-memory implementations)
//! - `services`: Board, list, task, identity and activity operations
//! - `auth`: Passwords, tokens, bearer middleware and the membership guard
//! - `ordering`: Sparse position keys for lists and tasks
//! - `pagination`: Page parsing and the pagination envelope
//! - `realtime`: Connection registry and board event delivery
//! - `redis`: Cross-instance event fan-out
//! - `db`: Connection pool and migrations
//! - `error`: Domain error taxonomy

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod ordering;
pub mod pagination;
pub mod realtime;
pub mod redis;
pub mod services;
pub mod store;

/// Current version of the Taskflow shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
