//! # Taskflow API Server Library
//!
//! HTTP and WebSocket surface for the collaborative Kanban backend. The
//! domain lives in `taskflow_shared`; this crate maps it onto routes.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Response security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
