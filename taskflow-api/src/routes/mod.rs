/// API route handlers
///
/// Handlers are thin: parse and validate the request, call one service
/// operation, shape the response. Organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Signup, login, token refresh
/// - `users`: Current user and user search
/// - `boards`: Boards and membership
/// - `lists`: Lists within a board
/// - `tasks`: Tasks, moves, assignment and search
/// - `activity`: Board audit trail
/// - `realtime`: WebSocket upgrade and room protocol

pub mod activity;
pub mod auth;
pub mod boards;
pub mod health;
pub mod lists;
pub mod realtime;
pub mod tasks;
pub mod users;
