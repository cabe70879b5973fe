/// Middleware modules for the API server
///
/// - `security`: response security headers
///
/// Authentication lives in `taskflow_shared::auth::middleware` so the
/// realtime handshake can share it.

pub mod security;
