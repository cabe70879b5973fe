/// Database models for Taskflow
///
/// Each model owns its SQL. Query functions take any `PgExecutor`, so the same
/// code runs against the pool for reads and inside a transaction for writes.
///
/// # Models
///
/// - `user`: accounts and public profiles
/// - `board`: boards and the composed board views
/// - `member`: board membership (the authorization relation)
/// - `list`: ordered columns on a board
/// - `task`: ordered cards on a list
/// - `activity`: append-only audit trail

pub mod activity;
pub mod board;
pub mod list;
pub mod member;
pub mod task;
pub mod user;

/// Builds an `ILIKE` pattern matching `query` as a literal substring
pub(crate) fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
