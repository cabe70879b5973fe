/// Database plumbing
///
/// # Modules
///
/// - `pool`: PostgreSQL pool construction and liveness checks
/// - `migrations`: Embedded schema migrations from the workspace `migrations/` directory
///
/// Row types and their queries live in [`crate::models`]; services reach them
/// through [`crate::store::PgStore`].
///
/// # Example
///
/// ```no_run
/// use taskflow_shared::db::{migrations::run_migrations, pool::{create_pool, PoolConfig}};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(PoolConfig::new(std::env::var("DATABASE_URL")?)).await?;
/// run_migrations(&pool).await?;
/// # Ok(())
/// # }
/// ```

pub mod migrations;
pub mod pool;
