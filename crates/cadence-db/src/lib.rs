//! # cadence-db
//!
//! Persistence and clone orchestration for cadence.
//!
//! This crate provides:
//! - Connection pool management
//! - The PostgreSQL content store and an in-memory store for tests
//! - The row cloner and the per-aggregate clone engine
//! - The library cascade and the [`CloneManager`] entry point
//!
//! ## Example
//!
//! ```rust,ignore
//! use cadence_db::{AccessContext, AggregateKind, Database, HubGate, RootOverrides};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/cadence").await?;
//!     let manager = db.clone_manager(HubGate::new());
//!
//!     let cloned = manager
//!         .clone(
//!             &AccessContext::internal(),
//!             AggregateKind::Program,
//!             program_id,
//!             RootOverrides::empty(AggregateKind::Program),
//!         )
//!         .await?;
//!
//!     println!("Created program {} with {} rows", cloned.root.id(), cloned.included.len());
//!     Ok(())
//! }
//! ```
pub mod cascade;
pub mod cloner;
pub mod engine;
pub mod manager;
pub mod materialize;
pub mod memory;
pub mod pool;
pub mod postgres;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use cadence_core::*;

pub use manager::CloneManager;
pub use materialize::Materializer;
pub use memory::{MemoryContentStore, MemoryContentTx};
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use postgres::{PgContentStore, PgContentTx};

/// Connection pool plus the content store built on it.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Content store for clone transactions.
    pub content: PgContentStore,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            content: PgContentStore::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// Clone manager over this database, checked by `gate`.
    pub fn clone_manager<G: AccessGate + Validator>(&self, gate: G) -> CloneManager<PgContentStore, G> {
        CloneManager::new(self.content.clone(), gate)
    }
}
