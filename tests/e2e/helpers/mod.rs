use lingua_audio::infrastructure::db::DbPool;
use once_cell::sync::Lazy;
use std::sync::Arc;
use testcontainers::{clients::Cli, Container};
use testcontainers_modules::postgres::Postgres;

pub mod audio_store;
pub mod db_pool;
pub mod fixtures;

use db_pool::{DatabasePool, PooledDatabase};
use fixtures::TestFixtures;

// Docker client for test containers
static DOCKER: Lazy<Cli> = Lazy::new(Cli::default);

// Shared PostgreSQL container for all tests
static SHARED_CONTAINER: Lazy<SharedContainer> = Lazy::new(SharedContainer::new);

// Global database pool
static DB_POOL: Lazy<DatabasePool> = Lazy::new(|| DatabasePool::new(SHARED_CONTAINER.port));

/// Shared container that lives for the duration of all tests
struct SharedContainer {
    _container: Container<'static, Postgres>,
    port: u16,
}

impl SharedContainer {
    fn new() -> Self {
        let container = DOCKER.run(Postgres::default());
        let port = container.get_host_port_ipv4(5432);

        println!("🐳 Started shared PostgreSQL container on port {}", port);

        Self {
            _container: container,
            port,
        }
    }
}

/// Per-test handle on an isolated, migrated database
pub struct TestContext {
    pub pool: Arc<DbPool>,
    pub fixtures: TestFixtures,
    _db: PooledDatabase,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        let pooled_db = DB_POOL.get_database().await?;
        let pool = Arc::new(pooled_db.pool.clone());

        Ok(Self {
            fixtures: TestFixtures::new(pool.clone()),
            pool,
            _db: pooled_db,
        })
    }
}
