//! PostgreSQL containers for closure store tests
//!
//! A container is started once per test binary and migrated with the same
//! migrations the application runs. Each test opens its own pool through
//! `TestDatabase::connect`, because every `#[tokio::test]` runs on a separate
//! runtime and a pool cannot outlive the runtime that created it.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

use core_kernel::{ClosureId, UserId};

const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "ledger";
const POSTGRES_PASSWORD: &str = "ledger";
const POSTGRES_DB: &str = "closures_test";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Where a test database can be reached
#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub host: String,
    pub port: u16,
}

impl TestDatabaseConfig {
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            POSTGRES_USER, POSTGRES_PASSWORD, self.host, self.port, POSTGRES_DB
        )
    }
}

/// A migrated PostgreSQL container
pub struct TestDatabase {
    _container: ContainerAsync<Postgres>,
    pub config: TestDatabaseConfig,
}

impl TestDatabase {
    /// Starts a container and applies the migrations
    ///
    /// # Errors
    ///
    /// Returns an error if Docker is unavailable, the container does not
    /// start, or a migration fails
    pub async fn start() -> Result<Self, BoxError> {
        let container = Postgres::default()
            .with_db_name(POSTGRES_DB)
            .with_user(POSTGRES_USER)
            .with_password(POSTGRES_PASSWORD)
            .with_tag(POSTGRES_TAG)
            .start()
            .await?;

        let config = TestDatabaseConfig {
            host: container.get_host().await?.to_string(),
            port: container.get_host_port_ipv4(5432).await?,
        };

        let database = Self {
            _container: container,
            config,
        };

        let pool = database.connect().await?;
        sqlx::migrate!("../../migrations").run(&pool).await?;
        pool.close().await;

        Ok(database)
    }

    /// Opens a small pool on the current runtime
    pub async fn connect(&self) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&self.config.connection_url())
            .await
    }

    /// A user id no other test uses
    ///
    /// Tests on the shared database isolate their rows by owner instead of
    /// truncating tables, since they run concurrently.
    pub fn unique_user() -> UserId {
        UserId::new(format!("user-{}", ClosureId::new()))
    }

    pub async fn closure_count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM closures").fetch_one(pool).await
    }
}

static SHARED_TEST_DB: OnceCell<Arc<TestDatabase>> = OnceCell::const_new();

/// The database shared by all tests of a binary
///
/// # Panics
///
/// Panics if the container cannot be started
pub async fn get_shared_test_database() -> Arc<TestDatabase> {
    SHARED_TEST_DB
        .get_or_init(|| async {
            Arc::new(
                TestDatabase::start()
                    .await
                    .expect("Failed to start the shared test database"),
            )
        })
        .await
        .clone()
}

/// A database of its own, for tests that need an empty table
pub async fn create_isolated_test_database() -> Result<TestDatabase, BoxError> {
    TestDatabase::start().await
}
