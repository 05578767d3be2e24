//! Postgres repository implementation using Diesel.
//!
//! Each profit is one row keyed by its 24-hex identifier. The identifier is
//! generated here, on the store side, before the insert, so callers see the
//! same contract as the in-memory store.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use diesel::pg::{Pg, PgConnection};
use diesel::query_builder::BoxedDeleteStatement;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task;

use crate::api::{NewProfit, Profit, ProfitChanges, ProfitId};
use crate::db::repository::{
    ErrorContext, ProfitFilter, ProfitRepository, RepositoryError, RepositoryResult,
};

mod models;
mod schema;

use models::*;
use schema::profits;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    ///
    /// See the module documentation for the variables read.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let defaults = Self::default();
        Ok(Self {
            database_url,
            max_pool_size: env_or("PG_POOL_MAX", defaults.max_pool_size),
            min_pool_size: env_or("PG_POOL_MIN", defaults.min_pool_size),
            connection_timeout_sec: env_or("PG_CONN_TIMEOUT_SEC", defaults.connection_timeout_sec),
            idle_timeout_sec: env_or("PG_IDLE_TIMEOUT_SEC", defaults.idle_timeout_sec),
            max_retries: env_or("PG_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_or("PG_RETRY_DELAY_MS", defaults.retry_delay_ms),
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Pool health statistics.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of connections currently in use
    pub connections_in_use: u32,
    /// Number of idle connections
    pub idle_connections: u32,
    /// Total number of connections in the pool
    pub total_connections: u32,
    /// Maximum pool size
    pub max_size: u32,
    /// Total successful queries executed
    pub total_queries: u64,
    /// Total failed queries
    pub failed_queries: u64,
    /// Total retried operations
    pub retried_operations: u64,
}

/// Diesel-backed repository for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
    // Metrics counters
    total_queries: Arc<AtomicU64>,
    failed_queries: Arc<AtomicU64>,
    retried_operations: Arc<AtomicU64>,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::unavailable(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::unavailable(e.to_string(), ErrorContext::new("run_migrations"))
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self {
            pool,
            config,
            total_queries: Arc::new(AtomicU64::new(0)),
            failed_queries: Arc::new(AtomicU64::new(0)),
            retried_operations: Arc::new(AtomicU64::new(0)),
        })
    }

    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;

        Ok(())
    }

    /// Execute a database operation with automatic retry for transient failures.
    ///
    /// Diesel is blocking, so the work runs on the blocking thread pool.
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;
        let total_queries = self.total_queries.clone();
        let failed_queries = self.failed_queries.clone();
        let retried_operations = self.retried_operations.clone();

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    retried_operations.fetch_add(1, Ordering::Relaxed);
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2;
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::unavailable(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1)),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(err);
                    }
                };

                total_queries.fetch_add(1, Ordering::Relaxed);
                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => {
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(e);
                    }
                }
            }

            failed_queries.fetch_add(1, Ordering::Relaxed);
            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal(
                    "Max retries exceeded with no error captured",
                    ErrorContext::new("with_conn"),
                )
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }

    /// Current pool state and query statistics.
    pub fn get_pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections_in_use: state.connections - state.idle_connections,
            idle_connections: state.idle_connections,
            total_connections: state.connections,
            max_size: self.config.max_pool_size,
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            retried_operations: self.retried_operations.load(Ordering::Relaxed),
        }
    }
}

fn map_diesel_error(
    operation: &'static str,
    id: Option<ProfitId>,
) -> impl Fn(diesel::result::Error) -> RepositoryError {
    move |err| RepositoryError::from(err).within(operation, id)
}

fn filtered(filter: &ProfitFilter) -> profits::BoxedQuery<'static, Pg> {
    let mut query = profits::table.into_boxed();
    if let Some(ref name) = filter.name {
        query = query.filter(profits::name.eq(name.clone()));
    }
    if let Some(year) = filter.year {
        query = query.filter(profits::year.eq(year));
    }
    query
}

fn rows_to_profits(rows: Vec<ProfitRow>) -> RepositoryResult<Vec<Profit>> {
    rows.into_iter().map(ProfitRow::into_profit).collect()
}

#[async_trait]
impl ProfitRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(map_diesel_error("health_check", None))
        })
        .await
    }

    async fn close(&self) -> RepositoryResult<()> {
        let stats = self.get_pool_stats();
        log::info!(
            "Closing Postgres pool: {} connections, {} queries, {} failed, {} retried",
            stats.total_connections,
            stats.total_queries,
            stats.failed_queries,
            stats.retried_operations
        );
        Ok(())
    }

    async fn insert(&self, profit: NewProfit) -> RepositoryResult<Profit> {
        let stored = Profit::from_new(ProfitId::generate(), profit);
        let row = NewProfitRow::from(&stored);
        self.with_conn(move |conn| {
            diesel::insert_into(profits::table)
                .values(&row)
                .returning(ProfitRow::as_returning())
                .get_result::<ProfitRow>(conn)
                .map_err(map_diesel_error("insert", None))?
                .into_profit()
        })
        .await
    }

    async fn insert_many(&self, records: Vec<Profit>) -> RepositoryResult<usize> {
        let rows: Vec<NewProfitRow> = records.iter().map(NewProfitRow::from).collect();
        if rows.is_empty() {
            return Ok(0);
        }
        self.with_conn(move |conn| {
            diesel::insert_into(profits::table)
                .values(&rows)
                .execute(conn)
                .map_err(map_diesel_error("insert_many", None))
        })
        .await
    }

    async fn update_by_id(&self, id: ProfitId, changes: ProfitChanges) -> RepositoryResult<()> {
        let key = id.to_hex();
        self.with_conn(move |conn| {
            let matched = if changes.is_empty() {
                // Diesel rejects an empty SET clause; an empty update only has to match.
                profits::table
                    .find(&key)
                    .count()
                    .get_result::<i64>(conn)
                    .map_err(map_diesel_error("update_by_id", Some(id)))?
                    as usize
            } else {
                diesel::update(profits::table.find(&key))
                    .set(ProfitChangeset::from(changes.clone()))
                    .execute(conn)
                    .map_err(map_diesel_error("update_by_id", Some(id)))?
            };

            if matched == 0 {
                return Err(RepositoryError::not_found(id, "update_by_id"));
            }
            Ok(())
        })
        .await
    }

    async fn delete_by_id(&self, id: ProfitId) -> RepositoryResult<Option<Profit>> {
        let key = id.to_hex();
        self.with_conn(move |conn| {
            diesel::delete(profits::table.find(&key))
                .returning(ProfitRow::as_returning())
                .get_result::<ProfitRow>(conn)
                .optional()
                .map_err(map_diesel_error("delete_by_id", Some(id)))?
                .map(ProfitRow::into_profit)
                .transpose()
        })
        .await
    }

    async fn delete_many(&self, filter: ProfitFilter) -> RepositoryResult<usize> {
        self.with_conn(move |conn| {
            let mut query: BoxedDeleteStatement<'_, Pg, profits::table> =
                diesel::delete(profits::table).into_boxed();
            if let Some(ref name) = filter.name {
                query = query.filter(profits::name.eq(name.clone()));
            }
            if let Some(year) = filter.year {
                query = query.filter(profits::year.eq(year));
            }
            query
                .execute(conn)
                .map_err(map_diesel_error("delete_many", None))
        })
        .await
    }

    async fn find_by_id(&self, id: ProfitId) -> RepositoryResult<Option<Profit>> {
        let key = id.to_hex();
        self.with_conn(move |conn| {
            profits::table
                .find(&key)
                .select(ProfitRow::as_select())
                .first::<ProfitRow>(conn)
                .optional()
                .map_err(map_diesel_error("find_by_id", Some(id)))?
                .map(ProfitRow::into_profit)
                .transpose()
        })
        .await
    }

    async fn find(&self, filter: ProfitFilter) -> RepositoryResult<Vec<Profit>> {
        self.with_conn(move |conn| {
            let rows = filtered(&filter)
                .order(profits::seq.asc())
                .select(ProfitRow::as_select())
                .load::<ProfitRow>(conn)
                .map_err(map_diesel_error("find", None))?;
            rows_to_profits(rows)
        })
        .await
    }

    async fn count(&self, filter: ProfitFilter) -> RepositoryResult<usize> {
        self.with_conn(move |conn| {
            filtered(&filter)
                .count()
                .get_result::<i64>(conn)
                .map(|n| n as usize)
                .map_err(map_diesel_error("count", None))
        })
        .await
    }
}
