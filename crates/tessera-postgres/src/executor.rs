//! Execution seam for compiled statements.
//!
//! The compiler never talks to the database itself. Statements are handed to an
//! [`Executor`]; [`PgExecutor`] is the sqlx-backed implementation with:
//! - Automatic retry on transient errors (deadlock, serialization failure)
//! - Tracing spans for query monitoring
//! - Slow query logging

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Postgres;
use tracing::{debug, instrument, warn};

use crate::condition::Conditions;
use crate::query::{QueryOptions, TableQuery};
use crate::{bind_all, ExtractedValue, Result, TesseraError};

/// Runs parameterized SQL.
#[async_trait]
pub trait Executor: Send + Sync {
    type Row: Send;

    /// Runs a statement and returns every row.
    async fn fetch_all(&self, sql: &str, params: &[ExtractedValue]) -> Result<Vec<Self::Row>>;

    /// Runs a statement returning a single BIGINT (e.g. `COUNT(*)`).
    async fn fetch_count(&self, sql: &str, params: &[ExtractedValue]) -> Result<i64>;

    /// Runs a statement and returns the number of affected rows.
    async fn execute(&self, sql: &str, params: &[ExtractedValue]) -> Result<u64>;
}

/// Configuration for query execution with retry support.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum number of retries for transient errors
    pub max_retries: u32,
    /// Initial delay between retries in milliseconds
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
    /// Backoff multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Threshold for slow query logging in milliseconds
    pub slow_query_threshold_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 50,
            max_delay_ms: 2000,
            backoff_multiplier: 2.0,
            slow_query_threshold_ms: 1000,
        }
    }
}

impl ExecutorConfig {
    /// Create a new executor config with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = (self.initial_delay_ms as f64) * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_millis((delay_ms as u64).min(self.max_delay_ms))
    }
}

/// [`Executor`] over a sqlx PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgExecutor {
    pool: PgPool,
    config: ExecutorConfig,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(pool: PgPool, config: ExecutorConfig) -> Self {
        Self { pool, config }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn with_retry<T, F, Fut>(&self, sql: &str, mut run: F) -> Result<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        let mut attempt = 0;
        loop {
            let start = Instant::now();
            match run().await {
                Ok(value) => {
                    self.log_query_completion(sql, start.elapsed(), attempt);
                    return Ok(value);
                }
                Err(err) => {
                    let retryable = err.is_retryable();
                    warn!(
                        sql = %sql.chars().take(50).collect::<String>(),
                        attempt = attempt,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        retryable = retryable,
                        error = %err,
                        "Query failed"
                    );

                    if !retryable || attempt >= self.config.max_retries {
                        return Err(err);
                    }

                    let delay = self.config.delay_for_attempt(attempt);
                    debug!(delay_ms = delay.as_millis() as u64, "Retrying after delay");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn log_query_completion(&self, sql: &str, elapsed: Duration, attempt: u32) {
        let elapsed_ms = elapsed.as_millis() as u64;
        let sql_preview: String = sql.chars().take(100).collect();

        if elapsed_ms >= self.config.slow_query_threshold_ms {
            warn!(
                sql = %sql_preview,
                elapsed_ms = elapsed_ms,
                threshold_ms = self.config.slow_query_threshold_ms,
                attempt = attempt,
                "Slow query detected"
            );
        } else {
            debug!(sql = %sql_preview, elapsed_ms = elapsed_ms, attempt = attempt, "Query completed");
        }
    }
}

impl From<PgPool> for PgExecutor {
    fn from(pool: PgPool) -> Self {
        Self::new(pool)
    }
}

#[async_trait]
impl Executor for PgExecutor {
    type Row = PgRow;

    #[instrument(skip(self, params), fields(sql_preview = %sql.chars().take(100).collect::<String>(), params = params.len()))]
    async fn fetch_all(&self, sql: &str, params: &[ExtractedValue]) -> Result<Vec<PgRow>> {
        self.with_retry(sql, || async move {
            let arguments = bind_all(params)?;
            Ok::<_, TesseraError>(sqlx::query_with(sql, arguments).fetch_all(&self.pool).await?)
        })
        .await
    }

    #[instrument(skip(self, params), fields(sql_preview = %sql.chars().take(100).collect::<String>(), params = params.len()))]
    async fn fetch_count(&self, sql: &str, params: &[ExtractedValue]) -> Result<i64> {
        self.with_retry(sql, || async move {
            let arguments = bind_all(params)?;
            Ok::<_, TesseraError>(sqlx::query_scalar_with::<Postgres, i64, _>(sql, arguments)
                .fetch_one(&self.pool)
                .await?)
        })
        .await
    }

    #[instrument(skip(self, params), fields(sql_preview = %sql.chars().take(100).collect::<String>(), params = params.len()))]
    async fn execute(&self, sql: &str, params: &[ExtractedValue]) -> Result<u64> {
        let rows_affected = self
            .with_retry(sql, || async move {
                let arguments = bind_all(params)?;
                Ok::<_, TesseraError>(sqlx::query_with(sql, arguments).execute(&self.pool).await?)
            })
            .await?
            .rows_affected();
        debug!(rows_affected = rows_affected, "Query executed successfully");
        Ok(rows_affected)
    }
}

impl TableQuery {
    /// Selects matching rows.
    pub async fn find<E: Executor>(
        &self,
        executor: &E,
        conditions: &Conditions,
        options: &QueryOptions,
    ) -> Result<Vec<E::Row>> {
        let (sql, params) = self.build_select(conditions, options)?;
        executor.fetch_all(&sql, &params).await
    }

    /// Counts matching rows.
    pub async fn count<E: Executor>(&self, executor: &E, conditions: &Conditions) -> Result<i64> {
        let (sql, params) = self.build_count(conditions)?;
        executor.fetch_count(&sql, &params).await
    }

    /// Inserts one row and returns it.
    pub async fn insert<E: Executor>(
        &self,
        executor: &E,
        values: &[(String, ExtractedValue)],
    ) -> Result<Vec<E::Row>> {
        let (sql, params) = self.build_insert(values)?;
        executor.fetch_all(&sql, &params).await
    }

    /// Updates matching rows; returns the number of rows affected.
    pub async fn update_where<E: Executor>(
        &self,
        executor: &E,
        conditions: &Conditions,
        values: &[(String, ExtractedValue)],
    ) -> Result<u64> {
        let (sql, params) = self.build_update(conditions, values)?;
        executor.execute(&sql, &params).await
    }

    /// Deletes matching rows; returns the number of rows affected.
    pub async fn delete_where<E: Executor>(&self, executor: &E, conditions: &Conditions) -> Result<u64> {
        let (sql, params) = self.build_delete(conditions)?;
        executor.execute(&sql, &params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executor_config_default() {
        let config = ExecutorConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_delay_ms, 50);
        assert_eq!(config.slow_query_threshold_ms, 1000);
    }

    #[test]
    fn test_executor_config_no_retry() {
        assert_eq!(ExecutorConfig::no_retry().max_retries, 0);
    }

    #[test]
    fn test_delay_calculation() {
        let config = ExecutorConfig {
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
            ..Default::default()
        };

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(5), Duration::from_millis(3200));
        // capped
        assert_eq!(config.delay_for_attempt(6), Duration::from_millis(5000));
    }
}
