//! Postgres repository implementation using Diesel.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Connection health monitoring
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
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task;

use crate::db::repository::{
    CallRepository, CoachingRepository, ErrorContext, RepositoryError, RepositoryResult,
    ShareDeletion, ShareRepository,
};
use crate::models::{
    Call, CallId, CallTimestamp, CoachingArtifacts, CoachingReport, NewCall, Objection, Question,
    ShareGrant, ShareToken, TranscriptSegment,
};

mod models;
mod schema;

use models::*;
use schema::*;

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
    /// See the module documentation for the variables read and their defaults.
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
    total_queries: Arc<AtomicU64>,
    failed_queries: Arc<AtomicU64>,
    retried_operations: Arc<AtomicU64>,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    ///
    /// Blocking; call from `spawn_blocking` inside an async context.
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
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        log::info!(
            "Postgres repository ready (pool max_size={})",
            config.max_pool_size
        );

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
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;
        Ok(())
    }

    /// Execute a database operation with automatic retry for transient failures.
    ///
    /// Retries up to `max_retries` times with exponential backoff when the
    /// error is retryable (connection errors, timeouts, serialization failures).
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
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1))
                                .retryable(),
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
                        log::warn!("Retrying database operation after error: {}", e);
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
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }

    /// Current pool state and query counters.
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

    /// Returns `(is_healthy, latency_ms, error_message)`.
    pub async fn health_check_detailed(&self) -> (bool, Option<u64>, Option<String>) {
        let start = Instant::now();
        let result = self.health_check().await;
        let latency = Some(start.elapsed().as_millis() as u64);
        match result {
            Ok(true) => (true, latency, None),
            Ok(false) => (false, latency, Some("Health check returned false".to_string())),
            Err(e) => (false, latency, Some(e.to_string())),
        }
    }
}

fn map_diesel_error(err: diesel::result::Error) -> RepositoryError {
    RepositoryError::from(err)
}

fn call_not_found(call_id: i64, operation: &str) -> RepositoryError {
    RepositoryError::not_found_with_context(
        format!("Call {} not found", call_id),
        ErrorContext::new(operation)
            .with_entity("call")
            .with_entity_id(call_id),
    )
}

fn load_call(conn: &mut PgConnection, call_id: i64, operation: &str) -> RepositoryResult<CallRow> {
    calls::table
        .find(call_id)
        .select(CallRow::as_select())
        .first::<CallRow>(conn)
        .optional()
        .map_err(map_diesel_error)?
        .ok_or_else(|| call_not_found(call_id, operation))
}

#[async_trait]
impl CallRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn store_call(&self, call: &NewCall, checksum: &str) -> RepositoryResult<Call> {
        let call = call.clone();
        let checksum = checksum.to_string();
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let existing = calls::table
                    .filter(calls::checksum.eq(&checksum))
                    .select(CallRow::as_select())
                    .first::<CallRow>(tx)
                    .optional()
                    .map_err(map_diesel_error)?;
                if let Some(row) = existing {
                    return Ok(Call::from(row));
                }

                let inserted: CallRow = diesel::insert_into(calls::table)
                    .values(&NewCallRow {
                        rep_name: call.rep_name.trim().to_string(),
                        customer_name: call.customer_name.trim().to_string(),
                        duration_sec: call.duration,
                        checksum: checksum.clone(),
                    })
                    .returning(CallRow::as_returning())
                    .get_result(tx)
                    .map_err(map_diesel_error)?;

                let segment_rows: Vec<NewSegmentRow> = call
                    .segments
                    .iter()
                    .enumerate()
                    .map(|(seq, s)| NewSegmentRow::from_segment(inserted.call_id, seq, s))
                    .collect();
                diesel::insert_into(transcript_segments::table)
                    .values(&segment_rows)
                    .execute(tx)
                    .map_err(map_diesel_error)?;

                Ok(Call::from(inserted))
            })
        })
        .await
    }

    async fn get_call(&self, call_id: CallId) -> RepositoryResult<Call> {
        let id = call_id.value();
        self.with_conn(move |conn| load_call(conn, id, "get_call").map(Call::from))
            .await
    }

    async fn list_calls(&self) -> RepositoryResult<Vec<Call>> {
        self.with_conn(|conn| {
            let rows = calls::table
                .order(calls::call_id.asc())
                .select(CallRow::as_select())
                .load::<CallRow>(conn)
                .map_err(map_diesel_error)?;
            Ok(rows.into_iter().map(Call::from).collect())
        })
        .await
    }

    async fn get_transcript(&self, call_id: CallId) -> RepositoryResult<Vec<TranscriptSegment>> {
        let id = call_id.value();
        self.with_conn(move |conn| {
            load_call(conn, id, "get_transcript")?;
            transcript_segments::table
                .filter(transcript_segments::call_id.eq(id))
                .order(transcript_segments::seq.asc())
                .select(SegmentRow::as_select())
                .load::<SegmentRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(SegmentRow::into_segment)
                .collect()
        })
        .await
    }

    async fn update_call_duration(&self, call_id: CallId, duration: f64) -> RepositoryResult<Call> {
        let id = call_id.value();
        self.with_conn(move |conn| {
            diesel::update(calls::table.find(id))
                .set(calls::duration_sec.eq(duration))
                .returning(CallRow::as_returning())
                .get_result::<CallRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(Call::from)
                .ok_or_else(|| call_not_found(id, "update_call_duration"))
        })
        .await
    }

    async fn update_transcript_timestamps(
        &self,
        call_id: CallId,
        timestamps: &[CallTimestamp],
    ) -> RepositoryResult<()> {
        let id = call_id.value();
        let timestamps = timestamps.to_vec();
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                load_call(tx, id, "update_transcript_timestamps")?;
                let count: i64 = transcript_segments::table
                    .filter(transcript_segments::call_id.eq(id))
                    .count()
                    .get_result(tx)
                    .map_err(map_diesel_error)?;
                if count as usize != timestamps.len() {
                    return Err(RepositoryError::validation_with_context(
                        format!(
                            "Expected {} timestamps, got {}",
                            count,
                            timestamps.len()
                        ),
                        ErrorContext::new("update_transcript_timestamps")
                            .with_entity("call")
                            .with_entity_id(id),
                    ));
                }

                for (seq, ts) in timestamps.iter().enumerate() {
                    diesel::update(transcript_segments::table.find((id, seq as i32)))
                        .set(transcript_segments::offset_sec.eq(offset_to_db(*ts)))
                        .execute(tx)
                        .map_err(map_diesel_error)?;
                }
                Ok(())
            })
        })
        .await
    }
}

#[async_trait]
impl CoachingRepository for PostgresRepository {
    async fn replace_coaching_artifacts(
        &self,
        call_id: CallId,
        artifacts: &CoachingArtifacts,
    ) -> RepositoryResult<()> {
        let id = call_id.value();
        let artifacts = artifacts.clone();
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                // Locks the call row so concurrent replaces serialize.
                calls::table
                    .find(id)
                    .select(calls::call_id)
                    .for_update()
                    .first::<i64>(tx)
                    .optional()
                    .map_err(map_diesel_error)?
                    .ok_or_else(|| call_not_found(id, "replace_coaching_artifacts"))?;

                diesel::delete(objections::table.filter(objections::call_id.eq(id)))
                    .execute(tx)
                    .map_err(map_diesel_error)?;
                diesel::delete(questions::table.filter(questions::call_id.eq(id)))
                    .execute(tx)
                    .map_err(map_diesel_error)?;
                diesel::delete(coaching_reports::table.find(id))
                    .execute(tx)
                    .map_err(map_diesel_error)?;

                let objection_rows: Vec<NewObjectionRow> = artifacts
                    .objections
                    .iter()
                    .enumerate()
                    .map(|(seq, o)| NewObjectionRow::from_objection(id, seq, o))
                    .collect();
                if !objection_rows.is_empty() {
                    diesel::insert_into(objections::table)
                        .values(&objection_rows)
                        .execute(tx)
                        .map_err(map_diesel_error)?;
                }

                let question_rows: Vec<NewQuestionRow> = artifacts
                    .questions
                    .iter()
                    .enumerate()
                    .map(|(seq, q)| NewQuestionRow::from_question(id, seq, q))
                    .collect();
                if !question_rows.is_empty() {
                    diesel::insert_into(questions::table)
                        .values(&question_rows)
                        .execute(tx)
                        .map_err(map_diesel_error)?;
                }

                let report_json = serde_json::to_value(&artifacts.report).map_err(|e| {
                    RepositoryError::internal_with_context(
                        format!("Failed to serialize report: {}", e),
                        ErrorContext::new("replace_coaching_artifacts").with_entity_id(id),
                    )
                })?;
                diesel::insert_into(coaching_reports::table)
                    .values(&CoachingReportRow {
                        call_id: id,
                        overall_score: i16::from(artifacts.report.overall_score.value),
                        report_json,
                        generated_at: artifacts.report.generated_at,
                    })
                    .execute(tx)
                    .map_err(map_diesel_error)?;

                Ok(())
            })
        })
        .await
    }

    async fn fetch_objections(&self, call_id: CallId) -> RepositoryResult<Vec<Objection>> {
        let id = call_id.value();
        self.with_conn(move |conn| {
            load_call(conn, id, "fetch_objections")?;
            objections::table
                .filter(objections::call_id.eq(id))
                .order(objections::seq.asc())
                .select(ObjectionRow::as_select())
                .load::<ObjectionRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(ObjectionRow::into_objection)
                .collect()
        })
        .await
    }

    async fn fetch_questions(&self, call_id: CallId) -> RepositoryResult<Vec<Question>> {
        let id = call_id.value();
        self.with_conn(move |conn| {
            load_call(conn, id, "fetch_questions")?;
            questions::table
                .filter(questions::call_id.eq(id))
                .order(questions::seq.asc())
                .select(QuestionRow::as_select())
                .load::<QuestionRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(QuestionRow::into_question)
                .collect()
        })
        .await
    }

    async fn fetch_coaching_report(
        &self,
        call_id: CallId,
    ) -> RepositoryResult<Option<CoachingReport>> {
        let id = call_id.value();
        self.with_conn(move |conn| {
            load_call(conn, id, "fetch_coaching_report")?;
            let row = coaching_reports::table
                .find(id)
                .select(CoachingReportRow::as_select())
                .first::<CoachingReportRow>(conn)
                .optional()
                .map_err(map_diesel_error)?;
            row.map(|r| {
                serde_json::from_value::<CoachingReport>(r.report_json).map_err(|e| {
                    RepositoryError::internal_with_context(
                        format!("Stored report is unreadable: {}", e),
                        ErrorContext::new("fetch_coaching_report").with_entity_id(id),
                    )
                })
            })
            .transpose()
        })
        .await
    }
}

#[async_trait]
impl ShareRepository for PostgresRepository {
    async fn insert_share(&self, grant: &ShareGrant) -> RepositoryResult<()> {
        let row = ShareGrantRow::from(grant);
        self.with_conn(move |conn| {
            diesel::insert_into(share_grants::table)
                .values(&row)
                .execute(conn)
                .map(|_| ())
                .map_err(|e| map_diesel_error(e).with_operation("insert_share"))
        })
        .await
    }

    async fn get_share(&self, token: &ShareToken) -> RepositoryResult<Option<ShareGrant>> {
        let token = token.as_str().to_string();
        self.with_conn(move |conn| {
            share_grants::table
                .find(&token)
                .select(ShareGrantRow::as_select())
                .first::<ShareGrantRow>(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(ShareGrantRow::into_grant)
                .transpose()
        })
        .await
    }

    async fn list_shares_for_owner(&self, owner_id: &str) -> RepositoryResult<Vec<ShareGrant>> {
        let owner_id = owner_id.to_string();
        self.with_conn(move |conn| {
            share_grants::table
                .filter(share_grants::owner_id.eq(&owner_id))
                .order((share_grants::created_at.asc(), share_grants::share_token.asc()))
                .select(ShareGrantRow::as_select())
                .load::<ShareGrantRow>(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(ShareGrantRow::into_grant)
                .collect()
        })
        .await
    }

    async fn delete_share(
        &self,
        token: &ShareToken,
        owner_id: &str,
    ) -> RepositoryResult<ShareDeletion> {
        let token = token.as_str().to_string();
        let owner_id = owner_id.to_string();
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let current_owner = share_grants::table
                    .find(&token)
                    .select(share_grants::owner_id)
                    .for_update()
                    .first::<String>(tx)
                    .optional()
                    .map_err(map_diesel_error)?;

                match current_owner {
                    None => Ok(ShareDeletion::Missing),
                    Some(owner) if owner != owner_id => Ok(ShareDeletion::NotOwner),
                    Some(_) => {
                        diesel::delete(
                            share_grants::table
                                .find(&token)
                                .filter(share_grants::owner_id.eq(&owner_id)),
                        )
                        .execute(tx)
                        .map_err(map_diesel_error)?;
                        Ok(ShareDeletion::Deleted)
                    }
                }
            })
        })
        .await
    }
}
