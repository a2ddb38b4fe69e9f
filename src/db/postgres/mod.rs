//! Diesel-backed [`PersistenceAdapter`] for the remote Postgres backend.
//!
//! Owns the r2d2 connection pool, runs the embedded migrations on startup,
//! and executes every query on the blocking thread pool with a bounded
//! retry for transient failures. The snake_case row types and their
//! mapping to the camelCase domain records live in [`models`].
//!
//! Connection settings come from [`PostgresConfig`], either directly, from
//! a `store.toml`, or from the environment:
//!
//! - `DATABASE_URL` / `PG_DATABASE_URL`: connection string (required)
//! - `PG_POOL_MAX` / `PG_POOL_MIN`: pool bounds (defaults 10 / 1)
//! - `PG_CONN_TIMEOUT_SEC` / `PG_IDLE_TIMEOUT_SEC`: pool timeouts
//!   (defaults 30 / 600)
//! - `PG_MAX_RETRIES` / `PG_RETRY_DELAY_MS`: transient-failure retry
//!   policy (defaults 3 / 100; the delay doubles per attempt)

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tokio::task;

use super::adapter::{BackendKind, IdAssignment, PersistenceAdapter};
use super::error::{ErrorContext, StoreError, StoreResult};
use crate::models::{AvailabilityEntry, Collections, Substitution, Subject, Teacher};

mod models;
mod schema;

use models::*;
use schema::{subjects, substitution_availability, substitution_schedules, substitutions, teachers};

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/postgres/migrations");

/// Connection and retry settings for the Postgres backend.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub database_url: String,
    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub connection_timeout_sec: u64,
    pub idle_timeout_sec: u64,
    /// Attempts per operation when the failure is transient.
    pub max_retries: u32,
    /// Delay before the first retry; doubles with each attempt.
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

fn env_or<T: std::str::FromStr>(name: &str, fallback: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}

impl PostgresConfig {
    /// Read the connection settings from the environment.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        Ok(Self {
            database_url,
            max_pool_size: env_or("PG_POOL_MAX", 10),
            min_pool_size: env_or("PG_POOL_MIN", 1),
            connection_timeout_sec: env_or("PG_CONN_TIMEOUT_SEC", 30),
            idle_timeout_sec: env_or("PG_IDLE_TIMEOUT_SEC", 600),
            max_retries: env_or("PG_MAX_RETRIES", 3),
            retry_delay_ms: env_or("PG_RETRY_DELAY_MS", 100),
        })
    }

    /// Default settings against the given connection string.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Snapshot of pool occupancy and the adapter's query counters.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    pub connections_in_use: u32,
    pub idle_connections: u32,
    pub total_connections: u32,
    pub max_size: u32,
    pub total_queries: u64,
    pub failed_queries: u64,
    pub retried_operations: u64,
}

/// Diesel-backed adapter for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresAdapter {
    pool: PgPool,
    config: PostgresConfig,
    total_queries: Arc<AtomicU64>,
    failed_queries: Arc<AtomicU64>,
    retried_operations: Arc<AtomicU64>,
}

impl PostgresAdapter {
    /// Build the connection pool and bring the schema up to date.
    pub fn new(config: PostgresConfig) -> StoreResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                StoreError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                StoreError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
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

    fn run_migrations(conn: &mut PgConnection) -> StoreResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            StoreError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;

        Ok(())
    }

    /// Run a query on the blocking thread pool.
    ///
    /// Retryable failures (connection loss, serialization conflicts) are
    /// retried up to `max_retries` times with a doubling delay. This retry
    /// is an internal transient-failure concern; it is unrelated to the
    /// store's batch pacing, which is a fixed rest, not a backoff.
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static + Clone,
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
                        let err = StoreError::connection_with_context(
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
                StoreError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            StoreError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }

    /// Current pool occupancy and query counters.
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

    /// Whether the backend currently answers a probe query.
    pub async fn is_healthy(&self) -> bool {
        self.health_check().await.unwrap_or(false)
    }
}

fn teacher_assignments(rows: Vec<TeacherRow>) -> Vec<IdAssignment> {
    rows.into_iter()
        .map(|row| IdAssignment {
            client_ref: row.client_ref.unwrap_or_default(),
            backend_id: row.id.to_string(),
        })
        .collect()
}

#[async_trait]
impl PersistenceAdapter for PostgresAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    async fn health_check(&self) -> StoreResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1").execute(conn)?;
            Ok(true)
        })
        .await
    }

    async fn load_all(&self) -> StoreResult<Collections> {
        self.with_conn(|conn| {
            let teacher_rows: Vec<TeacherRow> = teachers::table
                .order(teachers::name.asc())
                .load(conn)
                .map_err(|e| StoreError::from(e).with_operation("load_teachers"))?;

            let subject_rows: Vec<SubjectRow> = subjects::table
                .order((subjects::day.asc(), subjects::time_start.asc()))
                .load(conn)
                .map_err(|e| StoreError::from(e).with_operation("load_subjects"))?;

            let substitution_rows: Vec<SubstitutionRow> = substitutions::table
                .order(substitutions::date.desc())
                .load(conn)
                .map_err(|e| StoreError::from(e).with_operation("load_substitutions"))?;

            let ids: Vec<i64> = substitution_rows.iter().map(|row| row.id).collect();
            let slot_rows: Vec<ScheduleSlotRow> = substitution_schedules::table
                .filter(substitution_schedules::substitution_id.eq_any(&ids))
                .order(substitution_schedules::id.asc())
                .load(conn)
                .map_err(|e| StoreError::from(e).with_operation("load_substitution_schedules"))?;

            let mut slots_by_substitution: HashMap<i64, Vec<ScheduleSlotRow>> = HashMap::new();
            for slot in slot_rows {
                slots_by_substitution
                    .entry(slot.substitution_id)
                    .or_default()
                    .push(slot);
            }

            let availability_rows: Vec<AvailabilityRow> = substitution_availability::table
                .order((
                    substitution_availability::day.asc(),
                    substitution_availability::time_start.asc(),
                ))
                .load(conn)
                .map_err(|e| StoreError::from(e).with_operation("load_availability"))?;

            Ok(Collections {
                teachers: teacher_rows.into_iter().map(Teacher::from).collect(),
                subjects: subject_rows.into_iter().map(Subject::from).collect(),
                substitutions: substitution_rows
                    .into_iter()
                    .map(|row| {
                        let slots = slots_by_substitution.remove(&row.id).unwrap_or_default();
                        substitution_from_rows(row, slots)
                    })
                    .collect(),
                availability: availability_rows
                    .into_iter()
                    .map(AvailabilityEntry::from)
                    .collect(),
            })
        })
        .await
    }

    async fn insert_teachers(&self, added: &[Teacher]) -> StoreResult<Vec<IdAssignment>> {
        let rows: Vec<NewTeacherRow> = added.iter().map(new_teacher_row).collect();
        self.with_conn(move |conn| {
            let inserted: Vec<TeacherRow> = diesel::insert_into(teachers::table)
                .values(&rows)
                .get_results(conn)
                .map_err(|e| StoreError::from(e).with_operation("insert_teachers"))?;
            Ok(teacher_assignments(inserted))
        })
        .await
    }

    async fn delete_teacher(&self, id: &str) -> StoreResult<()> {
        let Ok(backend_id) = id.parse::<i64>() else {
            // Never reconciled against this backend; nothing to delete.
            log::debug!("skipping remote delete for unsynced teacher id {id}");
            return Ok(());
        };
        self.with_conn(move |conn| {
            diesel::delete(teachers::table.filter(teachers::id.eq(backend_id)))
                .execute(conn)
                .map_err(|e| StoreError::from(e).with_operation("delete_teacher"))?;
            Ok(())
        })
        .await
    }

    async fn insert_subjects(
        &self,
        added: &[Subject],
        roster: &[Teacher],
    ) -> StoreResult<Vec<IdAssignment>> {
        let rows: Vec<NewSubjectRow> = added
            .iter()
            .map(|subject| new_subject_row(subject, roster))
            .collect();
        self.with_conn(move |conn| {
            let inserted: Vec<SubjectRow> = diesel::insert_into(subjects::table)
                .values(&rows)
                .get_results(conn)
                .map_err(|e| StoreError::from(e).with_operation("insert_subjects"))?;
            Ok(inserted
                .into_iter()
                .map(|row| IdAssignment {
                    client_ref: row.client_ref.unwrap_or_default(),
                    backend_id: row.id.to_string(),
                })
                .collect())
        })
        .await
    }

    async fn insert_substitution(
        &self,
        substitution: &Substitution,
        roster: &[Teacher],
    ) -> StoreResult<Option<IdAssignment>> {
        let row = new_substitution_row(substitution, roster);
        let substitution = substitution.clone();
        let roster = roster.to_vec();
        self.with_conn(move |conn| {
            conn.transaction(|conn| {
                let inserted: SubstitutionRow = diesel::insert_into(substitutions::table)
                    .values(&row)
                    .get_result(conn)?;

                let slot_rows = new_slot_rows(inserted.id, &substitution, &roster);
                if !slot_rows.is_empty() {
                    diesel::insert_into(substitution_schedules::table)
                        .values(&slot_rows)
                        .execute(conn)?;
                }

                Ok(Some(IdAssignment {
                    client_ref: inserted.client_ref.unwrap_or_default(),
                    backend_id: inserted.id.to_string(),
                }))
            })
            .map_err(|e: diesel::result::Error| {
                StoreError::from(e).with_operation("insert_substitution")
            })
        })
        .await
    }

    async fn update_substitution(&self, substitution: &Substitution) -> StoreResult<()> {
        let Ok(backend_id) = substitution.id.parse::<i64>() else {
            log::debug!(
                "skipping remote update for unsynced substitution id {}",
                substitution.id
            );
            return Ok(());
        };
        let changes = SubstitutionChanges {
            status: substitution.status.clone(),
            reason: substitution.reason.clone(),
            updated_at: chrono::Utc::now(),
        };
        self.with_conn(move |conn| {
            diesel::update(substitutions::table.filter(substitutions::id.eq(backend_id)))
                .set(changes.clone())
                .execute(conn)
                .map_err(|e| StoreError::from(e).with_operation("update_substitution"))?;
            Ok(())
        })
        .await
    }

    async fn delete_substitution(&self, id: &str) -> StoreResult<()> {
        let Ok(backend_id) = id.parse::<i64>() else {
            log::debug!("skipping remote delete for unsynced substitution id {id}");
            return Ok(());
        };
        self.with_conn(move |conn| {
            // Slot rows go with the substitution via ON DELETE CASCADE.
            diesel::delete(substitutions::table.filter(substitutions::id.eq(backend_id)))
                .execute(conn)
                .map_err(|e| StoreError::from(e).with_operation("delete_substitution"))?;
            Ok(())
        })
        .await
    }

    async fn insert_availability(
        &self,
        added: &[AvailabilityEntry],
        roster: &[Teacher],
    ) -> StoreResult<Vec<IdAssignment>> {
        let rows: Vec<NewAvailabilityRow> = added
            .iter()
            .map(|entry| new_availability_row(entry, roster))
            .collect();
        self.with_conn(move |conn| {
            let inserted: Vec<AvailabilityRow> =
                diesel::insert_into(substitution_availability::table)
                    .values(&rows)
                    .get_results(conn)
                    .map_err(|e| StoreError::from(e).with_operation("insert_availability"))?;
            Ok(inserted
                .into_iter()
                .map(|row| IdAssignment {
                    client_ref: row.client_ref.unwrap_or_default(),
                    backend_id: row.id.to_string(),
                })
                .collect())
        })
        .await
    }

    async fn replace_availability(
        &self,
        entries: &[AvailabilityEntry],
        roster: &[Teacher],
    ) -> StoreResult<Vec<IdAssignment>> {
        let rows: Vec<NewAvailabilityRow> = entries
            .iter()
            .map(|entry| new_availability_row(entry, roster))
            .collect();
        self.with_conn(move |conn| {
            conn.transaction(|conn| {
                diesel::delete(substitution_availability::table).execute(conn)?;

                if rows.is_empty() {
                    return Ok(Vec::new());
                }
                let inserted: Vec<AvailabilityRow> =
                    diesel::insert_into(substitution_availability::table)
                        .values(&rows)
                        .get_results(conn)?;
                Ok(inserted
                    .into_iter()
                    .map(|row| IdAssignment {
                        client_ref: row.client_ref.unwrap_or_default(),
                        backend_id: row.id.to_string(),
                    })
                    .collect())
            })
            .map_err(|e: diesel::result::Error| {
                StoreError::from(e).with_operation("replace_availability")
            })
        })
        .await
    }
}
