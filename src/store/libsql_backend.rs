//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file and in-memory databases.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::onboarding::gate::MeetingStatus;
use crate::onboarding::model::{OnboardingRecord, StepPayload};
use crate::onboarding::steps::Step;
use crate::store::migrations;
use crate::store::traits::Database;

const ONBOARDING_COLUMNS: &str = "user_id, current_step, completed_steps, is_completed, \
     step_data, version, created_at, updated_at, completed_at";

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Stored version for a user, if the user has a record.
    async fn stored_version(&self, user_id: Uuid) -> Result<Option<i64>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT version FROM onboarding WHERE user_id = ?1",
                params![user_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("stored_version: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row.get::<i64>(0).unwrap_or(0))),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("stored_version: {e}"))),
        }
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn optional_text(value: Option<String>) -> libsql::Value {
    match value {
        Some(s) => libsql::Value::Text(s),
        None => libsql::Value::Null,
    }
}

fn row_to_record(row: &libsql::Row) -> Result<OnboardingRecord, DatabaseError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("onboarding.user_id: {e}")))?;
    let user_id = Uuid::parse_str(&id_str)
        .map_err(|e| DatabaseError::Query(format!("onboarding.user_id parse: {e}")))?;

    let current_step = row.get::<i64>(1).unwrap_or(1).clamp(1, 12) as u8;

    let completed_str: String = row.get(2).unwrap_or_else(|_| "[]".to_string());
    let completed_steps: Vec<u8> = serde_json::from_str(&completed_str)
        .map_err(|e| DatabaseError::Serialization(format!("onboarding.completed_steps: {e}")))?;

    let is_completed = row.get::<i64>(3).unwrap_or(0) != 0;

    let data_str: String = row.get(4).unwrap_or_else(|_| "{}".to_string());
    let steps: BTreeMap<Step, StepPayload> = serde_json::from_str(&data_str)
        .map_err(|e| DatabaseError::Serialization(format!("onboarding.step_data: {e}")))?;

    let version = row.get::<i64>(5).unwrap_or(1);
    let created_at = parse_datetime(&row.get::<String>(6).unwrap_or_default());
    let updated_at = parse_datetime(&row.get::<String>(7).unwrap_or_default());
    let completed_at = row
        .get::<String>(8)
        .ok()
        .filter(|s| !s.is_empty())
        .map(|s| parse_datetime(&s));

    let mut record = OnboardingRecord {
        user_id,
        current_step,
        completed_steps,
        is_completed,
        steps,
        version,
        created_at,
        updated_at,
        completed_at,
    };
    record.normalize();
    Ok(record)
}

fn encode_steps(record: &OnboardingRecord) -> Result<(String, String), DatabaseError> {
    let completed = serde_json::to_string(&record.completed_steps)
        .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
    let data = serde_json::to_string(&record.steps)
        .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
    Ok((completed, data))
}

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Onboarding ──────────────────────────────────────────────────

    async fn get_onboarding(
        &self,
        user_id: Uuid,
    ) -> Result<Option<OnboardingRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {ONBOARDING_COLUMNS} FROM onboarding WHERE user_id = ?1"),
                params![user_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_onboarding: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_record(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_onboarding: {e}"))),
        }
    }

    async fn insert_onboarding(
        &self,
        record: &OnboardingRecord,
    ) -> Result<OnboardingRecord, DatabaseError> {
        let (completed, data) = encode_steps(record)?;

        let inserted = self
            .conn()
            .execute(
                &format!(
                    "INSERT OR IGNORE INTO onboarding ({ONBOARDING_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
                ),
                params![
                    record.user_id.to_string(),
                    i64::from(record.current_step),
                    completed,
                    record.is_completed as i64,
                    data,
                    record.version,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                    optional_text(record.completed_at.map(|t| t.to_rfc3339())),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_onboarding: {e}")))?;

        if inserted == 0 {
            debug!(user_id = %record.user_id, "Onboarding record already existed");
        }

        self.get_onboarding(record.user_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "onboarding".to_string(),
                id: record.user_id.to_string(),
            })
    }

    async fn update_onboarding(
        &self,
        record: &OnboardingRecord,
    ) -> Result<OnboardingRecord, DatabaseError> {
        let (completed, data) = encode_steps(record)?;

        let updated = self
            .conn()
            .execute(
                "UPDATE onboarding SET current_step = ?1, completed_steps = ?2, is_completed = ?3,
                     step_data = ?4, updated_at = ?5, completed_at = ?6, version = version + 1
                 WHERE user_id = ?7 AND version = ?8",
                params![
                    i64::from(record.current_step),
                    completed,
                    record.is_completed as i64,
                    data,
                    record.updated_at.to_rfc3339(),
                    optional_text(record.completed_at.map(|t| t.to_rfc3339())),
                    record.user_id.to_string(),
                    record.version,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_onboarding: {e}")))?;

        if updated == 0 {
            return Err(match self.stored_version(record.user_id).await? {
                Some(actual) => DatabaseError::VersionConflict {
                    entity: "onboarding".to_string(),
                    id: record.user_id.to_string(),
                    expected: record.version,
                    actual,
                },
                None => DatabaseError::NotFound {
                    entity: "onboarding".to_string(),
                    id: record.user_id.to_string(),
                },
            });
        }

        let mut stored = record.clone();
        stored.version += 1;
        Ok(stored)
    }

    // ── Meeting status ──────────────────────────────────────────────

    async fn get_meeting_status(
        &self,
        user_id: Uuid,
    ) -> Result<Option<MeetingStatus>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT meeting_completed, meeting_status FROM onboarding_meetings WHERE user_id = ?1",
                params![user_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_meeting_status: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(MeetingStatus {
                meeting_completed: row.get::<i64>(0).unwrap_or(0) != 0,
                meeting_status: row.get::<String>(1).unwrap_or_default(),
            })),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_meeting_status: {e}"))),
        }
    }

    async fn set_meeting_status(
        &self,
        user_id: Uuid,
        status: &MeetingStatus,
    ) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT INTO onboarding_meetings (user_id, meeting_completed, meeting_status, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_id) DO UPDATE SET meeting_completed = ?2, meeting_status = ?3, updated_at = ?4",
                params![
                    user_id.to_string(),
                    status.meeting_completed as i64,
                    status.meeting_status.clone(),
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_meeting_status: {e}")))?;
        Ok(())
    }
}
