/// SQLite persistence layer for workflow records
///
/// One row per project holds the workflow document and its metadata as JSON, with the fields
/// needed for queries (creator, status, version, modification time) mirrored into columns.
/// Pending contributor invitations live in a second table.

use crate::error::{OrchestratorError, Result};
use crate::workflow::types::{
    PendingInvitation, RecordMetadata, WorkflowDocument, WorkflowRecord, WorkflowStatus,
    WorkflowSummary,
};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::str::FromStr;

/// SQLite-based workflow record storage
#[derive(Debug, Clone)]
pub struct WorkflowStorage {
    pool: SqlitePool,
}

impl WorkflowStorage {
    /// Create storage over an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `database_url` and initialize the schema
    pub async fn connect(database_url: &str) -> Result<Self> {
        tracing::info!("Opening workflow record database: {}", database_url);
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let storage = Self::new(pool);
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Private in-memory database, kept alive on a single pinned connection
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let storage = Self::new(pool);
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Create tables and indexes; safe to call repeatedly
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS workflow_records (
                project_id TEXT PRIMARY KEY,
                creator TEXT NOT NULL,
                status TEXT NOT NULL,
                version INTEGER NOT NULL,
                last_modified_ms INTEGER NOT NULL,
                workflow JSON NOT NULL,
                metadata JSON NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_workflow_records_status
            ON workflow_records(status, last_modified_ms)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pending_invitations (
                project_id TEXT NOT NULL,
                invitee TEXT NOT NULL,
                invited_by TEXT NOT NULL,
                invited_at TEXT NOT NULL,
                PRIMARY KEY (project_id, invitee)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch one record
    pub async fn get_record(&self, project_id: &str) -> Result<Option<WorkflowRecord>> {
        let row = sqlx::query("SELECT workflow, metadata FROM workflow_records WHERE project_id = ?")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let workflow_json: String = row.get("workflow");
                let metadata_json: String = row.get("metadata");
                let workflow: WorkflowDocument = serde_json::from_str(&workflow_json)?;
                let metadata: RecordMetadata = serde_json::from_str(&metadata_json)?;
                Ok(Some(WorkflowRecord {
                    project_id: project_id.to_string(),
                    workflow,
                    metadata,
                }))
            }
            None => Ok(None),
        }
    }

    /// Insert or replace a record, guarded by its version
    ///
    /// The write only lands when the stored version is exactly `record.metadata.version - 1`
    /// (or no row exists and the new version is 1). Returns false when another writer got
    /// there first.
    pub async fn write_record(&self, record: &WorkflowRecord) -> Result<bool> {
        let workflow_json = serde_json::to_string(&record.workflow)?;
        let metadata_json = serde_json::to_string(&record.metadata)?;
        let version = version_column(record.metadata.version)?;

        let result = sqlx::query(
            r#"
            INSERT INTO workflow_records
                (project_id, creator, status, version, last_modified_ms, workflow, metadata)
            SELECT ?, ?, ?, ?, ?, ?, ?
            WHERE ? = 1 OR EXISTS (SELECT 1 FROM workflow_records WHERE project_id = ?)
            ON CONFLICT(project_id) DO UPDATE SET
                creator = excluded.creator,
                status = excluded.status,
                version = excluded.version,
                last_modified_ms = excluded.last_modified_ms,
                workflow = excluded.workflow,
                metadata = excluded.metadata
            WHERE workflow_records.version = excluded.version - 1
            "#,
        )
        .bind(&record.project_id)
        .bind(&record.metadata.creator)
        .bind(record.metadata.status.as_str())
        .bind(version)
        .bind(record.metadata.last_modified_at.timestamp_millis())
        .bind(&workflow_json)
        .bind(&metadata_json)
        .bind(version)
        .bind(&record.project_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Current stored version, if the record exists
    pub async fn current_version(&self, project_id: &str) -> Result<Option<u64>> {
        let row = sqlx::query("SELECT version FROM workflow_records WHERE project_id = ?")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get::<i64, _>("version").max(0) as u64))
    }

    /// Delete a record and its invitations
    pub async fn delete_record(&self, project_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM workflow_records WHERE project_id = ?")
            .bind(project_id)
            .execute(&self.pool)
            .await?;

        sqlx::query("DELETE FROM pending_invitations WHERE project_id = ?")
            .bind(project_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete draft records last modified before `cutoff`; other statuses are never touched
    pub async fn purge_drafts_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM workflow_records WHERE status = ? AND last_modified_ms < ?",
        )
        .bind(WorkflowStatus::Draft.as_str())
        .bind(cutoff.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// List every record, most recently modified first
    pub async fn list_summaries(&self) -> Result<Vec<WorkflowSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT project_id, creator, status, version, last_modified_ms
            FROM workflow_records
            ORDER BY last_modified_ms DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let project_id: String = row.get("project_id");
            let status: String = row.get("status");
            let status = WorkflowStatus::parse(&status).ok_or_else(|| {
                OrchestratorError::NotFound(format!(
                    "status `{}` stored for project `{}`",
                    status, project_id
                ))
            })?;
            let last_modified_ms: i64 = row.get("last_modified_ms");

            summaries.push(WorkflowSummary {
                project_id,
                creator: row.get("creator"),
                status,
                version: row.get::<i64, _>("version").max(0) as u64,
                last_modified_at: DateTime::from_timestamp_millis(last_modified_ms)
                    .unwrap_or_default(),
            });
        }

        Ok(summaries)
    }

    /// Record an invitation; re-inviting refreshes the timestamp
    pub async fn insert_invitation(&self, invitation: &PendingInvitation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pending_invitations (project_id, invitee, invited_by, invited_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(project_id, invitee) DO UPDATE SET
                invited_by = excluded.invited_by,
                invited_at = excluded.invited_at
            "#,
        )
        .bind(&invitation.project_id)
        .bind(invitation.invitee.to_lowercase())
        .bind(&invitation.invited_by)
        .bind(invitation.invited_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete_invitation(&self, project_id: &str, invitee: &str) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM pending_invitations WHERE project_id = ? AND invitee = ?")
                .bind(project_id)
                .bind(invitee.to_lowercase())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Invitations for a project, oldest first
    pub async fn list_invitations(&self, project_id: &str) -> Result<Vec<PendingInvitation>> {
        let rows = sqlx::query(
            r#"
            SELECT invitee, invited_by, invited_at FROM pending_invitations
            WHERE project_id = ?
            ORDER BY invited_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        let mut invitations = Vec::with_capacity(rows.len());
        for row in rows {
            let invited_at: String = row.get("invited_at");
            let invited_at = DateTime::parse_from_rfc3339(&invited_at)
                .map(|at| at.with_timezone(&Utc))
                .unwrap_or_default();
            invitations.push(PendingInvitation {
                project_id: project_id.to_string(),
                invitee: row.get("invitee"),
                invited_by: row.get("invited_by"),
                invited_at,
            });
        }

        Ok(invitations)
    }
}

fn version_column(version: u64) -> Result<i64> {
    i64::try_from(version).map_err(|_| {
        OrchestratorError::Serialization(serde::ser::Error::custom(format!(
            "version {} does not fit the version column",
            version
        )))
    })
}
