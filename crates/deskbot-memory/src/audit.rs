//! Audit log of every dispatched message and what came of it.

use chrono::Utc;
use deskbot_core::{error::DeskbotError, shellexpand};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// An entry to write to the audit log.
pub struct AuditEntry {
    pub channel: String,
    pub sender_id: String,
    pub input_text: String,
    /// Intent tag or classifier category, when one was resolved.
    pub intent: Option<String>,
    /// What the dispatcher did (e.g. "prompted", "executed", "cancelled").
    pub action: &'static str,
    pub output_text: Option<String>,
    pub processing_ms: Option<i64>,
    pub status: AuditStatus,
}

/// Status of an audited interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    Ok,
    Error,
}

impl AuditStatus {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// Audit logger backed by SQLite.
#[derive(Clone)]
pub struct AuditLogger {
    pool: SqlitePool,
}

impl AuditLogger {
    /// Open (or create) the audit database at `db_path`.
    pub async fn open(db_path: &str) -> Result<Self, DeskbotError> {
        let db_path = shellexpand(db_path);

        if let Some(parent) = std::path::Path::new(&db_path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DeskbotError::Memory(format!("failed to create data dir: {e}")))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| DeskbotError::Memory(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(|e| DeskbotError::Memory(format!("failed to connect to sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;
        info!("Audit log initialized at {db_path}");

        Ok(Self { pool })
    }

    /// A throwaway in-memory audit log. One connection, since every SQLite
    /// memory connection is its own database.
    pub async fn in_memory() -> Result<Self, DeskbotError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| DeskbotError::Memory(format!("failed to open memory db: {e}")))?;
        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<(), DeskbotError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS audit_log (
                id            TEXT PRIMARY KEY,
                created_at    TEXT NOT NULL,
                channel       TEXT NOT NULL,
                sender_id     TEXT NOT NULL,
                input_text    TEXT NOT NULL,
                intent        TEXT,
                action        TEXT NOT NULL,
                output_text   TEXT,
                processing_ms INTEGER,
                status        TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_audit_sender ON audit_log(sender_id, created_at);",
        )
        .execute(pool)
        .await
        .map_err(|e| DeskbotError::Memory(format!("audit migration failed: {e}")))?;
        Ok(())
    }

    /// Write an entry to the audit log.
    pub async fn log(&self, entry: &AuditEntry) -> Result<(), DeskbotError> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO audit_log \
             (id, created_at, channel, sender_id, input_text, intent, action, \
              output_text, processing_ms, status) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&created_at)
        .bind(&entry.channel)
        .bind(&entry.sender_id)
        .bind(&entry.input_text)
        .bind(&entry.intent)
        .bind(entry.action)
        .bind(&entry.output_text)
        .bind(entry.processing_ms)
        .bind(entry.status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DeskbotError::Memory(format!("audit log write failed: {e}")))?;

        debug!(
            "audit: {} {} [{} {}] {}",
            entry.channel,
            entry.sender_id,
            entry.action,
            entry.status.as_str(),
            truncate(&entry.input_text, 80)
        );

        Ok(())
    }

    /// Actions recorded for a sender, oldest first. Shown by `deskbot status --user`.
    pub async fn actions_for(&self, sender_id: &str) -> Result<Vec<String>, DeskbotError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT action FROM audit_log WHERE sender_id = ? ORDER BY created_at, rowid",
        )
        .bind(sender_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DeskbotError::Memory(format!("audit query failed: {e}")))?;
        Ok(rows.into_iter().map(|(a,)| a).collect())
    }

    /// Total number of audited interactions.
    pub async fn count(&self) -> Result<i64, DeskbotError> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_log")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DeskbotError::Memory(format!("audit query failed: {e}")))?;
        Ok(n)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(sender: &str, action: &'static str) -> AuditEntry {
        AuditEntry {
            channel: "webhook".into(),
            sender_id: sender.into(),
            input_text: "is user id 42 active".into(),
            intent: Some("check_active".into()),
            action,
            output_text: None,
            processing_ms: Some(3),
            status: AuditStatus::Ok,
        }
    }

    #[tokio::test]
    async fn test_log_and_read_back() {
        let audit = AuditLogger::in_memory().await.unwrap();
        audit.log(&entry("u1", "prompted")).await.unwrap();
        audit.log(&entry("u1", "executed")).await.unwrap();
        audit.log(&entry("u2", "cancelled")).await.unwrap();

        assert_eq!(audit.count().await.unwrap(), 3);
        assert_eq!(
            audit.actions_for("u1").await.unwrap(),
            vec!["prompted".to_string(), "executed".to_string()]
        );
    }

    #[tokio::test]
    async fn test_actions_for_unknown_sender_is_empty() {
        let audit = AuditLogger::in_memory().await.unwrap();
        audit.log(&entry("u1", "prompted")).await.unwrap();
        assert!(audit.actions_for("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_on_disk_creates_parent_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let db = tmp.path().join("nested/audit.db");
        let audit = AuditLogger::open(db.to_str().unwrap()).await.unwrap();
        audit.log(&entry("u1", "rejected")).await.unwrap();
        assert!(db.exists());
        assert_eq!(audit.count().await.unwrap(), 1);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
