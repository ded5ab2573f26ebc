//! Memos SQLite database, opened read-only.
//!
//! Reads the `memo` table:
//!
//! | column | meaning |
//! |---|---|
//! | `id` | integer primary key |
//! | `content` | note text |
//! | `created_ts`, `updated_ts` | unix seconds |
//! | `row_status` | `NORMAL` for live notes |
//! | `visibility` | `PRIVATE`, `PROTECTED` or `PUBLIC` |

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

use crate::document::{DocId, DocStatus, Document, Visibility};
use crate::error::{Result, SourceError};
use crate::repository::{RecentScope, SourceRepository, usable_keywords};

const COLUMNS: &str = "id, content, created_ts, updated_ts, row_status, visibility";
const ACTIVE: &str = "row_status = 'NORMAL' AND visibility = 'PRIVATE'";

/// [`SourceRepository`] over a Memos database file.
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Open `path` read-only.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        info!("Opened Memos database at {}", path.display());
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn fetch(&self, sql: &str) -> Result<Vec<Document>> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter().map(document_from_row).collect()
    }
}

fn timestamp(secs: i64, column: &str) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| SourceError::InvalidRow(format!("{column} out of range: {secs}")))
}

fn document_from_row(row: &SqliteRow) -> Result<Document> {
    let id: i64 = row.try_get("id")?;
    let content: String = row.try_get("content")?;
    let created_ts: i64 = row.try_get("created_ts")?;
    let updated_ts: i64 = row.try_get("updated_ts")?;
    let row_status: String = row.try_get("row_status")?;
    let visibility: String = row.try_get("visibility")?;

    let visibility = Visibility::from_column(&visibility)
        .ok_or_else(|| SourceError::InvalidRow(format!("memo {id}: visibility {visibility}")))?;

    Ok(Document {
        id: DocId::from(id),
        content,
        created_at: timestamp(created_ts, "created_ts")?,
        updated_at: timestamp(updated_ts, "updated_ts")?,
        status: DocStatus::from_row_status(&row_status),
        visibility,
    })
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl SourceRepository for SqliteRepository {
    async fn get_by_id(&self, id: &DocId) -> Result<Option<Document>> {
        // Memos ids are integers; anything else cannot exist.
        let Ok(id) = id.as_str().parse::<i64>() else {
            return Ok(None);
        };

        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM memo WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(document_from_row).transpose()
    }

    async fn list_active(&self) -> Result<Vec<Document>> {
        self.fetch(&format!("SELECT {COLUMNS} FROM memo WHERE {ACTIVE} ORDER BY id"))
            .await
    }

    async fn list_changed_since(&self, since: DateTime<Utc>) -> Result<Vec<Document>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM memo WHERE updated_ts > ? ORDER BY id"
        ))
        .bind(since.timestamp())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(document_from_row).collect()
    }

    async fn list_recent(&self, limit: usize, scope: RecentScope) -> Result<Vec<Document>> {
        let filter = match scope {
            RecentScope::ActiveOnly => format!("WHERE {ACTIVE}"),
            RecentScope::Unfiltered => String::new(),
        };
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM memo {filter} ORDER BY created_ts DESC, id DESC LIMIT ?"
        ))
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(document_from_row).collect()
    }

    async fn find_by_keywords(&self, keywords: &[String], limit: usize) -> Result<Vec<Document>> {
        let keywords = usable_keywords(keywords);
        if keywords.is_empty() {
            return Ok(Vec::new());
        }

        // instr() is a case-sensitive substring test, unlike LIKE.
        let matches = vec!["instr(content, ?) > 0"; keywords.len()].join(" OR ");
        let sql = format!(
            "SELECT {COLUMNS} FROM memo WHERE {ACTIVE} AND ({matches}) ORDER BY id LIMIT ?"
        );

        let mut query = sqlx::query(&sql);
        for keyword in &keywords {
            query = query.bind(*keyword);
        }
        let rows = query.bind(sql_limit(limit)).fetch_all(&self.pool).await?;

        debug!("Keyword search {keywords:?} matched {} notes", rows.len());
        rows.iter().map(document_from_row).collect()
    }
}
