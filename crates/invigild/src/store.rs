use std::path::Path;
use thiserror::Error;
use tokio_rusqlite::Connection;

use crate::report::SubjectIdentity;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] tokio_rusqlite::Error),
    #[error("rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

/// One journaled alert.
#[derive(Debug, Clone)]
pub struct AlertRecord {
    pub id: String,
    pub subject_id: String,
    pub subject_name: String,
    pub probability: f64,
    pub images_captured: u32,
    pub reported: bool,
    pub created_at: String,
}

/// SQLite-backed journal of fired alerts.
///
/// Every fired alert is recorded whether or not its capture/report cycle
/// succeeded; `reported` distinguishes the two. The journal is the audit
/// trail behind the always-unlock policy — a triggering probability that
/// failed to dispatch is still visible here.
#[derive(Clone)]
pub struct AlertStore {
    conn: Connection,
}

impl AlertStore {
    /// Open (or create) the journal at the given path and run migrations.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 CREATE TABLE IF NOT EXISTS alerts (
                     id TEXT PRIMARY KEY,
                     subject_id TEXT NOT NULL,
                     subject_name TEXT NOT NULL,
                     probability REAL NOT NULL,
                     images_captured INTEGER NOT NULL,
                     reported INTEGER NOT NULL,
                     created_at TEXT NOT NULL
                 );
                 CREATE INDEX IF NOT EXISTS idx_alerts_created ON alerts(created_at);",
            )?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Record a fired alert. Returns the generated UUID.
    pub async fn insert(
        &self,
        subject: &SubjectIdentity,
        probability: f64,
        images_captured: usize,
        reported: bool,
    ) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().to_rfc3339();

        let id_clone = id.clone();
        let subject_id = subject.id.clone();
        let subject_name = subject.name.clone();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO alerts (id, subject_id, subject_name, probability, images_captured, reported, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    rusqlite::params![
                        id_clone,
                        subject_id,
                        subject_name,
                        probability,
                        images_captured as i64,
                        reported,
                        created_at
                    ],
                )?;
                Ok(())
            })
            .await?;

        Ok(id)
    }

    /// Most recent alerts, newest first.
    pub async fn recent(&self, limit: u32) -> Result<Vec<AlertRecord>, StoreError> {
        let records = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, subject_id, subject_name, probability, images_captured, reported, created_at
                     FROM alerts ORDER BY created_at DESC, id LIMIT ?1",
                )?;
                let rows = stmt.query_map([i64::from(limit)], |row| {
                    Ok(AlertRecord {
                        id: row.get(0)?,
                        subject_id: row.get(1)?,
                        subject_name: row.get(2)?,
                        probability: row.get(3)?,
                        images_captured: row.get::<_, i64>(4)? as u32,
                        reported: row.get::<_, i64>(5)? != 0,
                        created_at: row.get(6)?,
                    })
                })?;

                let mut records = Vec::new();
                for record in rows {
                    records.push(record?);
                }
                Ok(records)
            })
            .await?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> SubjectIdentity {
        SubjectIdentity {
            id: "s-42".to_string(),
            name: "Avery".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let store = AlertStore::open(Path::new(":memory:")).await.unwrap();
        let id = store.insert(&subject(), 0.93, 3, true).await.unwrap();

        let records = store.recent(10).await.unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id, id);
        assert_eq!(record.subject_id, "s-42");
        assert_eq!(record.subject_name, "Avery");
        assert!((record.probability - 0.93).abs() < 1e-12);
        assert_eq!(record.images_captured, 3);
        assert!(record.reported);
    }

    #[tokio::test]
    async fn test_unreported_alert_is_journaled() {
        let store = AlertStore::open(Path::new(":memory:")).await.unwrap();
        store.insert(&subject(), 0.87, 0, false).await.unwrap();

        let records = store.recent(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(!records[0].reported);
        assert_eq!(records[0].images_captured, 0);
    }

    #[tokio::test]
    async fn test_recent_respects_limit() {
        let store = AlertStore::open(Path::new(":memory:")).await.unwrap();
        for _ in 0..5 {
            store.insert(&subject(), 0.9, 3, true).await.unwrap();
        }
        assert_eq!(store.recent(2).await.unwrap().len(), 2);
        assert_eq!(store.recent(10).await.unwrap().len(), 5);
    }
}
