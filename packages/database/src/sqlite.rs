//! `SQLite`-backed [`Store`].
//!
//! Each entity is stored as its JSON document. The handful of columns the
//! store filters on (region, status, type, alert level) are copied out of
//! the document on write. `seq` is an autoincrement key that preserves
//! insertion order across upserts.

use std::path::Path;

use async_trait::async_trait;
use moosicbox_json_utils::database::ToValue as _;
use safety_map_incident_models::{Auditor, Incident, IncidentFilter};
use safety_map_region_models::Region;
use serde::de::DeserializeOwned;
use switchy_database::{Database, DatabaseValue};
use switchy_database_connection::init_sqlite_rusqlite;

use crate::{DbError, Store};

/// A [`Store`] backed by a `SQLite` file.
pub struct SqliteStore {
    db: Box<dyn Database>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and ensures the schema
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database cannot be opened or schema
    /// creation fails.
    pub async fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = init_sqlite_rusqlite(Some(path)).map_err(|e| DbError::Connection(e.to_string()))?;

        ensure_schema(db.as_ref()).await?;

        Ok(Self { db })
    }

    async fn fetch_documents<T: DeserializeOwned>(
        &self,
        query: &str,
        params: &[DatabaseValue],
    ) -> Result<Vec<T>, DbError> {
        let rows = self.db.query_raw_params(query, params).await?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in &rows {
            let json: String = row.to_value("document").map_err(|e| DbError::Conversion {
                message: format!("Failed to read document column: {e}"),
            })?;
            documents.push(serde_json::from_str(&json)?);
        }

        Ok(documents)
    }

    async fn fetch_document<T: DeserializeOwned>(
        &self,
        query: &str,
        id: &str,
    ) -> Result<Option<T>, DbError> {
        Ok(self
            .fetch_documents(query, &[DatabaseValue::String(id.to_string())])
            .await?
            .into_iter()
            .next())
    }
}

/// Creates all tables if they don't already exist.
async fn ensure_schema(db: &dyn Database) -> Result<(), DbError> {
    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS incidents (
            seq            INTEGER PRIMARY KEY AUTOINCREMENT,
            id             TEXT NOT NULL UNIQUE,
            region_id      TEXT,
            status         TEXT NOT NULL,
            incident_type  TEXT NOT NULL,
            alert_level    TEXT NOT NULL,
            document       TEXT NOT NULL
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE INDEX IF NOT EXISTS idx_incidents_region
         ON incidents (region_id, seq)",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS regions (
            seq       INTEGER PRIMARY KEY AUTOINCREMENT,
            id        TEXT NOT NULL UNIQUE,
            document  TEXT NOT NULL
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS auditors (
            id        TEXT PRIMARY KEY,
            document  TEXT NOT NULL
        )",
    )
    .await?;

    Ok(())
}

fn optional_string(value: Option<&str>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, |v| DatabaseValue::String(v.to_string()))
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_incident(&self, id: &str) -> Result<Option<Incident>, DbError> {
        self.fetch_document("SELECT document FROM incidents WHERE id = $1", id)
            .await
    }

    async fn save_incident(&self, incident: &Incident) -> Result<(), DbError> {
        let document = serde_json::to_string(incident)?;

        self.db
            .exec_raw_params(
                "INSERT INTO incidents
                     (id, region_id, status, incident_type, alert_level, document)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (id) DO UPDATE SET
                     region_id = excluded.region_id,
                     status = excluded.status,
                     incident_type = excluded.incident_type,
                     alert_level = excluded.alert_level,
                     document = excluded.document",
                &[
                    DatabaseValue::String(incident.id.clone()),
                    optional_string(incident.region_id.as_deref()),
                    DatabaseValue::String(incident.status.as_ref().to_string()),
                    DatabaseValue::String(incident.incident_type.clone()),
                    DatabaseValue::String(incident.alert_level.as_ref().to_string()),
                    DatabaseValue::String(document),
                ],
            )
            .await?;

        Ok(())
    }

    async fn delete_incident(&self, id: &str) -> Result<bool, DbError> {
        let deleted = self
            .db
            .exec_raw_params(
                "DELETE FROM incidents WHERE id = $1",
                &[DatabaseValue::String(id.to_string())],
            )
            .await?;

        Ok(deleted > 0)
    }

    async fn incidents_in_region(&self, region_id: &str) -> Result<Vec<Incident>, DbError> {
        self.fetch_documents(
            "SELECT document FROM incidents WHERE region_id = $1 ORDER BY seq",
            &[DatabaseValue::String(region_id.to_string())],
        )
        .await
    }

    async fn list_incidents(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, DbError> {
        self.fetch_documents(
            "SELECT document FROM incidents
             WHERE ($1 IS NULL OR status = $1)
               AND ($2 IS NULL OR incident_type = $2)
               AND ($3 IS NULL OR alert_level = $3)
             ORDER BY seq
             LIMIT $4",
            &[
                optional_string(filter.status.as_ref().map(AsRef::as_ref)),
                optional_string(filter.incident_type.as_deref()),
                optional_string(filter.alert_level.as_ref().map(AsRef::as_ref)),
                DatabaseValue::Int32(i32::try_from(filter.limit).unwrap_or(i32::MAX)),
            ],
        )
        .await
    }

    async fn get_region(&self, id: &str) -> Result<Option<Region>, DbError> {
        self.fetch_document("SELECT document FROM regions WHERE id = $1", id)
            .await
    }

    async fn save_region(&self, region: &Region) -> Result<(), DbError> {
        let document = serde_json::to_string(region)?;

        self.db
            .exec_raw_params(
                "INSERT INTO regions (id, document)
                 VALUES ($1, $2)
                 ON CONFLICT (id) DO UPDATE SET
                     document = excluded.document",
                &[
                    DatabaseValue::String(region.id.clone()),
                    DatabaseValue::String(document),
                ],
            )
            .await?;

        Ok(())
    }

    async fn list_regions(&self) -> Result<Vec<Region>, DbError> {
        self.fetch_documents("SELECT document FROM regions ORDER BY seq", &[])
            .await
    }

    async fn get_auditor(&self, id: &str) -> Result<Option<Auditor>, DbError> {
        self.fetch_document("SELECT document FROM auditors WHERE id = $1", id)
            .await
    }

    async fn save_auditor(&self, auditor: &Auditor) -> Result<(), DbError> {
        let document = serde_json::to_string(auditor)?;

        self.db
            .exec_raw_params(
                "INSERT INTO auditors (id, document)
                 VALUES ($1, $2)
                 ON CONFLICT (id) DO UPDATE SET document = excluded.document",
                &[
                    DatabaseValue::String(auditor.actor.id.clone()),
                    DatabaseValue::String(document),
                ],
            )
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::testing;

    fn temp_db_path() -> PathBuf {
        std::env::temp_dir()
            .join("safety_map_tests")
            .join(format!("{}.db", uuid::Uuid::new_v4()))
    }

    async fn open_temp() -> (SqliteStore, PathBuf) {
        let path = temp_db_path();
        let store = SqliteStore::open(&path).await.unwrap();
        (store, path)
    }

    #[tokio::test]
    async fn incidents() {
        let (store, path) = open_temp().await;
        testing::exercise_incidents(&store).await;
        drop(store);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn regions() {
        let (store, path) = open_temp().await;
        testing::exercise_regions(&store).await;
        drop(store);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn auditors() {
        let (store, path) = open_temp().await;
        testing::exercise_auditors(&store).await;
        drop(store);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let path = temp_db_path();
        {
            let store = SqliteStore::open(&path).await.unwrap();
            store
                .save_region(&testing::region("r1", 0.0))
                .await
                .unwrap();
        }
        let store = SqliteStore::open(&path).await.unwrap();
        let regions = store.list_regions().await.unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].id, "r1");
        drop(store);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn tables_only_carry_filter_columns() {
        let (store, path) = open_temp().await;

        for (table, expected) in [
            (
                "incidents",
                &[
                    "seq",
                    "id",
                    "region_id",
                    "status",
                    "incident_type",
                    "alert_level",
                    "document",
                ][..],
            ),
            ("regions", &["seq", "id", "document"][..]),
            ("auditors", &["id", "document"][..]),
        ] {
            let rows = store
                .db
                .query_raw_params(&format!("PRAGMA table_info({table})"), &[])
                .await
                .unwrap();
            let columns: Vec<String> = rows
                .iter()
                .map(|row| row.to_value("name").unwrap())
                .collect();
            assert_eq!(columns, expected, "columns of {table}");
        }

        drop(store);
        let _ = std::fs::remove_file(path);
    }
}
