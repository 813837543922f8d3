#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Persistence for incidents, regions and auditors.
//!
//! The scoring engine talks to storage only through the [`Store`] trait.
//! Two implementations are provided:
//!
//! - [`MemoryStore`] keeps everything in process. Used by tests and for
//!   embedding the engine without a database.
//! - [`SqliteStore`] keeps each entity as a JSON document in `SQLite` via
//!   `switchy_database`.
//!
//! Both preserve insertion order for listings, which the region matcher
//! relies on for its first-match policy.

pub mod memory;
pub mod sqlite;

#[cfg(test)]
pub(crate) mod testing;

use std::path::PathBuf;

use async_trait::async_trait;
use safety_map_incident_models::{Auditor, Incident, IncidentFilter};
use safety_map_region_models::Region;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Default path for the safety map database.
pub const DEFAULT_DB_PATH: &str = "data/safety_map.db";

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// The database could not be opened.
    #[error("Connection error: {0}")]
    Connection(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored document could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Storage backend for the scoring engine.
///
/// `save_*` methods upsert: saving an entity whose id already exists
/// replaces it in place without changing its position in listings.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetches an incident by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the lookup fails.
    async fn get_incident(&self, id: &str) -> Result<Option<Incident>, DbError>;

    /// Inserts or replaces an incident.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails.
    async fn save_incident(&self, incident: &Incident) -> Result<(), DbError>;

    /// Removes an incident. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the delete fails.
    async fn delete_incident(&self, id: &str) -> Result<bool, DbError>;

    /// All incidents linked to a region, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    async fn incidents_in_region(&self, region_id: &str) -> Result<Vec<Incident>, DbError>;

    /// Incidents passing `filter`, in insertion order, at most
    /// `filter.limit` of them.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    async fn list_incidents(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, DbError>;

    /// Fetches a region by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the lookup fails.
    async fn get_region(&self, id: &str) -> Result<Option<Region>, DbError>;

    /// Inserts or replaces a region.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails.
    async fn save_region(&self, region: &Region) -> Result<(), DbError>;

    /// All regions in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    async fn list_regions(&self) -> Result<Vec<Region>, DbError>;

    /// Fetches an auditor's track record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the lookup fails.
    async fn get_auditor(&self, id: &str) -> Result<Option<Auditor>, DbError>;

    /// Inserts or replaces an auditor's track record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails.
    async fn save_auditor(&self, auditor: &Auditor) -> Result<(), DbError>;
}

/// Database path from `SAFETY_MAP_DB`, falling back to [`DEFAULT_DB_PATH`].
#[must_use]
pub fn db_path_from_env() -> PathBuf {
    std::env::var("SAFETY_MAP_DB")
        .map_or_else(|_| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from)
}

/// Opens the `SQLite` store at the path given by `SAFETY_MAP_DB`.
///
/// # Errors
///
/// Returns [`DbError`] if the database cannot be opened or its schema
/// cannot be created.
pub async fn open_from_env() -> Result<SqliteStore, DbError> {
    let path = db_path_from_env();
    log::debug!("Opening safety map database at {}", path.display());
    SqliteStore::open(&path).await
}
