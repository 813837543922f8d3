//! In-process [`Store`].

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use safety_map_incident_models::{Auditor, Incident, IncidentFilter};
use safety_map_region_models::Region;

use crate::{DbError, Store};

#[derive(Default)]
struct Tables {
    incidents: Vec<Incident>,
    regions: Vec<Region>,
    auditors: BTreeMap<String, Auditor>,
}

/// A [`Store`] backed by in-memory vectors.
///
/// Never fails. Data is lost when the store is dropped.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn upsert<T>(rows: &mut Vec<T>, row: T, same: impl Fn(&T) -> bool) {
    if let Some(existing) = rows.iter_mut().find(|r| same(r)) {
        *existing = row;
    } else {
        rows.push(row);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_incident(&self, id: &str) -> Result<Option<Incident>, DbError> {
        Ok(self.tables().incidents.iter().find(|i| i.id == id).cloned())
    }

    async fn save_incident(&self, incident: &Incident) -> Result<(), DbError> {
        upsert(&mut self.tables().incidents, incident.clone(), |i| {
            i.id == incident.id
        });
        Ok(())
    }

    async fn delete_incident(&self, id: &str) -> Result<bool, DbError> {
        let mut tables = self.tables();
        let before = tables.incidents.len();
        tables.incidents.retain(|i| i.id != id);
        Ok(tables.incidents.len() < before)
    }

    async fn incidents_in_region(&self, region_id: &str) -> Result<Vec<Incident>, DbError> {
        Ok(self
            .tables()
            .incidents
            .iter()
            .filter(|i| i.region_id.as_deref() == Some(region_id))
            .cloned()
            .collect())
    }

    async fn list_incidents(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, DbError> {
        Ok(self
            .tables()
            .incidents
            .iter()
            .filter(|i| filter.matches(i))
            .take(filter.limit)
            .cloned()
            .collect())
    }

    async fn get_region(&self, id: &str) -> Result<Option<Region>, DbError> {
        Ok(self.tables().regions.iter().find(|r| r.id == id).cloned())
    }

    async fn save_region(&self, region: &Region) -> Result<(), DbError> {
        upsert(&mut self.tables().regions, region.clone(), |r| r.id == region.id);
        Ok(())
    }

    async fn list_regions(&self) -> Result<Vec<Region>, DbError> {
        Ok(self.tables().regions.clone())
    }

    async fn get_auditor(&self, id: &str) -> Result<Option<Auditor>, DbError> {
        Ok(self.tables().auditors.get(id).cloned())
    }

    async fn save_auditor(&self, auditor: &Auditor) -> Result<(), DbError> {
        self.tables()
            .auditors
            .insert(auditor.actor.id.clone(), auditor.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[tokio::test]
    async fn incidents() {
        testing::exercise_incidents(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn regions() {
        testing::exercise_regions(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn auditors() {
        testing::exercise_auditors(&MemoryStore::new()).await;
    }
}
