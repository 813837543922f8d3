//! Incident operations.

use safety_map_incident_models::{
    Actor, Comment, Incident, IncidentFilter, IncidentStatus, IncidentUpdate, IncidentView,
    NewIncident, Role,
};
use safety_map_region_models::{NewRegion, Region};
use safety_map_scoring::contribution;
use safety_map_spatial::{RegionAssignment, assign_region};

use crate::{Engine, EngineError, RecomputeEvent, new_id};

impl Engine {
    /// Submits a new report.
    ///
    /// The incident joins the region named in `new.region_id`, or else the
    /// first stored region its shape overlaps by more than the threshold.
    /// When nothing matches, a region is created from the incident's own
    /// shape. Scores are computed before returning.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RegionNotFound`] if an explicit region does
    /// not exist, or a store error.
    pub async fn create_incident(
        &self,
        reporter: &Actor,
        new: NewIncident,
    ) -> Result<Incident, EngineError> {
        let now = self.now();

        let (region_id, new_region) = match new.region_id.as_deref() {
            Some(region_id) => (self.get_region(region_id).await?.id, None),
            None => self.match_or_build_region(&new).await?,
        };

        let mut incident = Incident::new(new_id(), reporter, new, now);
        incident.region_id = Some(region_id);
        self.store.save_incident(&incident).await?;

        if let Some(region) = new_region {
            if let Err(e) = self.store.save_region(&region).await {
                self.store.delete_incident(&incident.id).await?;
                return Err(e.into());
            }
            log::info!("Created region {} for unmatched report", region.id);
        }

        log::info!(
            "Incident {} ({}, {}) reported in region {}",
            incident.id,
            incident.incident_type,
            incident.severity,
            incident.region_id.as_deref().unwrap_or_default(),
        );

        self.finish(RecomputeEvent::IncidentCreated {
            incident_id: incident.id,
        })
        .await
    }

    /// Picks the matching region, or builds an unsaved one from the
    /// report's shape.
    async fn match_or_build_region(
        &self,
        new: &NewIncident,
    ) -> Result<(String, Option<Region>), EngineError> {
        let regions = self.store.list_regions().await?;

        match assign_region(&new.coordinates, &regions, &self.config.geometry) {
            RegionAssignment::Existing(region_id) => {
                log::info!("Report matched existing region {region_id}");
                Ok((region_id, None))
            }
            RegionAssignment::CreateNew => {
                let region = Region::new(
                    new_id(),
                    NewRegion {
                        name: None,
                        area_type: new.area_type,
                        coordinates: new.coordinates.clone(),
                        cluster_factor: None,
                    },
                    self.config.scoring.default_cluster_factor,
                    self.now(),
                );
                Ok((region.id.clone(), Some(region)))
            }
        }
    }

    /// Applies reviewer edits. Only admins and NGOs may edit.
    ///
    /// Setting the status to verified or resolved records the reviewer.
    /// An empty update returns the incident untouched.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the role is not allowed, the incident does
    /// not exist, or the store fails.
    pub async fn update_incident(
        &self,
        reviewer: &Actor,
        incident_id: &str,
        update: IncidentUpdate,
    ) -> Result<Incident, EngineError> {
        if !reviewer.role.can_audit() {
            return Err(EngineError::Forbidden {
                role: reviewer.role,
                action: "update incidents",
            });
        }

        let mut incident = self.get_incident(incident_id).await?;
        if update.is_empty() {
            return Ok(incident);
        }

        if let Some(status) = update.status {
            incident.status = status;
            match status {
                IncidentStatus::Verified => incident.verified_by = Some(reviewer.id.clone()),
                IncidentStatus::Resolved => incident.resolved_by = Some(reviewer.id.clone()),
                IncidentStatus::Pending | IncidentStatus::Invalid => {}
            }
        }
        if let Some(severity) = update.severity {
            incident.severity = severity;
        }
        if let Some(alert_level) = update.alert_level {
            incident.alert_level = alert_level;
        }
        incident.updated_at = self.now();
        self.store.save_incident(&incident).await?;

        self.finish(RecomputeEvent::IncidentUpdated {
            incident_id: incident.id,
        })
        .await
    }

    /// Appends a comment.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the text is blank, the incident does not
    /// exist, or the store fails.
    pub async fn add_comment(
        &self,
        author: &Actor,
        incident_id: &str,
        text: &str,
    ) -> Result<Incident, EngineError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EngineError::InvalidInput {
                message: "comment text is empty".to_string(),
            });
        }

        let mut incident = self.get_incident(incident_id).await?;
        let now = self.now();
        incident.comments.push(Comment {
            id: new_id(),
            user_id: author.id.clone(),
            user_email: author.email.clone(),
            text: text.to_string(),
            created_at: now,
        });
        incident.updated_at = now;
        self.store.save_incident(&incident).await?;

        self.finish(RecomputeEvent::CommentAdded {
            incident_id: incident.id,
        })
        .await
    }

    /// Deletes an incident and recomputes its former region.
    ///
    /// Only the reporter or an admin may delete.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the actor may not delete this incident,
    /// it does not exist, or the store fails.
    pub async fn delete_incident(&self, actor: &Actor, incident_id: &str) -> Result<(), EngineError> {
        let incident = self.get_incident(incident_id).await?;
        if incident.user_id != actor.id && actor.role != Role::Admin {
            return Err(EngineError::Forbidden {
                role: actor.role,
                action: "delete another user's incident",
            });
        }

        self.store.delete_incident(incident_id).await?;
        log::info!("Incident {incident_id} deleted by {}", actor.id);

        self.dispatch(&RecomputeEvent::IncidentDeleted {
            region_id: incident.region_id,
        })
        .await?;

        Ok(())
    }

    /// Fetches an incident with its scores evaluated at the current time.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::IncidentNotFound`] or a store error.
    pub async fn get_incident(&self, incident_id: &str) -> Result<Incident, EngineError> {
        self.store
            .get_incident(incident_id)
            .await?
            .map(|incident| self.refreshed(incident))
            .ok_or_else(|| EngineError::IncidentNotFound {
                id: incident_id.to_string(),
            })
    }

    /// Fetches an incident in its presentation form.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::IncidentNotFound`] or a store error.
    pub async fn incident_view(&self, incident_id: &str) -> Result<IncidentView, EngineError> {
        Ok(self.get_incident(incident_id).await?.into())
    }

    /// Lists incidents matching `filter`, scores evaluated at the current
    /// time.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the store fails.
    pub async fn list_incidents(
        &self,
        filter: &IncidentFilter,
    ) -> Result<Vec<Incident>, EngineError> {
        let incidents = self.store.list_incidents(filter).await?;
        Ok(incidents.into_iter().map(|i| self.refreshed(i)).collect())
    }

    /// Lists the incidents linked to a region.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RegionNotFound`] or a store error.
    pub async fn region_incidents(&self, region_id: &str) -> Result<Vec<Incident>, EngineError> {
        let region = self.get_region(region_id).await?;
        let incidents = self.store.incidents_in_region(&region.id).await?;
        Ok(incidents.into_iter().map(|i| self.refreshed(i)).collect())
    }

    fn refreshed(&self, mut incident: Incident) -> Incident {
        contribution::apply(&self.config.scoring, &mut incident, self.now());
        incident
    }

    /// Dispatches an incident event and returns the refreshed incident.
    pub(crate) async fn finish(&self, event: RecomputeEvent) -> Result<Incident, EngineError> {
        let id = event.incident_id().unwrap_or_default().to_string();
        self.dispatch(&event)
            .await?
            .incident
            .ok_or(EngineError::IncidentNotFound { id })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Duration;
    use safety_map_database::{DbError, MemoryStore, Store};
    use safety_map_geography_models::AreaShape;
    use safety_map_incident_models::{AlertLevel, Auditor, Severity};

    use super::*;
    use crate::testing::{actor, approx, engine, report, square, start};
    use crate::{EngineConfig, FixedClock};

    struct FailingWrites {
        inner: MemoryStore,
        incidents: bool,
        regions: bool,
    }

    impl FailingWrites {
        fn new(incidents: bool, regions: bool) -> Self {
            Self {
                inner: MemoryStore::new(),
                incidents,
                regions,
            }
        }
    }

    fn disk_full() -> DbError {
        DbError::Connection("disk full".to_string())
    }

    #[async_trait]
    impl Store for FailingWrites {
        async fn get_incident(&self, id: &str) -> Result<Option<Incident>, DbError> {
            self.inner.get_incident(id).await
        }

        async fn save_incident(&self, incident: &Incident) -> Result<(), DbError> {
            if self.incidents {
                return Err(disk_full());
            }
            self.inner.save_incident(incident).await
        }

        async fn delete_incident(&self, id: &str) -> Result<bool, DbError> {
            self.inner.delete_incident(id).await
        }

        async fn incidents_in_region(&self, region_id: &str) -> Result<Vec<Incident>, DbError> {
            self.inner.incidents_in_region(region_id).await
        }

        async fn list_incidents(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, DbError> {
            self.inner.list_incidents(filter).await
        }

        async fn get_region(&self, id: &str) -> Result<Option<Region>, DbError> {
            self.inner.get_region(id).await
        }

        async fn save_region(&self, region: &Region) -> Result<(), DbError> {
            if self.regions {
                return Err(disk_full());
            }
            self.inner.save_region(region).await
        }

        async fn list_regions(&self) -> Result<Vec<Region>, DbError> {
            self.inner.list_regions().await
        }

        async fn get_auditor(&self, id: &str) -> Result<Option<Auditor>, DbError> {
            self.inner.get_auditor(id).await
        }

        async fn save_auditor(&self, auditor: &Auditor) -> Result<(), DbError> {
            self.inner.save_auditor(auditor).await
        }
    }

    fn engine_on(store: FailingWrites) -> (Engine, Arc<FailingWrites>) {
        let store = Arc::new(store);
        let engine = Engine::with_clock(
            store.clone(),
            EngineConfig::default(),
            Arc::new(FixedClock::new(start())),
        )
        .unwrap();
        (engine, store)
    }

    #[tokio::test]
    async fn failed_incident_write_leaves_no_region() {
        let (engine, store) = engine_on(FailingWrites::new(true, false));
        let result = engine
            .create_incident(
                &actor("u1", Role::User),
                report(square(0.0, 0.0, 0.01), Severity::High),
            )
            .await;

        assert!(matches!(result, Err(EngineError::Db(_))));
        assert!(store.list_regions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_region_write_leaves_no_incident() {
        let (engine, store) = engine_on(FailingWrites::new(false, true));
        let result = engine
            .create_incident(
                &actor("u1", Role::User),
                report(square(0.0, 0.0, 0.01), Severity::High),
            )
            .await;

        assert!(matches!(result, Err(EngineError::Db(_))));
        assert!(
            store
                .list_incidents(&IncidentFilter {
                    limit: 10,
                    ..IncidentFilter::default()
                })
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn first_report_creates_region() {
        let (engine, _) = engine();
        let reporter = actor("u1", Role::User);

        let a = engine
            .create_incident(&reporter, report(square(0.0, 0.0, 0.01), Severity::High))
            .await
            .unwrap();

        assert!(approx(a.initial_weight, 2.5));
        assert!(approx(a.effective_multiplier, 1.0));
        assert!(approx(a.time_decay_factor, 1.0));
        assert!(approx(a.contribution_score, 2.5));

        let regions = engine.list_regions().await.unwrap();
        assert_eq!(regions.len(), 1);
        let region = &regions[0];
        assert_eq!(a.region_id.as_deref(), Some(region.id.as_str()));
        assert_eq!(region.coordinates, a.coordinates);
        assert_eq!(region.stats.incident_count, 1);
        assert!(approx(region.stats.raw_score, 2.5));
        assert!(approx(region.stats.normalized_score, 2.5));
        assert_eq!(region.stats.average_severity, Some(Severity::High));
    }

    #[tokio::test]
    async fn overlapping_report_joins_region() {
        let (engine, _) = engine();
        let reporter = actor("u1", Role::User);

        let a = engine
            .create_incident(&reporter, report(square(0.0, 0.0, 0.01), Severity::High))
            .await
            .unwrap();
        let b = engine
            .create_incident(&reporter, report(square(0.004, 0.0, 0.01), Severity::Low))
            .await
            .unwrap();

        assert_eq!(a.region_id, b.region_id);
        let region = engine
            .get_region(a.region_id.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(region.stats.incident_count, 2);
        assert!(approx(region.stats.raw_score, 3.5));
        assert_eq!(engine.list_regions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn distant_report_gets_own_region() {
        let (engine, _) = engine();
        let reporter = actor("u1", Role::User);

        let a = engine
            .create_incident(&reporter, report(AreaShape::point(36.8, -1.3), Severity::Medium))
            .await
            .unwrap();
        let b = engine
            .create_incident(&reporter, report(AreaShape::point(36.9, -1.3), Severity::Medium))
            .await
            .unwrap();

        assert_ne!(a.region_id, b.region_id);
        assert_eq!(engine.list_regions().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn explicit_region_bypasses_matching() {
        let (engine, _) = engine();
        let reporter = actor("u1", Role::User);
        let region = engine
            .create_region(NewRegion {
                name: Some("Market".to_string()),
                area_type: safety_map_geography_models::AreaType::Polygon,
                coordinates: square(10.0, 10.0, 0.01),
                cluster_factor: None,
            })
            .await
            .unwrap();

        let mut new = report(AreaShape::point(0.0, 0.0), Severity::Low);
        new.region_id = Some(region.id.clone());
        let incident = engine.create_incident(&reporter, new).await.unwrap();
        assert_eq!(incident.region_id.as_deref(), Some(region.id.as_str()));

        let mut missing = report(AreaShape::point(0.0, 0.0), Severity::Low);
        missing.region_id = Some("nope".to_string());
        assert!(matches!(
            engine.create_incident(&reporter, missing).await,
            Err(EngineError::RegionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn invalid_shape_still_gets_a_region() {
        let (engine, _) = engine();
        let reporter = actor("u1", Role::User);
        let bowtie = AreaShape::polygon(&[[0.0, 0.0], [0.01, 0.01], [0.01, 0.0], [0.0, 0.01]]);

        let a = engine
            .create_incident(&reporter, report(bowtie.clone(), Severity::Low))
            .await
            .unwrap();
        let b = engine
            .create_incident(&reporter, report(bowtie, Severity::Low))
            .await
            .unwrap();

        // Unusable shapes overlap nothing, not even themselves.
        assert_ne!(a.region_id, b.region_id);
    }

    #[tokio::test]
    async fn reviewer_updates_rescore() {
        let (engine, _) = engine();
        let reporter = actor("u1", Role::User);
        let ngo = actor("ngo1", Role::Ngo);
        let incident = engine
            .create_incident(&reporter, report(square(0.0, 0.0, 0.01), Severity::Low))
            .await
            .unwrap();

        let updated = engine
            .update_incident(
                &ngo,
                &incident.id,
                IncidentUpdate {
                    status: Some(IncidentStatus::Verified),
                    severity: Some(Severity::Critical),
                    alert_level: Some(AlertLevel::HighAlert),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, IncidentStatus::Verified);
        assert_eq!(updated.verified_by.as_deref(), Some("ngo1"));
        assert!(updated.resolved_by.is_none());
        assert!(approx(updated.contribution_score, 4.0));

        let region = engine
            .get_region(updated.region_id.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(region.stats.high_severity_count, 1);
        assert!(approx(region.stats.raw_score, 4.0));

        let resolved = engine
            .update_incident(
                &ngo,
                &incident.id,
                IncidentUpdate {
                    status: Some(IncidentStatus::Resolved),
                    ..IncidentUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(resolved.resolved_by.as_deref(), Some("ngo1"));
    }

    #[tokio::test]
    async fn users_cannot_update() {
        let (engine, _) = engine();
        let reporter = actor("u1", Role::User);
        let incident = engine
            .create_incident(&reporter, report(square(0.0, 0.0, 0.01), Severity::Low))
            .await
            .unwrap();
        let err = engine
            .update_incident(
                &reporter,
                &incident.id,
                IncidentUpdate {
                    severity: Some(Severity::Critical),
                    ..IncidentUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn comment_refreshes_decay() {
        let (engine, clock) = engine();
        let reporter = actor("u1", Role::User);
        let incident = engine
            .create_incident(&reporter, report(square(0.0, 0.0, 0.01), Severity::High))
            .await
            .unwrap();

        clock.advance(Duration::days(100));
        let commented = engine
            .add_comment(&reporter, &incident.id, "  Still dark here  ")
            .await
            .unwrap();

        assert_eq!(commented.comments.len(), 1);
        assert_eq!(commented.comments[0].text, "Still dark here");
        assert!(approx(commented.time_decay_factor, (-1.0_f64).exp()));
        assert!(approx(commented.contribution_score, 2.5 * (-1.0_f64).exp()));

        let view = engine.incident_view(&incident.id).await.unwrap();
        assert_eq!(view.comment_count, 1);
        assert!(approx(view.final_weight, commented.contribution_score));

        assert!(matches!(
            engine.add_comment(&reporter, &incident.id, "   ").await,
            Err(EngineError::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn deletion_rules_and_recompute() {
        let (engine, _) = engine();
        let reporter = actor("u1", Role::User);
        let other = actor("u2", Role::User);
        let admin = actor("admin", Role::Admin);

        let a = engine
            .create_incident(&reporter, report(square(0.0, 0.0, 0.01), Severity::High))
            .await
            .unwrap();
        let b = engine
            .create_incident(&other, report(square(0.004, 0.0, 0.01), Severity::Low))
            .await
            .unwrap();
        let region_id = a.region_id.clone().unwrap();

        assert!(matches!(
            engine.delete_incident(&other, &a.id).await,
            Err(EngineError::Forbidden { .. })
        ));

        engine.delete_incident(&reporter, &a.id).await.unwrap();
        let region = engine.get_region(&region_id).await.unwrap();
        assert_eq!(region.stats.incident_count, 1);
        assert!(approx(region.stats.raw_score, 1.0));

        engine.delete_incident(&admin, &b.id).await.unwrap();
        let region = engine.get_region(&region_id).await.unwrap();
        assert_eq!(region.stats.incident_count, 0);
        assert!(region.stats.average_severity.is_none());
        assert!(approx(region.stats.safety_score, 10.0));

        assert!(matches!(
            engine.get_incident(&a.id).await,
            Err(EngineError::IncidentNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn listing_filters() {
        let (engine, _) = engine();
        let reporter = actor("u1", Role::User);
        let mut gbv = report(AreaShape::point(1.0, 1.0), Severity::High);
        gbv.incident_type = "gbv".to_string();
        engine.create_incident(&reporter, gbv).await.unwrap();
        engine
            .create_incident(&reporter, report(AreaShape::point(2.0, 2.0), Severity::Low))
            .await
            .unwrap();

        let only_gbv = engine
            .list_incidents(&IncidentFilter {
                incident_type: Some("gbv".to_string()),
                ..IncidentFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(only_gbv.len(), 1);

        let region_id = only_gbv[0].region_id.clone().unwrap();
        assert_eq!(engine.region_incidents(&region_id).await.unwrap().len(), 1);
    }
}
