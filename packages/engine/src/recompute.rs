//! Cascading recomputation.
//!
//! Every change that can move a score is expressed as a [`RecomputeEvent`]
//! and handled by [`Engine::dispatch`]. Handling an event only reads the
//! current stored state and the clock, so dispatching the same event twice
//! at the same instant leaves identical results.

use safety_map_incident_models::{Incident, IncidentFilter};
use safety_map_region_models::Region;
use safety_map_scoring::{Contribution, contribution, region};

use crate::{Engine, EngineError};

/// A change that requires scores to be refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecomputeEvent {
    /// A report was submitted.
    IncidentCreated {
        /// The new incident.
        incident_id: String,
    },
    /// Status, severity or alert level was edited.
    IncidentUpdated {
        /// The edited incident.
        incident_id: String,
    },
    /// An audit was appended.
    AuditAdded {
        /// The audited incident.
        incident_id: String,
    },
    /// A comment was posted. Comments do not enter the formula but the
    /// refresh brings time decay up to date.
    CommentAdded {
        /// The commented incident.
        incident_id: String,
    },
    /// A validation flag was cleared.
    ValidationChanged {
        /// The affected incident.
        incident_id: String,
    },
    /// An incident was removed.
    IncidentDeleted {
        /// The region it belonged to.
        region_id: Option<String>,
    },
    /// A region's cluster factor was changed.
    ClusterFactorChanged {
        /// The region.
        region_id: String,
    },
}

impl RecomputeEvent {
    /// The incident whose contribution must be refreshed, if any.
    #[must_use]
    pub fn incident_id(&self) -> Option<&str> {
        match self {
            Self::IncidentCreated { incident_id }
            | Self::IncidentUpdated { incident_id }
            | Self::AuditAdded { incident_id }
            | Self::CommentAdded { incident_id }
            | Self::ValidationChanged { incident_id } => Some(incident_id),
            Self::IncidentDeleted { .. } | Self::ClusterFactorChanged { .. } => None,
        }
    }
}

/// What a dispatch refreshed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recomputed {
    /// The refreshed incident, for incident events.
    pub incident: Option<Incident>,
    /// The refreshed region, when one was found.
    pub region: Option<Region>,
}

impl Engine {
    /// Handles a recompute event.
    ///
    /// A region that has disappeared is logged and skipped for incident
    /// events, so the incident change itself still succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the store fails, the event's incident
    /// does not exist, or a cluster-factor event names a missing region.
    pub async fn dispatch(&self, event: &RecomputeEvent) -> Result<Recomputed, EngineError> {
        log::debug!("Dispatching {event:?}");

        match event {
            RecomputeEvent::ClusterFactorChanged { region_id } => Ok(Recomputed {
                incident: None,
                region: Some(self.recompute_region(region_id).await?),
            }),
            RecomputeEvent::IncidentDeleted { region_id } => {
                let region = match region_id {
                    Some(region_id) => self.refresh_region(region_id).await?,
                    None => None,
                };
                Ok(Recomputed {
                    incident: None,
                    region,
                })
            }
            RecomputeEvent::IncidentCreated { incident_id }
            | RecomputeEvent::IncidentUpdated { incident_id }
            | RecomputeEvent::AuditAdded { incident_id }
            | RecomputeEvent::CommentAdded { incident_id }
            | RecomputeEvent::ValidationChanged { incident_id } => {
                let incident = self.recompute_incident(incident_id).await?;
                let region = match incident.region_id.as_deref() {
                    Some(region_id) => self.refresh_region(region_id).await?,
                    None => None,
                };
                Ok(Recomputed {
                    incident: Some(incident),
                    region,
                })
            }
        }
    }

    /// Recomputes and persists an incident's four score fields.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the incident does not exist or the store
    /// fails.
    pub async fn recompute_incident(&self, incident_id: &str) -> Result<Incident, EngineError> {
        let mut incident = self.get_incident(incident_id).await?;
        contribution::apply(&self.config.scoring, &mut incident, self.now());
        self.store.save_incident(&incident).await?;
        Ok(incident)
    }

    /// Rebuilds and persists a region's statistics from its incidents.
    ///
    /// Every linked incident whose derived scores moved since it was last
    /// saved is written back first, so stored incidents always sum to the
    /// region's raw score.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RegionNotFound`] if the region does not exist,
    /// or a store error.
    pub async fn recompute_region(&self, region_id: &str) -> Result<Region, EngineError> {
        let mut region = self.get_region(region_id).await?;
        let mut incidents = self.store.incidents_in_region(region_id).await?;
        let now = self.now();

        for incident in &mut incidents {
            let stored = Contribution::stored(incident);
            if contribution::apply(&self.config.scoring, incident, now) != stored {
                self.store.save_incident(incident).await?;
            }
        }

        region.stats = region::aggregate(
            &self.config.scoring,
            &incidents,
            region.cluster_factor,
            now,
        );
        region.updated_at = now;
        self.store.save_region(&region).await?;

        log::debug!(
            "Region {} recomputed: {} incidents, raw {:.4}, normalized {:.2}",
            region.id,
            region.stats.incident_count,
            region.stats.raw_score,
            region.stats.normalized_score,
        );

        Ok(region)
    }

    /// Region recompute triggered by an incident change. A missing region
    /// is logged and yields `None`.
    async fn refresh_region(&self, region_id: &str) -> Result<Option<Region>, EngineError> {
        match self.recompute_region(region_id).await {
            Ok(region) => Ok(Some(region)),
            Err(EngineError::RegionNotFound { id }) => {
                log::warn!("Region {id} not found while recomputing, skipping");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Refreshes every incident, then every region.
    ///
    /// Returns the number of incidents and regions recomputed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the store fails.
    pub async fn recompute_all(&self) -> Result<(usize, usize), EngineError> {
        let incidents = self
            .store
            .list_incidents(&IncidentFilter {
                limit: usize::MAX,
                ..IncidentFilter::default()
            })
            .await?;
        for incident in &incidents {
            self.recompute_incident(&incident.id).await?;
        }

        let regions = self.store.list_regions().await?;
        for region in &regions {
            self.recompute_region(&region.id).await?;
        }

        log::info!(
            "Recomputed {} incidents and {} regions",
            incidents.len(),
            regions.len()
        );

        Ok((incidents.len(), regions.len()))
    }
}
