//! Region operations.

use safety_map_geography_models::AreaShape;
use safety_map_incident_models::Actor;
use safety_map_region_models::{NewRegion, Region, RegionComment};
use safety_map_spatial::{RegionAssignment, assign_region};

use crate::{Engine, EngineError, RecomputeEvent, new_id};

impl Engine {
    /// Creates an empty region.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the cluster factor is negative or not
    /// finite, or the store fails.
    pub async fn create_region(&self, new: NewRegion) -> Result<Region, EngineError> {
        if let Some(cluster_factor) = new.cluster_factor {
            check_cluster_factor(cluster_factor)?;
        }

        let region = Region::new(
            new_id(),
            new,
            self.config.scoring.default_cluster_factor,
            self.now(),
        );
        self.store.save_region(&region).await?;
        log::info!("Created region {} ({})", region.id, region.name);

        Ok(region)
    }

    /// Changes a region's cluster factor and rescores it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the factor is negative or not finite, the
    /// region does not exist, or the store fails.
    pub async fn set_cluster_factor(
        &self,
        region_id: &str,
        cluster_factor: f64,
    ) -> Result<Region, EngineError> {
        check_cluster_factor(cluster_factor)?;

        let mut region = self.get_region(region_id).await?;
        region.cluster_factor = cluster_factor;
        self.store.save_region(&region).await?;

        let refreshed = self
            .dispatch(&RecomputeEvent::ClusterFactorChanged {
                region_id: region.id,
            })
            .await?;

        refreshed.region.ok_or_else(|| EngineError::RegionNotFound {
            id: region_id.to_string(),
        })
    }

    /// Appends a comment to a region.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the text is blank, the region does not
    /// exist, or the store fails.
    pub async fn add_region_comment(
        &self,
        author: &Actor,
        region_id: &str,
        text: &str,
    ) -> Result<Region, EngineError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EngineError::InvalidInput {
                message: "comment text is empty".to_string(),
            });
        }

        let mut region = self.get_region(region_id).await?;
        let now = self.now();
        region.comments.push(RegionComment {
            id: new_id(),
            user_id: author.id.clone(),
            user_email: author.email.clone(),
            text: text.to_string(),
            created_at: now,
        });
        region.updated_at = now;
        self.store.save_region(&region).await?;

        Ok(region)
    }

    /// Fetches a region.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RegionNotFound`] or a store error.
    pub async fn get_region(&self, region_id: &str) -> Result<Region, EngineError> {
        self.store
            .get_region(region_id)
            .await?
            .ok_or_else(|| EngineError::RegionNotFound {
                id: region_id.to_string(),
            })
    }

    /// Lists all regions in storage order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the store fails.
    pub async fn list_regions(&self) -> Result<Vec<Region>, EngineError> {
        Ok(self.store.list_regions().await?)
    }

    /// Reports which region a shape would join, without storing anything.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the store fails.
    pub async fn match_region(&self, shape: &AreaShape) -> Result<RegionAssignment, EngineError> {
        let regions = self.store.list_regions().await?;
        Ok(assign_region(shape, &regions, &self.config.geometry))
    }
}

fn check_cluster_factor(cluster_factor: f64) -> Result<(), EngineError> {
    if cluster_factor.is_finite() && cluster_factor >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidInput {
            message: format!("cluster factor must be a finite number >= 0, got {cluster_factor}"),
        })
    }
}
