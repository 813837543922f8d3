#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Region aggregate and score types.
//!
//! A [`Region`] is a geographic cluster of incident reports. Everything in
//! [`RegionStats`] is a pure function of the incidents currently linked to
//! the region, its cluster factor and the current time, and is replaced
//! wholesale on every recompute.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use safety_map_geography_models::{AreaShape, AreaType};
use safety_map_incident_models::Severity;
use serde::{Deserialize, Serialize};

/// Display name for regions created without one.
pub const DEFAULT_REGION_NAME: &str = "Unnamed Region";

/// Legacy safety score of a region without incidents (0-10, 10 = safest).
pub const MAX_SAFETY_SCORE: f64 = 10.0;

/// Aggregate statistics and scores derived from a region's incidents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionStats {
    /// Number of linked incidents.
    pub incident_count: u32,
    /// Bucketed mean severity, `None` when there are no incidents.
    pub average_severity: Option<Severity>,
    /// Incidents with high or critical severity.
    pub high_severity_count: u32,
    /// Incident category histogram.
    pub incident_types: BTreeMap<String, u32>,
    /// `cluster_factor * sum(contribution_score)`.
    pub raw_score: f64,
    /// `raw_score` scaled to 0-100 and saturated at 100.
    pub normalized_score: f64,
    /// Legacy 0-10 score, lower is more dangerous.
    pub safety_score: f64,
}

impl Default for RegionStats {
    fn default() -> Self {
        Self {
            incident_count: 0,
            average_severity: None,
            high_severity_count: 0,
            incident_types: BTreeMap::new(),
            raw_score: 0.0,
            normalized_score: 0.0,
            safety_score: MAX_SAFETY_SCORE,
        }
    }
}

/// A comment on a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionComment {
    /// Comment id.
    pub id: String,
    /// Author id.
    pub user_id: String,
    /// Author email.
    pub user_email: String,
    /// Comment body.
    pub text: String,
    /// When the comment was posted.
    pub created_at: DateTime<Utc>,
}

/// A geographic cluster of incidents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Unique region id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Kind of area.
    pub area_type: AreaType,
    /// Region geometry.
    pub coordinates: AreaShape,
    /// Cluster density factor supplied from outside the scoring core.
    pub cluster_factor: f64,
    /// Derived statistics.
    #[serde(flatten)]
    pub stats: RegionStats,
    /// Discussion thread.
    #[serde(default)]
    pub comments: Vec<RegionComment>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last recompute or mutation time.
    pub updated_at: DateTime<Utc>,
}

/// Request payload for creating a region explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRegion {
    /// Display name, [`DEFAULT_REGION_NAME`] when absent.
    #[serde(default)]
    pub name: Option<String>,
    /// Kind of area.
    pub area_type: AreaType,
    /// Geometry.
    pub coordinates: AreaShape,
    /// Cluster factor, the configured default when absent.
    #[serde(default)]
    pub cluster_factor: Option<f64>,
}

impl Region {
    /// Builds an empty region.
    #[must_use]
    pub fn new(id: String, new: NewRegion, default_cluster_factor: f64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name.unwrap_or_else(|| DEFAULT_REGION_NAME.to_string()),
            area_type: new.area_type,
            coordinates: new.coordinates,
            cluster_factor: new.cluster_factor.unwrap_or(default_cluster_factor),
            stats: RegionStats::default(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
