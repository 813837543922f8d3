//! R-tree over region shapes for first-match region assignment.

use geo::MultiPolygon;
use rstar::{AABB, RTree, RTreeObject};
use safety_map_geography_models::AreaShape;
use safety_map_region_models::Region;
use serde::{Deserialize, Serialize};

use crate::shape::{compute_envelope, to_multipolygon};
use crate::{GeometryConfig, polygon_overlap};

/// Outcome of matching a new shape against existing regions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "region_id", rename_all = "snake_case")]
pub enum RegionAssignment {
    /// Join the region with this id.
    Existing(String),
    /// No region overlaps enough; a new one should be created.
    CreateNew,
}

/// A region polygon stored in the R-tree with its storage position.
struct RegionEntry {
    position: usize,
    region_id: String,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for RegionEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Spatial index of the regions a new report can join.
///
/// Regions whose geometry is unusable are left out; they can never reach
/// the overlap threshold anyway.
pub struct RegionIndex {
    tree: RTree<RegionEntry>,
}

impl RegionIndex {
    /// Indexes `regions`, remembering their order.
    #[must_use]
    pub fn new(regions: &[Region], config: &GeometryConfig) -> Self {
        let mut entries = Vec::with_capacity(regions.len());

        for (position, region) in regions.iter().enumerate() {
            let Some(polygon) = to_multipolygon(&region.coordinates, config) else {
                log::warn!("Region {} has unusable geometry, skipping", region.id);
                continue;
            };

            entries.push(RegionEntry {
                position,
                region_id: region.id.clone(),
                envelope: compute_envelope(&polygon),
                polygon,
            });
        }

        log::debug!(
            "Indexed {} of {} regions for matching",
            entries.len(),
            regions.len()
        );

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether no region was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// First region, in storage order, overlapping `shape` by more than
    /// `overlap_threshold`.
    ///
    /// The R-tree only narrows the candidates. They are then visited in the
    /// order the regions were given, so the result matches a plain linear
    /// scan.
    #[must_use]
    pub fn assign(&self, shape: &AreaShape, config: &GeometryConfig) -> RegionAssignment {
        let Some(polygon) = to_multipolygon(shape, config) else {
            log::debug!("New shape is not a usable area, no region can match");
            return RegionAssignment::CreateNew;
        };

        let query_env = compute_envelope(&polygon);
        let mut candidates: Vec<&RegionEntry> = self
            .tree
            .locate_in_envelope_intersecting(&query_env)
            .collect();
        candidates.sort_by_key(|entry| entry.position);

        for entry in candidates {
            let percent = polygon_overlap(&entry.polygon, &polygon);
            log::debug!("Overlap with region {}: {percent:.2}%", entry.region_id);
            if percent > config.overlap_threshold {
                return RegionAssignment::Existing(entry.region_id.clone());
            }
        }

        RegionAssignment::CreateNew
    }
}
