#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry matching for incident reports.
//!
//! Converts stored shapes into polygons, measures how much two shapes
//! overlap, and decides which existing region (if any) a new report
//! belongs to. Region envelopes are kept in an R-tree so only nearby
//! regions are compared exactly.

pub mod index;
pub mod shape;

use geo::{Area, BooleanOps, MultiPolygon};
use rstar::Envelope;
use safety_map_geography_models::AreaShape;
use safety_map_region_models::Region;
use serde::{Deserialize, Serialize};

pub use index::{RegionAssignment, RegionIndex};
pub use shape::{disc, to_multipolygon};

/// Tuning for shape conversion and region matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// A report joins a region only when overlap exceeds this percentage.
    pub overlap_threshold: f64,
    /// Radius (coordinate units) of the disc a point is buffered into.
    pub point_buffer_radius: f64,
    /// Vertices used to approximate a disc.
    pub disc_segments: usize,
    /// Meters per coordinate unit, used for circle radii.
    pub meters_per_degree: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: 50.0,
            point_buffer_radius: 0.001,
            disc_segments: 64,
            meters_per_degree: 111_320.0,
        }
    }
}

impl GeometryConfig {
    /// Lists every violated constraint; empty when usable.
    #[must_use]
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if !(0.0..=100.0).contains(&self.overlap_threshold) {
            problems.push(format!(
                "overlap_threshold must be within [0, 100], got {}",
                self.overlap_threshold
            ));
        }
        for (name, value) in [
            ("point_buffer_radius", self.point_buffer_radius),
            ("meters_per_degree", self.meters_per_degree),
        ] {
            if value.is_nan() || value <= 0.0 {
                problems.push(format!("{name} must be > 0, got {value}"));
            }
        }
        if self.disc_segments < 3 {
            problems.push(format!(
                "disc_segments must be >= 3, got {}",
                self.disc_segments
            ));
        }

        problems
    }
}

/// Percentage (0-100) of the smaller shape covered by the other.
///
/// `intersection / min(area_a, area_b) * 100`. Invalid shapes, disjoint
/// envelopes and zero-area shapes all yield 0.
#[must_use]
pub fn overlap(a: &AreaShape, b: &AreaShape, config: &GeometryConfig) -> f64 {
    let Some(a) = to_multipolygon(a, config) else {
        log::debug!("overlap: first shape is not a usable area");
        return 0.0;
    };
    let Some(b) = to_multipolygon(b, config) else {
        log::debug!("overlap: second shape is not a usable area");
        return 0.0;
    };
    polygon_overlap(&a, &b)
}

/// [`overlap`] on already converted polygons.
#[must_use]
pub fn polygon_overlap(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> f64 {
    if !shape::compute_envelope(a).intersects(&shape::compute_envelope(b)) {
        return 0.0;
    }

    let smaller = a.unsigned_area().min(b.unsigned_area());
    if smaller.is_nan() || smaller <= 0.0 {
        return 0.0;
    }

    let shared = a.intersection(b).unsigned_area();
    let percent = shared / smaller * 100.0;
    if percent.is_nan() {
        return 0.0;
    }
    percent.clamp(0.0, 100.0)
}

/// Picks the region a new shape belongs to.
///
/// Builds a throwaway [`RegionIndex`]; callers matching many shapes against
/// the same regions should build the index once instead.
#[must_use]
pub fn assign_region(
    shape: &AreaShape,
    regions: &[Region],
    config: &GeometryConfig,
) -> RegionAssignment {
    RegionIndex::new(regions, config).assign(shape, config)
}
