#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic shape types shared by incidents and regions.
//!
//! Shapes are stored exactly as the reporting client submitted them: a
//! `GeoJSON`-like object with a `type` and `coordinates`. Circles are not
//! part of `GeoJSON`, so they carry an extra `radius` member (in meters).
//! Interpretation of the geometry (buffering, area, overlap) lives in
//! `safety_map_spatial`; this crate only models and round-trips the data.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum_macros::{AsRefStr, Display, EnumString};

/// The kind of area a report covers, as chosen in the reporting UI.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AreaType {
    /// A single location.
    Point,
    /// A drawn polygon.
    Polygon,
    /// A center point with a radius.
    Circle,
}

/// A `GeoJSON`-like geometry object.
///
/// Kept as raw JSON so that whatever the client sent is persisted
/// untouched, including shapes the spatial layer later rejects as invalid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AreaShape(pub Value);

impl AreaShape {
    /// Creates a `Point` shape.
    #[must_use]
    pub fn point(lng: f64, lat: f64) -> Self {
        Self(json!({ "type": "Point", "coordinates": [lng, lat] }))
    }

    /// Creates a single-ring `Polygon` shape from `[lng, lat]` pairs.
    ///
    /// The ring is closed automatically if the last vertex does not repeat
    /// the first.
    #[must_use]
    pub fn polygon(ring: &[[f64; 2]]) -> Self {
        let mut ring = ring.to_vec();
        if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
            if first != last {
                ring.push(first);
            }
        }
        Self(json!({ "type": "Polygon", "coordinates": [ring] }))
    }

    /// Creates a `Circle` shape with a radius in meters.
    #[must_use]
    pub fn circle(lng: f64, lat: f64, radius_m: f64) -> Self {
        Self(json!({ "type": "Circle", "coordinates": [lng, lat], "radius": radius_m }))
    }

    /// The `type` member of the geometry, if present.
    #[must_use]
    pub fn geometry_type(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    /// The area type implied by the geometry `type` member.
    ///
    /// `MultiPolygon` is reported as [`AreaType::Polygon`].
    #[must_use]
    pub fn area_type(&self) -> Option<AreaType> {
        match self.geometry_type()? {
            "Point" => Some(AreaType::Point),
            "Polygon" | "MultiPolygon" => Some(AreaType::Polygon),
            "Circle" => Some(AreaType::Circle),
            _ => None,
        }
    }

    /// For `Point` and `Circle` shapes, the `[lng, lat]` center.
    #[must_use]
    pub fn center(&self) -> Option<(f64, f64)> {
        let coords = self.0.get("coordinates")?.as_array()?;
        match coords.as_slice() {
            [lng, lat] => Some((lng.as_f64()?, lat.as_f64()?)),
            _ => None,
        }
    }

    /// For `Circle` shapes, the radius in meters.
    #[must_use]
    pub fn radius_m(&self) -> Option<f64> {
        self.0.get("radius").and_then(Value::as_f64)
    }
}

impl From<Value> for AreaShape {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polygon_ring_is_closed() {
        let shape = AreaShape::polygon(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]);
        let ring = shape.0["coordinates"][0].as_array().unwrap();
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn area_type_from_geometry() {
        assert_eq!(AreaShape::point(1.0, 2.0).area_type(), Some(AreaType::Point));
        assert_eq!(
            AreaShape::circle(1.0, 2.0, 50.0).area_type(),
            Some(AreaType::Circle)
        );
        assert_eq!(AreaShape(json!({ "type": "LineString" })).area_type(), None);
    }

    #[test]
    fn circle_members() {
        let shape = AreaShape::circle(-77.0, 38.9, 250.0);
        assert_eq!(shape.center(), Some((-77.0, 38.9)));
        assert_eq!(shape.radius_m(), Some(250.0));
    }

    #[test]
    fn shape_round_trips_untouched() {
        let raw = json!({ "type": "Polygon", "coordinates": [[[0, 0], [0, 0]]], "extra": true });
        let shape: AreaShape = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&shape).unwrap(), raw);
    }

    #[test]
    fn area_type_parses_case_insensitively() {
        assert_eq!("Circle".parse::<AreaType>().unwrap(), AreaType::Circle);
        assert_eq!(AreaType::Polygon.to_string(), "polygon");
    }
}
