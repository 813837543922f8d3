//! Conversion of stored shapes into `geo` polygons.

use std::f64::consts::TAU;

use geo::{BoundingRect, Coord, LineString, MultiPolygon, Polygon, Validation};
use geojson::GeoJson;
use rstar::AABB;
use safety_map_geography_models::AreaShape;

use crate::GeometryConfig;

/// Converts a shape into a valid [`MultiPolygon`].
///
/// Points and circles become discs. Returns `None` for anything that
/// cannot take part in an area comparison: unparseable JSON, unsupported
/// geometry types, empty or self-intersecting polygons and non-finite
/// coordinates.
#[must_use]
pub fn to_multipolygon(shape: &AreaShape, config: &GeometryConfig) -> Option<MultiPolygon<f64>> {
    let multi_polygon = match shape.geometry_type()? {
        "Point" => {
            let (lng, lat) = shape.center()?;
            MultiPolygon(vec![disc(
                Coord { x: lng, y: lat },
                config.point_buffer_radius,
                config.disc_segments,
            )?])
        }
        "Circle" => {
            let (lng, lat) = shape.center()?;
            let radius = shape
                .radius_m()
                .map_or(config.point_buffer_radius, |meters| {
                    meters / config.meters_per_degree
                });
            MultiPolygon(vec![disc(
                Coord { x: lng, y: lat },
                radius,
                config.disc_segments,
            )?])
        }
        "Polygon" | "MultiPolygon" => parse_geojson_to_multipolygon(shape)?,
        _ => return None,
    };

    if multi_polygon.0.is_empty() || !multi_polygon.is_valid() {
        return None;
    }

    Some(multi_polygon)
}

/// Regular polygon approximating a circle of `radius` coordinate units.
///
/// Returns `None` for a non-finite center, a non-positive radius or fewer
/// than three segments.
#[must_use]
pub fn disc(center: Coord<f64>, radius: f64, segments: usize) -> Option<Polygon<f64>> {
    if segments < 3
        || !center.x.is_finite()
        || !center.y.is_finite()
        || !radius.is_finite()
        || radius <= 0.0
    {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let step = TAU / segments as f64;
    let ring: Vec<Coord<f64>> = (0..segments)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let angle = step * i as f64;
            Coord {
                x: radius.mul_add(angle.cos(), center.x),
                y: radius.mul_add(angle.sin(), center.y),
            }
        })
        .collect();

    Some(Polygon::new(LineString::new(ring), vec![]))
}

fn parse_geojson_to_multipolygon(shape: &AreaShape) -> Option<MultiPolygon<f64>> {
    let geojson: GeoJson = shape.0.to_string().parse().ok()?;
    if let GeoJson::Geometry(geom) = geojson {
        let geo_geom: geo::Geometry<f64> = geom.try_into().ok()?;
        match geo_geom {
            geo::Geometry::MultiPolygon(mp) => Some(mp),
            geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
            _ => None,
        }
    } else {
        None
    }
}

/// Bounding box of a [`MultiPolygon`] as an R-tree envelope.
pub(crate) fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}
