//! Outward geometry buffering
//!
//! The geometry is projected into a local metric frame, buffered there with
//! round joins and caps, and projected back. Concave outlines keep their
//! shape and holes shrink rather than disappear. A result that crosses the
//! antimeridian is split into parts on either side of it.

use geo::orient::{Direction, Orient};
use geo::{coord, BooleanOps, BoundingRect, Buffer, Coord, MapCoords, MultiPolygon, Rect};
use tileseed_core::{Geometry, Position};

/// Mean earth radius in meters
const EARTH_RADIUS_M: f64 = 6_371_008.8;

const METERS_PER_DEGREE: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

/// Highest latitude used for longitude scaling
const MAX_SCALE_LATITUDE: f64 = 89.0;

/// Equirectangular frame in meters around a geometry.
///
/// Longitudes are unwrapped relative to `lon0`, so an input that already
/// crosses the antimeridian stays contiguous. Longitude is scaled at the
/// geometry's highest latitude, so east-west distances in the frame never
/// exceed the ground distance and the buffer is never narrower than asked.
#[derive(Debug, Clone, Copy)]
struct LocalFrame {
    lon0: f64,
    lat0: f64,
    meters_per_degree_lon: f64,
}

impl LocalFrame {
    fn around(positions: &[Position], meters: f64) -> Option<Self> {
        let first = positions.first()?;
        let (min_lat, max_lat) = positions.iter().fold((first.lat, first.lat), |(lo, hi), p| {
            (lo.min(p.lat), hi.max(p.lat))
        });
        let widest = (min_lat.abs().max(max_lat.abs()) + meters / METERS_PER_DEGREE)
            .min(MAX_SCALE_LATITUDE);

        Some(Self {
            lon0: first.lon,
            lat0: (min_lat + max_lat) / 2.0,
            meters_per_degree_lon: METERS_PER_DEGREE * widest.to_radians().cos(),
        })
    }

    fn unwrap_lon(&self, lon: f64) -> f64 {
        self.lon0 + (lon - self.lon0 + 180.0).rem_euclid(360.0) - 180.0
    }

    fn forward(&self, p: Position) -> Coord<f64> {
        coord! {
            x: (self.unwrap_lon(p.lon) - self.lon0) * self.meters_per_degree_lon,
            y: (p.lat - self.lat0) * METERS_PER_DEGREE,
        }
    }

    /// Back to degrees; longitude may fall outside [-180, 180]
    fn inverse(&self, c: Coord<f64>) -> Coord<f64> {
        coord! {
            x: self.lon0 + c.x / self.meters_per_degree_lon,
            y: (self.lat0 + c.y / METERS_PER_DEGREE).clamp(-90.0, 90.0),
        }
    }

    fn line(&self, positions: &[Position]) -> geo::LineString<f64> {
        positions.iter().map(|p| self.forward(*p)).collect()
    }

    fn polygon(&self, rings: &[Vec<Position>]) -> geo::Polygon<f64> {
        let mut rings = rings.iter().map(|ring| self.line(ring));
        let exterior = rings.next().unwrap_or_else(|| geo::LineString::new(Vec::new()));
        geo::Polygon::new(exterior, rings.collect())
    }

    fn buffer(&self, geometry: &Geometry, meters: f64) -> MultiPolygon<f64> {
        match geometry {
            Geometry::Point { coordinates } => geo::Point::from(self.forward(*coordinates)).buffer(meters),
            Geometry::MultiPoint { coordinates } => coordinates
                .iter()
                .map(|p| geo::Point::from(self.forward(*p)))
                .collect::<geo::MultiPoint<f64>>()
                .buffer(meters),
            Geometry::LineString { coordinates } => self.line(coordinates).buffer(meters),
            Geometry::MultiLineString { coordinates } => {
                geo::MultiLineString::new(coordinates.iter().map(|l| self.line(l)).collect())
                    .buffer(meters)
            }
            Geometry::Polygon { coordinates } => self.polygon(coordinates).buffer(meters),
            Geometry::MultiPolygon { coordinates } => {
                MultiPolygon::new(coordinates.iter().map(|p| self.polygon(p)).collect())
                    .buffer(meters)
            }
            Geometry::GeometryCollection { geometries } => geometries
                .iter()
                .filter(|g| !g.positions().is_empty())
                .map(|g| self.buffer(g, meters))
                .fold(MultiPolygon::new(Vec::new()), |acc, part| acc.union(&part)),
        }
    }
}

/// Expand `geometry` outward by `meters`.
///
/// Every input shape becomes area: the result is a Polygon, or a
/// MultiPolygon when the buffered parts stay disjoint or the result crosses
/// the antimeridian. A non-positive distance or an empty geometry is
/// returned unchanged.
pub fn buffer_geometry(geometry: &Geometry, meters: f64) -> Geometry {
    let positions = geometry.positions();
    let Some(frame) = LocalFrame::around(&positions, meters).filter(|_| meters > 0.0) else {
        return geometry.clone();
    };

    let buffered = frame.buffer(geometry, meters).map_coords(|c| frame.inverse(c));
    let mut parts: Vec<Vec<Vec<Position>>> = split_at_antimeridian(buffered)
        .into_iter()
        .map(|polygon| rings(&polygon.orient(Direction::Default)))
        .collect();

    match parts.len() {
        0 => geometry.clone(),
        1 => Geometry::Polygon {
            coordinates: parts.remove(0),
        },
        _ => Geometry::MultiPolygon { coordinates: parts },
    }
}

/// Cut polygons at lon ±180 and shift the overflow back into range
fn split_at_antimeridian(buffered: MultiPolygon<f64>) -> Vec<geo::Polygon<f64>> {
    let Some(extent) = buffered.bounding_rect() else {
        return Vec::new();
    };
    if extent.min().x >= -180.0 && extent.max().x <= 180.0 {
        return buffered.0;
    }

    [-360.0, 0.0, 360.0]
        .into_iter()
        .flat_map(|shift: f64| {
            let window = MultiPolygon::new(vec![Rect::new(
                coord! { x: shift - 180.0, y: -90.0 },
                coord! { x: shift + 180.0, y: 90.0 },
            )
            .to_polygon()]);
            buffered
                .intersection(&window)
                .map_coords(|c| coord! { x: c.x - shift, y: c.y })
                .0
        })
        .collect()
}

fn rings(polygon: &geo::Polygon<f64>) -> Vec<Vec<Position>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.coords().map(|c| Position::new(c.x, c.y)).collect())
        .collect()
}
