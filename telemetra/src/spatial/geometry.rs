use crate::common::{EARTH_RADIUS_KM, KM_PER_DEGREE};
use crate::errors::{ErrorKind, TelemetraError, TelemetraResult};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};

/// Tolerance used when deciding whether a point lies on a polygon edge.
const EDGE_EPSILON: f64 = 1e-12;

/// A geographic point with validated latitude and longitude.
///
/// Latitude must lie in `[-90, 90]` and longitude in `[-180, 180]`. The
/// constructor takes `(latitude, longitude)`; the serialized form is the
/// `{"lat": .., "lng": ..}` object used by events and by the
/// `_locationInCircle` wire operator.
///
/// ## Example
///
/// ```rust
/// use telemetra::spatial::GeoPoint;
///
/// let turin = GeoPoint::new(45.0703, 7.6869).unwrap();
/// let milan = GeoPoint::new(45.4642, 9.19).unwrap();
/// assert!((turin.distance_meters(&milan) / 1000.0 - 125.0).abs() < 5.0);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "RawGeoPoint", into = "RawGeoPoint")]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

#[derive(Serialize, Deserialize)]
struct RawGeoPoint {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawGeoPoint> for GeoPoint {
    type Error = TelemetraError;

    fn try_from(raw: RawGeoPoint) -> Result<Self, Self::Error> {
        GeoPoint::new(raw.lat, raw.lng)
    }
}

impl From<GeoPoint> for RawGeoPoint {
    fn from(point: GeoPoint) -> Self {
        RawGeoPoint {
            lat: point.latitude,
            lng: point.longitude,
        }
    }
}

impl GeoPoint {
    /// Creates a new point from latitude and longitude in degrees.
    ///
    /// # Errors
    /// Returns [`ErrorKind::TypeError`] if a coordinate is out of range or not finite.
    pub fn new(latitude: f64, longitude: f64) -> TelemetraResult<Self> {
        Self::validate_coordinates(latitude, longitude)?;
        Ok(GeoPoint {
            latitude,
            longitude,
        })
    }

    fn validate_coordinates(latitude: f64, longitude: f64) -> TelemetraResult<()> {
        if !(-90.0..=90.0).contains(&latitude) {
            log::error!("Latitude {} is out of range", latitude);
            return Err(TelemetraError::new(
                &format!("Latitude must be between -90 and 90 degrees, got: {}", latitude),
                ErrorKind::TypeError,
            ));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            log::error!("Longitude {} is out of range", longitude);
            return Err(TelemetraError::new(
                &format!("Longitude must be between -180 and 180 degrees, got: {}", longitude),
                ErrorKind::TypeError,
            ));
        }
        Ok(())
    }

    /// Gets the latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Gets the longitude in degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance to another point, in degrees of arc.
    pub fn angular_distance_degrees(&self, other: &GeoPoint) -> f64 {
        central_angle(self.latitude, self.longitude, other.latitude, other.longitude).to_degrees()
    }

    /// Great-circle distance to another point, in meters.
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        central_angle(self.latitude, self.longitude, other.latitude, other.longitude)
            * EARTH_RADIUS_KM
            * 1000.0
    }
}

impl PartialEq for GeoPoint {
    fn eq(&self, other: &Self) -> bool {
        self.latitude == other.latitude && self.longitude == other.longitude
    }
}

impl Eq for GeoPoint {}

impl Hash for GeoPoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // +0.0 and -0.0 compare equal, so they must hash equal
        (self.latitude + 0.0).to_bits().hash(state);
        (self.longitude + 0.0).to_bits().hash(state);
    }
}

impl Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(lat={}, lng={})", self.latitude, self.longitude)
    }
}

/// Order of the two numbers in a raw `[a, b]` coordinate pair.
///
/// `XY` is `[longitude, latitude]` (GeoJSON order), `YX` is
/// `[latitude, longitude]`. Once a [`GeoPoint`] is built the order no longer
/// matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinateOrder {
    #[default]
    XY,
    YX,
}

impl CoordinateOrder {
    /// Builds a point from a raw pair read in this order.
    pub fn to_point(self, pair: [f64; 2]) -> TelemetraResult<GeoPoint> {
        match self {
            CoordinateOrder::XY => GeoPoint::new(pair[1], pair[0]),
            CoordinateOrder::YX => GeoPoint::new(pair[0], pair[1]),
        }
    }

    /// Writes a point as a raw pair in this order.
    pub fn to_pair(self, point: &GeoPoint) -> [f64; 2] {
        match self {
            CoordinateOrder::XY => [point.longitude(), point.latitude()],
            CoordinateOrder::YX => [point.latitude(), point.longitude()],
        }
    }
}

/// Central angle between two points in radians (haversine formula).
fn central_angle(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    2.0 * a.sqrt().min(1.0).asin()
}

/// Converts a distance in meters to degrees of arc on a spherical Earth.
#[inline]
pub fn meters_to_degrees(meters: f64) -> f64 {
    meters / (1000.0 * KM_PER_DEGREE)
}

/// Checks whether `point` lies within `radius_meters` of `center`.
///
/// The radius is converted to degrees of arc and compared against the
/// great-circle distance, so a zero radius only matches the exact center.
pub fn within_circle(point: &GeoPoint, center: &GeoPoint, radius_meters: f64) -> bool {
    center.angular_distance_degrees(point) <= meters_to_degrees(radius_meters)
}

/// Checks whether `point` lies inside or on the boundary of the polygon.
///
/// Vertices are taken in order and the ring is closed implicitly. Points on
/// an edge or vertex count as inside; the interior is decided by ray casting
/// with longitude as x and latitude as y.
pub fn within_polygon(point: &GeoPoint, vertices: &[GeoPoint]) -> bool {
    if vertices.len() < 3 {
        return false;
    }

    let (px, py) = (point.longitude(), point.latitude());
    let n = vertices.len();

    for i in 0..n {
        let a = &vertices[i];
        let b = &vertices[(i + 1) % n];
        if on_segment(px, py, a.longitude(), a.latitude(), b.longitude(), b.latitude()) {
            return true;
        }
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (vertices[i].longitude(), vertices[i].latitude());
        let (xj, yj) = (vertices[j].longitude(), vertices[j].latitude());

        if ((yi > py) != (yj > py)) && (px < (xj - xi) * (py - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }

    inside
}

fn on_segment(px: f64, py: f64, ax: f64, ay: f64, bx: f64, by: f64) -> bool {
    let cross = (bx - ax) * (py - ay) - (by - ay) * (px - ax);
    let scale = (bx - ax).abs().max((by - ay).abs()).max(1.0);
    if cross.abs() > EDGE_EPSILON * scale {
        return false;
    }
    px >= ax.min(bx) - EDGE_EPSILON
        && px <= ax.max(bx) + EDGE_EPSILON
        && py >= ay.min(by) - EDGE_EPSILON
        && py <= ay.max(by) + EDGE_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(0.0, 0.0).unwrap(),
            GeoPoint::new(0.0, 10.0).unwrap(),
            GeoPoint::new(10.0, 10.0).unwrap(),
            GeoPoint::new(10.0, 0.0).unwrap(),
        ]
    }

    #[test]
    fn test_accessors_keep_constructor_order() {
        let station = GeoPoint::new(-33.87, 151.21).unwrap();
        assert_eq!((station.latitude(), station.longitude()), (-33.87, 151.21));
    }

    #[test]
    fn test_latitude_out_of_range() {
        let err = GeoPoint::new(91.0, 0.0).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::TypeError);
    }

    #[test]
    fn test_longitude_out_of_range_or_nan() {
        assert!(GeoPoint::new(0.0, 181.0).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_geopoint_serde_shape() {
        let gp = GeoPoint::new(1.5, 2.5).unwrap();
        let json = serde_json::to_value(gp).unwrap();
        assert_eq!(json, serde_json::json!({"lat": 1.5, "lng": 2.5}));

        let back: GeoPoint = serde_json::from_value(json).unwrap();
        assert_eq!(back, gp);

        let bad = serde_json::from_value::<GeoPoint>(serde_json::json!({"lat": 95.0, "lng": 0.0}));
        assert!(bad.is_err());
    }

    #[test]
    fn test_distance_turin_milan() {
        let turin = GeoPoint::new(45.0703, 7.6869).unwrap();
        let milan = GeoPoint::new(45.4642, 9.19).unwrap();
        let meters = turin.distance_meters(&milan);
        assert!(meters > 120_000.0 && meters < 130_000.0);
        assert!((meters - milan.distance_meters(&turin)).abs() < 1e-6);
    }

    #[test]
    fn test_one_degree_of_arc() {
        let one_degree = 1000.0 * KM_PER_DEGREE;
        assert!((meters_to_degrees(one_degree) - 1.0).abs() < 1e-12);
        assert!((KM_PER_DEGREE - 111.195).abs() < 0.001);
    }

    #[test]
    fn test_zero_radius_matches_only_center() {
        let center = GeoPoint::new(0.0, 0.0).unwrap();
        assert!(within_circle(&center, &center, 0.0));
        let near = GeoPoint::new(0.000001, 0.0).unwrap();
        assert!(!within_circle(&near, &center, 0.0));
    }

    #[test]
    fn test_circle_boundary() {
        let center = GeoPoint::new(0.0, 0.0).unwrap();
        let radius = 1_000.0;
        let inside = GeoPoint::new(meters_to_degrees(radius - 1.0), 0.0).unwrap();
        let outside = GeoPoint::new(meters_to_degrees(radius + 1.0), 0.0).unwrap();
        assert!(within_circle(&inside, &center, radius));
        assert!(!within_circle(&outside, &center, radius));
    }

    #[test]
    fn test_ray_casting_inside_and_outside() {
        let polygon = square();
        assert!(within_polygon(&GeoPoint::new(5.0, 5.0).unwrap(), &polygon));
        assert!(!within_polygon(&GeoPoint::new(5.0, 15.0).unwrap(), &polygon));
    }

    #[test]
    fn test_point_on_polygon_boundary() {
        let polygon = square();
        // edge
        assert!(within_polygon(&GeoPoint::new(0.0, 5.0).unwrap(), &polygon));
        assert!(within_polygon(&GeoPoint::new(10.0, 5.0).unwrap(), &polygon));
        // vertex
        assert!(within_polygon(&GeoPoint::new(10.0, 10.0).unwrap(), &polygon));
    }

    #[test]
    fn test_degenerate_polygon() {
        let line = vec![GeoPoint::new(0.0, 0.0).unwrap(), GeoPoint::new(1.0, 1.0).unwrap()];
        assert!(!within_polygon(&GeoPoint::new(0.5, 0.5).unwrap(), &line));
    }

    #[test]
    fn test_coordinate_order() {
        let point = CoordinateOrder::XY.to_point([10.0, 20.0]).unwrap();
        assert_eq!(point.longitude(), 10.0);
        assert_eq!(point.latitude(), 20.0);
        assert_eq!(CoordinateOrder::YX.to_pair(&point), [20.0, 10.0]);

        let point = CoordinateOrder::YX.to_point([10.0, 20.0]).unwrap();
        assert_eq!(point.latitude(), 10.0);
        assert_eq!(CoordinateOrder::XY.to_pair(&point), [20.0, 10.0]);
    }
}
