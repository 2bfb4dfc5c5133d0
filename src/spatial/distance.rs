//! Great-circle helpers over [`Location`].
//!
//! Thin adapters around `geo`'s haversine implementations so the rest of the
//! crate works in `Location` and metres.

use geo::{Bearing, Centroid, Destination, Distance, Haversine, MultiPoint, Point};

use crate::types::Location;

/// Metres per degree of latitude (and of longitude at the equator).
const METRES_PER_DEGREE: f64 = 111_320.0;

/// Convert to a `geo` point (x = longitude, y = latitude).
pub fn to_point(location: &Location) -> Point<f64> {
    Point::new(location.lng, location.lat)
}

fn from_point(point: Point<f64>) -> Location {
    Location::new(point.y(), point.x())
}

/// Haversine distance in metres.
pub fn haversine_m(a: &Location, b: &Location) -> f64 {
    Haversine::distance(to_point(a), to_point(b))
}

/// Initial bearing from `from` to `to`, in degrees clockwise from north.
pub fn bearing_deg(from: &Location, to: &Location) -> f64 {
    Haversine::bearing(to_point(from), to_point(to))
}

/// Point reached travelling `distance_m` from `origin` along `bearing`.
/// The origin's tag is carried over.
pub fn destination(origin: &Location, bearing: f64, distance_m: f64) -> Location {
    let mut reached = from_point(Haversine::destination(to_point(origin), bearing, distance_m));
    reached.tag = origin.tag.clone();
    reached
}

/// Arithmetic centroid of a set of locations; `None` when empty.
pub fn centroid(locations: &[Location]) -> Option<Location> {
    let points: Vec<Point<f64>> = locations.iter().map(to_point).collect();
    MultiPoint::from(points).centroid().map(from_point)
}

/// Degrees of (latitude, longitude) spanned by `metres` at latitude `lat`.
///
/// Longitude degrees grow towards the poles; the cosine is floored so the
/// result stays finite, and capped at a half turn.
pub fn metres_to_degrees(metres: f64, lat: f64) -> (f64, f64) {
    let dlat = metres / METRES_PER_DEGREE;
    let cos_lat = lat.to_radians().cos().abs().max(1e-6);
    let dlng = (metres / (METRES_PER_DEGREE * cos_lat)).min(180.0);
    (dlat, dlng)
}

/// Shift a location by local north/east offsets in metres.
pub fn offset_m(location: &Location, north_m: f64, east_m: f64) -> Location {
    let (dlat, _) = metres_to_degrees(north_m, location.lat);
    let (_, dlng) = metres_to_degrees(east_m, location.lat);
    Location {
        lat: (location.lat + dlat).clamp(-90.0, 90.0),
        lng: location.lng + dlng,
        tag: location.tag.clone(),
    }
}
