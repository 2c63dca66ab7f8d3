use crate::types::Geometry;
use geo::{Area, Centroid, ConvexHull, Coord, HaversineDistance, LineString, MapCoords, MultiPoint, Point, Polygon};

/// WGS84 semi-major axis, also the sphere radius of Web Mercator (meters)
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude limit of the Web Mercator square (degrees)
const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// Convert degrees/minutes/seconds plus hemisphere reference to signed decimal degrees.
/// South and West references give negative values.
pub fn dms_to_decimal(dms: [f64; 3], reference: &str) -> f64 {
    let decimal = dms[0] + dms[1] / 60.0 + dms[2] / 3600.0;
    match reference.trim() {
        "S" | "W" | "s" | "w" => -decimal,
        _ => decimal,
    }
}

/// Forward spherical Web Mercator (EPSG:3857), returns (x, y) in meters
pub fn web_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT);
    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Great-circle distance in meters
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    Point::new(lon1, lat1).haversine_distance(&Point::new(lon2, lat2))
}

/// Planar area (m²) covered by a set of (lon, lat) locations: the convex hull is taken
/// in geographic coordinates and its vertices projected to Web Mercator.
/// `None` when there is no location at all.
pub fn covered_area(lon_lat: &[(f64, f64)]) -> Option<f64> {
    let finite: Vec<(f64, f64)> = lon_lat
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if finite.is_empty() {
        return None;
    }
    let hull: Polygon<f64> = MultiPoint::from(finite).convex_hull();
    let projected = hull.map_coords(|Coord { x, y }| {
        let (x, y) = web_mercator(x, y);
        Coord { x, y }
    });
    Some(projected.unsigned_area())
}

/// Representative (lon, lat) of a geometry: length-weighted for paths,
/// area-weighted for polygons, with degenerate shapes reduced a dimension
pub fn centroid(geometry: &Geometry) -> Option<(f64, f64)> {
    let point = match geometry {
        Geometry::Point(p) => return Some((p.lon, p.lat)),
        Geometry::Path(_) => LineString::from(geometry.lon_lat()).centroid(),
        Geometry::Polygon(_) => Polygon::new(LineString::from(geometry.lon_lat()), vec![]).centroid(),
    };
    point.map(|p| p.x_y())
}
