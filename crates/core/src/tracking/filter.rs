//! Sample filter: great-circle distance between two samples.

use waypoint_domain::constants::EARTH_RADIUS_METERS;
use waypoint_domain::Coordinate;

/// Haversine distance in meters on a spherical Earth.
///
/// # Example
///
/// ```
/// use waypoint_core::haversine_distance;
/// use waypoint_domain::Coordinate;
///
/// let a = Coordinate::new(0.0, 0.0);
/// let b = Coordinate::new(0.0, 1.0);
/// // One degree of longitude on the equator is ~111.19 km
/// assert!((haversine_distance(&a, &b) - 111_195.0).abs() < 1.0);
/// ```
pub fn haversine_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let delta_phi = (b.latitude - a.latitude).to_radians();
    let delta_lambda = (b.longitude - a.longitude).to_radians();

    let h = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    // Rounding can push h a hair outside [0, 1] for near-antipodal points
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_METERS * h.sqrt().atan2((1.0 - h).sqrt())
}
