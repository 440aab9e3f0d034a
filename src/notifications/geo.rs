use crate::donations::Coordinates;

/// Equatorial radius used by the mobile client's distance display.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Great-circle distance in meters.
pub fn haversine_m(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Kilometers with two decimals, e.g. `"3.42"`.
pub fn format_km(meters: f64) -> String {
    format!("{:.2}", meters / 1000.0)
}

pub fn maps_directions_url(to: Coordinates) -> String {
    format!(
        "https://www.google.com/maps/dir/?api=1&destination={},{}",
        to.latitude, to.longitude
    )
}
