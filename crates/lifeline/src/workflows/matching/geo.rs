use crate::workflows::registry::domain::Coordinates;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres (haversine).
///
/// Inputs are degrees and are not range checked; callers own validation.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let origin = Origin::new(a);
    origin.distance_to(b)
}

/// Distances from one reference point to each of `points`, in input order.
pub fn distances_from<I>(reference: Coordinates, points: I) -> Vec<f64>
where
    I: IntoIterator<Item = Coordinates>,
{
    let origin = Origin::new(reference);
    points
        .into_iter()
        .map(|point| origin.distance_to(point))
        .collect()
}

/// Reference point with its trigonometry computed once for batch use.
#[derive(Debug, Clone, Copy)]
struct Origin {
    lat_rad: f64,
    lon_rad: f64,
    cos_lat: f64,
}

impl Origin {
    fn new(point: Coordinates) -> Self {
        let lat_rad = point.latitude.to_radians();
        Self {
            lat_rad,
            lon_rad: point.longitude.to_radians(),
            cos_lat: lat_rad.cos(),
        }
    }

    fn distance_to(&self, point: Coordinates) -> f64 {
        let lat_rad = point.latitude.to_radians();
        let d_lat = lat_rad - self.lat_rad;
        let d_lon = point.longitude.to_radians() - self.lon_rad;

        let a = (d_lat / 2.0).sin().powi(2)
            + self.cos_lat * lat_rad.cos() * (d_lon / 2.0).sin().powi(2);
        // Rounding can push `a` fractionally above 1 for antipodal points.
        let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();
        EARTH_RADIUS_KM * c
    }
}
