//! Coordinates and distances on the WGS-84 ellipsoid.

use anyhow::Error;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Semi-major axis of the WGS-84 ellipsoid, in meters.
const WGS84_A: f64 = 6_378_137.0;
/// Flattening of the WGS-84 ellipsoid.
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// Semi-minor axis of the WGS-84 ellipsoid, in meters.
const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);
/// Mean radius of the Earth, in kilometers.
const MEAN_EARTH_RADIUS_KM: f64 = 6371.0088;

const VINCENTY_MAX_ITERATIONS: usize = 200;
const VINCENTY_TOLERANCE: f64 = 1e-12;

/// A latitude/longitude pair, in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Check that this is a usable point.
    ///
    /// The poles themselves are rejected: a grid cannot be laid out around them, since a degree
    /// of longitude has no width there.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(Error::msg(format!("coordinates {self} are not finite")));
        }
        if self.lat <= -90.0 || self.lat >= 90.0 {
            return Err(Error::msg(format!("latitude {} is out of range", self.lat)));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(Error::msg(format!("longitude {} is out of range", self.lng)));
        }
        Ok(())
    }
}

impl Display for LatLng {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

impl From<(f64, f64)> for LatLng {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

/// The geodesic distance between two points, in kilometers.
///
/// This is the length of the shortest path between the points on the WGS-84 ellipsoid, computed
/// with Vincenty's inverse formula. For nearly antipodal points, where that iteration does not
/// converge, it falls back to the great-circle distance on a sphere of the mean Earth radius.
pub fn distance_km(a: LatLng, b: LatLng) -> f64 {
    match vincenty_m(a, b) {
        Some(meters) => meters / 1000.0,
        None => {
            tracing::debug!(%a, %b, "Vincenty did not converge, using haversine distance");
            haversine_km(a, b)
        }
    }
}

fn vincenty_m(p1: LatLng, p2: LatLng) -> Option<f64> {
    let l = (p2.lng - p1.lng).to_radians();
    let u1 = ((1.0 - WGS84_F) * p1.lat.to_radians().tan()).atan();
    let u2 = ((1.0 - WGS84_F) * p2.lat.to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    for _ in 0..VINCENTY_MAX_ITERATIONS {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        if sin_sigma == 0.0 {
            // Coincident points.
            return Some(0.0);
        }
        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        // Both points on the equator.
        let cos_2sigma_m = if cos_sq_alpha == 0.0 {
            0.0
        } else {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        };
        let c = WGS84_F / 16.0 * cos_sq_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos_sq_alpha));

        let prev = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))));

        if (lambda - prev).abs() < VINCENTY_TOLERANCE {
            let u_sq = cos_sq_alpha * (WGS84_A.powi(2) - WGS84_B.powi(2)) / WGS84_B.powi(2);
            let big_a =
                1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
            let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
            let delta_sigma = big_b
                * sin_sigma
                * (cos_2sigma_m
                    + big_b / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))
                            - big_b / 6.0
                                * cos_2sigma_m
                                * (-3.0 + 4.0 * sin_sigma.powi(2))
                                * (-3.0 + 4.0 * cos_2sigma_m.powi(2))));
            return Some(WGS84_B * big_a * (sigma - delta_sigma));
        }
    }

    None
}

fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * MEAN_EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod test {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected} ± {tolerance}, got {actual}"
        );
    }

    #[test]
    fn test_zero_distance() {
        let p = LatLng::new(37.422, -122.0841);
        assert_eq!(distance_km(p, p), 0.0);
    }

    #[test]
    fn test_equator_degrees() {
        // One degree of longitude along the equator, and one degree of latitude starting there.
        let origin = LatLng::new(0.0, 0.0);
        assert_close(distance_km(origin, LatLng::new(0.0, 1.0)), 111.319_491, 1e-3);
        assert_close(distance_km(origin, LatLng::new(1.0, 0.0)), 110.574_389, 1e-3);
    }

    #[test]
    fn test_long_distance() {
        // Flinders Peak to Buninyong, the classic Vincenty test case.
        let flinders = LatLng::new(-37.951_033_416_666_67, 144.424_867_888_888_9);
        let buninyong = LatLng::new(-37.652_821_138_888_89, 143.926_495_527_777_8);
        assert_close(distance_km(flinders, buninyong), 54.972_271, 1e-3);
    }

    #[test]
    fn test_symmetric() {
        let a = LatLng::new(40.7128, -74.0060);
        let b = LatLng::new(51.5074, -0.1278);
        assert_close(distance_km(a, b), distance_km(b, a), 1e-9);
        assert_close(distance_km(a, b), 5585.0, 10.0);
    }

    #[test]
    fn test_nearly_antipodal() {
        let d = distance_km(LatLng::new(0.0, 0.0), LatLng::new(0.5, 179.7));
        assert!(d.is_finite());
        assert_close(d, 20_000.0, 100.0);
    }

    #[test]
    fn test_validate() {
        LatLng::new(37.4, -122.1).validate().unwrap();
        LatLng::new(-89.9, 180.0).validate().unwrap();
        LatLng::new(90.0, 0.0).validate().unwrap_err();
        LatLng::new(0.0, 180.5).validate().unwrap_err();
        LatLng::new(f64::NAN, 0.0).validate().unwrap_err();
    }
}
