//! Sample grids laid out around a center point.

use crate::geo::{distance_km, LatLng};
use anyhow::Error;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Approximate length of one degree of latitude, in kilometers.
pub const KM_PER_DEGREE: f64 = 111.0;

/// The largest number of candidate points a single grid may contain.
pub const MAX_GRID_POINTS: usize = 10_000;

/// Slack for floating point error when counting how many steps fit across the grid.
const STEP_EPSILON: f64 = 1e-9;

/// The outline of a grid.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    EnumString,
    Deserialize,
    Serialize,
)]
#[strum(ascii_case_insensitive)]
pub enum Shape {
    /// Only points within the radius of the center.
    #[default]
    Circle,
    /// Every point of the bounding square.
    Square,
}

/// A single sample location in a grid.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct GridPoint {
    pub lat: f64,
    pub lng: f64,
    /// Geodesic distance from the center of the grid.
    pub dist_km: f64,
}

impl GridPoint {
    pub fn location(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Lay out a grid of points around `center`.
///
/// The grid spans `radius_km` in each direction from the center, with points roughly `step_km`
/// apart. Points are returned row by row, south to north, and west to east within each row.
pub fn generate(
    center: LatLng,
    radius_km: f64,
    step_km: f64,
    shape: Shape,
) -> Result<Vec<GridPoint>, Error> {
    center.validate()?;
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(Error::msg(format!("invalid grid radius {radius_km} km")));
    }
    if !step_km.is_finite() || step_km <= 0.0 {
        return Err(Error::msg(format!("invalid grid spacing {step_km} km")));
    }

    let lat_deg = radius_km / KM_PER_DEGREE;
    let lng_deg = radius_km / (KM_PER_DEGREE * center.lat.to_radians().cos());
    let step_deg = step_km / KM_PER_DEGREE;
    let rows = steps(2.0 * lat_deg / step_deg)?;
    let cols = steps(2.0 * lng_deg / step_deg)?;
    if rows.saturating_mul(cols) > MAX_GRID_POINTS {
        return Err(Error::msg(format!(
            "grid of {rows}x{cols} points is too large (at most {MAX_GRID_POINTS} points)"
        )));
    }
    tracing::debug!(rows, cols, %shape, "generating grid around {center}");

    let mut points = Vec::with_capacity(rows * cols);
    for i in 0..rows {
        let lat = offset(center.lat, lat_deg, i, rows);
        for j in 0..cols {
            let lng = offset(center.lng, lng_deg, j, cols);
            let dist_km = distance_km(center, LatLng::new(lat, lng));
            if shape == Shape::Circle && dist_km > radius_km {
                continue;
            }
            points.push(GridPoint { lat, lng, dist_km });
        }
    }
    Ok(points)
}

/// The number of points along one axis, given how many steps fit across it.
fn steps(span: f64) -> Result<usize, Error> {
    let n = (span + STEP_EPSILON).floor() + 1.0;
    if n > MAX_GRID_POINTS as f64 {
        return Err(Error::msg(format!(
            "grid is too large (at most {MAX_GRID_POINTS} points)"
        )));
    }
    Ok(n as usize)
}

/// The coordinate of point `index` out of `count` evenly spaced across `origin ± half_span`.
fn offset(origin: f64, half_span: f64, index: usize, count: usize) -> f64 {
    if count > 1 {
        origin - half_span + index as f64 * 2.0 * half_span / (count - 1) as f64
    } else {
        origin
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_square_grid() {
        let center = LatLng::new(0.0, 0.0);
        let points = generate(center, 1.0, 0.5, Shape::Square).unwrap();
        assert_eq!(points.len(), 25);

        // The middle point is the center itself.
        let middle = points[12];
        assert!(middle.lat.abs() < 1e-12 && middle.lng.abs() < 1e-12);
        assert_eq!(middle.dist_km, 0.0);

        // Rows run south to north, columns west to east.
        assert!(points[0].lat < points[5].lat);
        assert!(points[0].lng < points[1].lng);
        assert!((points[0].lat + 1.0 / KM_PER_DEGREE).abs() < 1e-12);
    }

    #[test]
    fn test_circle_grid() {
        let center = LatLng::new(37.422, -122.0841);
        let square = generate(center, 2.0, 0.5, Shape::Square).unwrap();
        let circle = generate(center, 2.0, 0.5, Shape::Circle).unwrap();
        assert!(circle.len() < square.len());
        assert!(circle.iter().all(|p| p.dist_km <= 2.0));
        assert!(circle.iter().all(|p| square.contains(p)));
        assert!(circle.iter().any(|p| p.dist_km < 1e-9));

        // Corners of the bounding square are always outside the circle.
        assert!(!circle.contains(&square[0]));
    }

    #[test]
    fn test_longitude_widens_with_latitude() {
        let equator = generate(LatLng::new(0.0, 10.0), 2.0, 0.5, Shape::Square).unwrap();
        let north = generate(LatLng::new(60.0, 10.0), 2.0, 0.5, Shape::Square).unwrap();
        // At 60 degrees a degree of longitude is half as wide, so twice as many columns fit.
        assert_eq!(equator.len(), 9 * 9);
        assert_eq!(north.len(), 9 * 17);
    }

    #[test]
    fn test_single_point() {
        let center = LatLng::new(10.0, 20.0);
        let points = generate(center, 0.5, 2.0, Shape::Circle).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].location(), center);
    }

    #[test]
    fn test_invalid_grids() {
        let center = LatLng::new(0.0, 0.0);
        generate(center, 0.0, 0.5, Shape::Circle).unwrap_err();
        generate(center, 1.0, -0.5, Shape::Circle).unwrap_err();
        generate(center, f64::INFINITY, 0.5, Shape::Square).unwrap_err();
        generate(LatLng::new(90.0, 0.0), 1.0, 0.5, Shape::Square).unwrap_err();
        generate(center, 100.0, 0.01, Shape::Square).unwrap_err();
    }

    #[test]
    fn test_parse_shape() {
        assert_eq!("circle".parse::<Shape>().unwrap(), Shape::Circle);
        assert_eq!("Square".parse::<Shape>().unwrap(), Shape::Square);
        assert_eq!(Shape::Circle.to_string(), "Circle");
        "triangle".parse::<Shape>().unwrap_err();
    }
}
