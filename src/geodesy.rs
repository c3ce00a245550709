//! Great-circle distance and planar polygon area over lat/lng paths.
//!
//! Inputs are not range-checked. Out-of-range coordinates produce defined
//! but meaningless numbers.

use geo::{Area, Coord, LineString, Polygon};

use crate::types::LocationPoint;

/// Mean Earth radius used for distances (km)
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Earth radius used for the area projection (m)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two points in kilometers
pub fn distance(p1: &LocationPoint, p2: &LocationPoint) -> f64 {
    let d_lat = (p2.lat - p1.lat).to_radians();
    let d_lng = (p2.lng - p1.lng).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + p1.lat.to_radians().cos() * p2.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    EARTH_RADIUS_KM * c
}

/// Sum of leg distances along the path (km), 0 for fewer than 2 points
pub fn total_distance(path: &[LocationPoint]) -> f64 {
    path.windows(2).map(|leg| distance(&leg[0], &leg[1])).sum()
}

/// Equirectangular projection to meters
///
/// x = lng · R · cos(lat), y = lat · R, angles in radians, projected about
/// (0, 0) rather than the path start.
fn project(point: &LocationPoint) -> Coord<f64> {
    let lat = point.lat.to_radians();
    let lng = point.lng.to_radians();
    Coord {
        x: lng * EARTH_RADIUS_M * lat.cos(),
        y: lat * EARTH_RADIUS_M,
    }
}

/// Area enclosed by the path (m²)
///
/// The path is closed implicitly back to its first point, so an open
/// out-and-back trip measures the region between the path and that closing
/// segment. Fewer than 3 points yields 0.
pub fn area(path: &[LocationPoint]) -> f64 {
    if path.len() < 3 {
        return 0.0;
    }

    let ring: LineString<f64> = path.iter().map(project).collect::<Vec<_>>().into();
    // Polygon::new closes the exterior ring
    Polygon::new(ring, vec![]).unsigned_area()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pt(lat: f64, lng: f64) -> LocationPoint {
        LocationPoint::new(lat, lng, 0, None)
    }

    /// ~100 m square near the equator
    fn square() -> Vec<LocationPoint> {
        vec![
            pt(0.0, 0.0),
            pt(0.0, 0.0009),
            pt(0.0009, 0.0009),
            pt(0.0009, 0.0),
        ]
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = pt(52.5200, 13.4050);
        assert_eq!(distance(&p, &p), 0.0);
    }

    #[test]
    fn test_distance_known_value() {
        // One thousandth of a degree of longitude on the equator ≈ 111.19 m
        let d = distance(&pt(0.0, 0.0), &pt(0.0, 0.001));
        assert_relative_eq!(d, 0.111195, epsilon = 1e-5);

        // Paris → London ≈ 343.5 km
        let d = distance(&pt(48.8566, 2.3522), &pt(51.5074, -0.1278));
        assert!((d - 343.5).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn test_total_distance_short_paths() {
        assert_eq!(total_distance(&[]), 0.0);
        assert_eq!(total_distance(&[pt(10.0, 10.0)]), 0.0);
    }

    #[test]
    fn test_total_distance_reversal_symmetry() {
        let path = vec![
            pt(37.7749, -122.4194),
            pt(37.7755, -122.4180),
            pt(37.7770, -122.4172),
            pt(37.7791, -122.4150),
        ];
        let mut reversed = path.clone();
        reversed.reverse();

        assert_relative_eq!(
            total_distance(&path),
            total_distance(&reversed),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_total_distance_sums_legs() {
        let path = vec![pt(0.0, 0.0), pt(0.0, 0.001), pt(0.0, 0.002)];
        let expected = 2.0 * distance(&pt(0.0, 0.0), &pt(0.0, 0.001));
        assert_relative_eq!(total_distance(&path), expected, max_relative = 1e-12);
    }

    #[test]
    fn test_area_below_three_points() {
        assert_eq!(area(&[]), 0.0);
        assert_eq!(area(&[pt(1.0, 1.0)]), 0.0);
        assert_eq!(area(&[pt(1.0, 1.0), pt(1.001, 1.001)]), 0.0);
    }

    #[test]
    fn test_area_square() {
        // 0.0009° ≈ 100.08 m per side
        let side = 0.0009_f64.to_radians() * EARTH_RADIUS_M;
        let a = area(&square());
        assert_relative_eq!(a, side * side, max_relative = 1e-4);
    }

    #[test]
    fn test_area_orientation_independent() {
        let mut ccw = square();
        let cw = square();
        ccw.reverse();
        assert_relative_eq!(area(&ccw), area(&cw), max_relative = 1e-9);
        assert!(area(&ccw) > 0.0);
    }

    #[test]
    fn test_area_rotation_invariance() {
        let ring = vec![
            pt(45.0000, 7.0000),
            pt(45.0000, 7.0020),
            pt(45.0015, 7.0025),
            pt(45.0020, 7.0005),
        ];
        let base = area(&ring);

        for shift in 1..ring.len() {
            let mut rotated = ring.clone();
            rotated.rotate_left(shift);
            assert_relative_eq!(area(&rotated), base, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_area_explicitly_closed_path_matches_open() {
        let open = square();
        let mut closed = square();
        closed.push(open[0]);
        assert_relative_eq!(area(&closed), area(&open), max_relative = 1e-9);
    }

    #[test]
    fn test_area_collinear_path_is_zero() {
        let path = vec![pt(0.0, 0.0), pt(0.0, 0.001), pt(0.0, 0.002)];
        assert_relative_eq!(area(&path), 0.0, epsilon = 1e-6);
    }
}
