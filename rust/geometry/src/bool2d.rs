// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D Boolean Operations for Footprint Overlap Measurement
//!
//! Thin wrappers around the i_overlay crate. Footprints are converted to
//! i_overlay paths, combined with a single overlay call, and the result is
//! reduced to a net area. No footprint is ever rebuilt from overlay output:
//! the callers only need to know how much two regions overlap. Cutting a
//! ring by a straight line is exact and stays out of i_overlay.

use crate::footprint::Footprint;
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use nalgebra::{Point2, Vector2};

/// Area of the region covered by both footprints.
pub fn intersection_area(a: &Footprint, b: &Footprint) -> f64 {
    if a.outer.len() < 3 || b.outer.len() < 3 {
        return 0.0;
    }

    let (a_min, a_max) = a.bounds();
    let (b_min, b_max) = b.bounds();
    if !bounds_overlap(&a_min, &a_max, &b_min, &b_max) {
        return 0.0;
    }

    let subject = footprint_to_paths(a);
    let clip = footprint_to_paths(b);

    // Result is Vec<Vec<Vec<[f64; 2]>>> - Vec of shapes, each shape is Vec of contours
    let result = subject.overlay(&clip, OverlayRule::Intersect, FillRule::EvenOdd);
    shapes_area(&result)
}

/// Part of `ring` on the left of the line through `origin` along
/// `direction`.
///
/// The cut follows the ring edge by edge, so the result of a non-convex
/// ring may carry zero-width bridges; its signed area is still exact.
pub fn clip_half_plane(
    ring: &[Point2<f64>],
    origin: &Point2<f64>,
    direction: &Vector2<f64>,
) -> Vec<Point2<f64>> {
    let side = |p: &Point2<f64>| direction.perp(&(p - origin));
    let mut clipped = Vec::with_capacity(ring.len() + 2);
    for (i, p) in ring.iter().enumerate() {
        let q = &ring[(i + 1) % ring.len()];
        let (dp, dq) = (side(p), side(q));
        if dp >= 0.0 {
            clipped.push(*p);
        }
        if (dp >= 0.0) != (dq >= 0.0) {
            clipped.push(p + (q - p) * (dp / (dp - dq)));
        }
    }
    clipped
}

/// Compute the signed area of a 2D contour
/// Positive = counter-clockwise, Negative = clockwise
pub fn compute_signed_area(contour: &[Point2<f64>]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    let n = contour.len();

    for i in 0..n {
        let j = (i + 1) % n;
        area += contour[i].x * contour[j].y;
        area -= contour[j].x * contour[i].y;
    }

    area * 0.5
}

/// Ensure contour has counter-clockwise winding (positive area)
pub fn ensure_ccw(contour: &[Point2<f64>]) -> Vec<Point2<f64>> {
    if compute_signed_area(contour) < 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

/// Ensure contour has clockwise winding (for holes)
pub fn ensure_cw(contour: &[Point2<f64>]) -> Vec<Point2<f64>> {
    if compute_signed_area(contour) > 0.0 {
        contour.iter().rev().cloned().collect()
    } else {
        contour.to_vec()
    }
}

/// Check if two bounding boxes overlap
fn bounds_overlap(
    a_min: &Point2<f64>,
    a_max: &Point2<f64>,
    b_min: &Point2<f64>,
    b_max: &Point2<f64>,
) -> bool {
    a_min.x <= b_max.x && a_max.x >= b_min.x && a_min.y <= b_max.y && a_max.y >= b_min.y
}

// ============================================================================
// Internal Helper Functions
// ============================================================================

/// Convert a footprint to i_overlay path format
fn footprint_to_paths(footprint: &Footprint) -> Vec<Vec<[f64; 2]>> {
    let mut paths = Vec::with_capacity(1 + footprint.holes.len());

    paths.push(contour_to_path(&ensure_ccw(&footprint.outer)));

    for hole in &footprint.holes {
        paths.push(contour_to_path(&ensure_cw(hole)));
    }

    paths
}

/// Convert a Point2 contour to i_overlay path format
fn contour_to_path(contour: &[Point2<f64>]) -> Vec<[f64; 2]> {
    contour.iter().map(|p| [p.x, p.y]).collect()
}

/// Net area of i_overlay result shapes.
///
/// Each shape lists its outer contour first and its holes after.
fn shapes_area(shapes: &[Vec<Vec<[f64; 2]>>]) -> f64 {
    shapes
        .iter()
        .map(|shape| {
            shape
                .iter()
                .enumerate()
                .map(|(i, contour)| {
                    let points: Vec<Point2<f64>> =
                        contour.iter().map(|p| Point2::new(p[0], p[1])).collect();
                    let area = compute_signed_area(&points).abs();
                    if i == 0 {
                        area
                    } else {
                        -area
                    }
                })
                .sum::<f64>()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(min: f64, max: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(min, min),
            Point2::new(max, min),
            Point2::new(max, max),
            Point2::new(min, max),
        ]
    }

    #[test]
    fn test_compute_signed_area_orientation() {
        let ccw = square(0.0, 1.0);
        assert_relative_eq!(compute_signed_area(&ccw), 1.0);
        let cw: Vec<_> = ccw.iter().rev().cloned().collect();
        assert_relative_eq!(compute_signed_area(&cw), -1.0);
        assert!(compute_signed_area(&ensure_ccw(&cw)) > 0.0);
        assert!(compute_signed_area(&ensure_cw(&ccw)) < 0.0);
    }

    #[test]
    fn test_intersection_area_partial_overlap() {
        let a = Footprint::new(square(0.0, 2.0), Vec::new());
        let b = Footprint::new(square(1.0, 3.0), Vec::new());
        assert_relative_eq!(intersection_area(&a, &b), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_touching_footprints_do_not_overlap() {
        let a = Footprint::new(square(0.0, 1.0), Vec::new());
        let b = Footprint::new(
            vec![
                Point2::new(1.0, 0.0),
                Point2::new(2.0, 0.0),
                Point2::new(2.0, 1.0),
                Point2::new(1.0, 1.0),
            ],
            Vec::new(),
        );
        assert!(intersection_area(&a, &b) < 1e-9);
    }

    #[test]
    fn test_hole_excluded_from_intersection() {
        let ring = Footprint::new(square(0.0, 10.0), vec![square(2.0, 8.0)]);
        let inner = Footprint::new(square(3.0, 7.0), Vec::new());
        assert!(intersection_area(&ring, &inner) < 1e-9);
    }

    #[test]
    fn test_disjoint_bounds_skip_overlay() {
        let a = Footprint::new(square(0.0, 10.0), Vec::new());
        let b = Footprint::new(square(5.0, 15.0), Vec::new());
        let c = Footprint::new(square(20.0, 30.0), Vec::new());
        let ((a_min, a_max), (b_min, b_max)) = (a.bounds(), b.bounds());
        let (c_min, c_max) = c.bounds();
        assert!(bounds_overlap(&a_min, &a_max, &b_min, &b_max));
        assert!(!bounds_overlap(&a_min, &a_max, &c_min, &c_max));
        assert_eq!(intersection_area(&a, &c), 0.0);
    }

    #[test]
    fn test_clip_half_plane_halves_square() {
        let square = vec![
            Point2::new(-1.0, -1.0),
            Point2::new(1.0, -1.0),
            Point2::new(1.0, 1.0),
            Point2::new(-1.0, 1.0),
        ];
        let upper = clip_half_plane(&square, &Point2::origin(), &Vector2::x());
        assert_eq!(compute_signed_area(&upper), 2.0);
        assert!(upper.iter().all(|p| p.y >= 0.0));

        let diagonal = clip_half_plane(&square, &Point2::origin(), &Vector2::new(1.0, 1.0));
        assert!((compute_signed_area(&diagonal) - 2.0).abs() < 1e-12);
        assert!(clip_half_plane(&square, &Point2::new(0.0, 5.0), &Vector2::x()).is_empty());
    }
}
