// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Validated plan polygons.

use crate::error::{Error, Result};
use nalgebra::{Point2, Vector2};

/// Coincidence threshold for polygon construction checks.
const EPSILON_2D: f64 = 1e-9;

/// Closed, simple, counter-clockwise polygon in the plan frame.
///
/// Construction rejects fewer than three vertices, repeated consecutive
/// vertices, self-intersections and zero area. Clockwise input is reversed.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    points: Vec<Point2<f64>>,
}

impl Polygon {
    /// Build a polygon, normalising it to counter-clockwise order.
    pub fn new(name: &str, points: Vec<Point2<f64>>) -> Result<Self> {
        if points.len() < 3 {
            return Err(Error::topology(
                name,
                format!("polygon needs at least 3 vertices, got {}", points.len()),
            ));
        }

        let n = points.len();
        for i in 0..n {
            if (points[(i + 1) % n] - points[i]).norm() <= EPSILON_2D {
                return Err(Error::topology(
                    name,
                    format!("vertices {} and {} coincide", i, (i + 1) % n),
                ));
            }
        }

        let area = signed_area(&points);
        if area.abs() <= EPSILON_2D {
            return Err(Error::topology(name, "polygon has zero area"));
        }

        if let Some((i, j)) = find_self_intersection(&points) {
            return Err(Error::topology(
                name,
                format!("edges {} and {} intersect", i, j),
            ));
        }

        let points = if area < 0.0 {
            points.into_iter().rev().collect()
        } else {
            points
        };
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Edge `i` runs from vertex `i` to vertex `i + 1`.
    pub fn edge(&self, i: usize) -> Option<(Point2<f64>, Point2<f64>)> {
        if i >= self.points.len() {
            return None;
        }
        Some((self.points[i], self.points[(i + 1) % self.points.len()]))
    }

    pub fn edge_length(&self, i: usize) -> Option<f64> {
        self.edge(i).map(|(a, b)| (b - a).norm())
    }

    /// Unit normal of edge `i` pointing away from the interior.
    pub fn edge_outward_normal(&self, i: usize) -> Option<Vector2<f64>> {
        self.edge(i).map(|(a, b)| {
            let d = (b - a).normalize();
            Vector2::new(d.y, -d.x)
        })
    }

    pub fn area(&self) -> f64 {
        signed_area(&self.points)
    }

    /// Area-weighted centroid.
    pub fn centroid(&self) -> Point2<f64> {
        let n = self.points.len();
        let mut cx = 0.0;
        let mut cy = 0.0;
        let mut a = 0.0;
        for i in 0..n {
            let p = &self.points[i];
            let q = &self.points[(i + 1) % n];
            let cross = p.x * q.y - q.x * p.y;
            a += cross;
            cx += (p.x + q.x) * cross;
            cy += (p.y + q.y) * cross;
        }
        let a = a * 0.5;
        Point2::new(cx / (6.0 * a), cy / (6.0 * a))
    }

    /// Even-odd containment test; points on the boundary may go either way.
    pub fn contains(&self, point: &Point2<f64>) -> bool {
        point_in_ring(point, &self.points)
    }

    /// Whether `point` is inside or within `tolerance` of the boundary.
    pub fn covers(&self, point: &Point2<f64>, tolerance: f64) -> bool {
        if self.contains(point) {
            return true;
        }
        let n = self.points.len();
        (0..n).any(|i| {
            distance_to_segment(point, &self.points[i], &self.points[(i + 1) % n]) <= tolerance
        })
    }

    /// Index of the edge joining `a` and `b` in either direction.
    pub fn find_edge(&self, a: &Point2<f64>, b: &Point2<f64>, tolerance: f64) -> Option<usize> {
        let n = self.points.len();
        (0..n).find(|&i| {
            let p = &self.points[i];
            let q = &self.points[(i + 1) % n];
            ((p - a).norm() <= tolerance && (q - b).norm() <= tolerance)
                || ((p - b).norm() <= tolerance && (q - a).norm() <= tolerance)
        })
    }

    /// Copy scaled about `center` by `factor`.
    pub fn scaled(&self, name: &str, center: &Point2<f64>, factor: f64) -> Result<Self> {
        let points = self
            .points
            .iter()
            .map(|p| center + (p - center) * factor)
            .collect();
        Self::new(name, points)
    }
}

/// Shoelace area; positive for counter-clockwise rings.
pub fn signed_area(points: &[Point2<f64>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x * points[j].y;
        area -= points[j].x * points[i].y;
    }
    area * 0.5
}

/// Ray-casting containment test.
pub fn point_in_ring(point: &Point2<f64>, ring: &[Point2<f64>]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = &ring[i];
        let pj = &ring[j];
        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

pub fn distance_to_segment(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= f64::EPSILON {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

fn cross(o: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Proper or touching intersection of two closed segments.
fn segments_intersect(
    p1: &Point2<f64>,
    p2: &Point2<f64>,
    q1: &Point2<f64>,
    q2: &Point2<f64>,
) -> bool {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);

    if ((d1 > EPSILON_2D && d2 < -EPSILON_2D) || (d1 < -EPSILON_2D && d2 > EPSILON_2D))
        && ((d3 > EPSILON_2D && d4 < -EPSILON_2D) || (d3 < -EPSILON_2D && d4 > EPSILON_2D))
    {
        return true;
    }

    let on_segment = |a: &Point2<f64>, b: &Point2<f64>, p: &Point2<f64>| {
        distance_to_segment(p, a, b) <= EPSILON_2D
    };
    on_segment(q1, q2, p1) || on_segment(q1, q2, p2) || on_segment(p1, p2, q1) || on_segment(p1, p2, q2)
}

/// First pair of non-adjacent edges that touch or cross.
fn find_self_intersection(points: &[Point2<f64>]) -> Option<(usize, usize)> {
    let n = points.len();
    if n < 4 {
        return None;
    }
    for i in 0..n {
        let a1 = &points[i];
        let a2 = &points[(i + 1) % n];
        for j in (i + 2)..n {
            // First and last edge share vertex 0.
            if i == 0 && j == n - 1 {
                continue;
            }
            let b1 = &points[j];
            let b2 = &points[(j + 1) % n];
            if segments_intersect(a1, a2, b1, b2) {
                return Some((i, j));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(size: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(size, 0.0),
            Point2::new(size, size),
            Point2::new(0.0, size),
        ]
    }

    #[test]
    fn test_clockwise_input_is_reversed() {
        let mut points = square(2.0);
        points.reverse();
        let polygon = Polygon::new("square", points).unwrap();
        assert_relative_eq!(polygon.area(), 4.0);
    }

    #[test]
    fn test_rejects_degenerate_input() {
        assert!(Polygon::new("pair", vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)]).is_err());

        let collinear = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
        ];
        assert!(Polygon::new("line", collinear).is_err());

        let repeated = vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ];
        assert!(Polygon::new("repeated", repeated).is_err());
    }

    #[test]
    fn test_rejects_bow_tie() {
        let bow_tie = vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(2.0, 0.0),
            Point2::new(0.0, 2.0),
        ];
        let err = Polygon::new("bow_tie", bow_tie).unwrap_err();
        assert!(matches!(err, Error::Topology { .. }));
    }

    #[test]
    fn test_edges_and_normals() {
        let polygon = Polygon::new("square", square(2.0)).unwrap();
        assert_relative_eq!(polygon.edge_length(1).unwrap(), 2.0);
        assert!(polygon.edge(4).is_none());

        let n = polygon.edge_outward_normal(0).unwrap();
        assert_relative_eq!(n.y, -1.0);
        assert_relative_eq!(polygon.centroid().x, 1.0);
    }

    #[test]
    fn test_find_edge_either_direction() {
        let polygon = Polygon::new("square", square(2.0)).unwrap();
        let a = Point2::new(2.0, 2.0);
        let b = Point2::new(2.0, 0.0);
        assert_eq!(polygon.find_edge(&a, &b, 1e-9), Some(1));
        assert_eq!(polygon.find_edge(&b, &a, 1e-9), Some(1));
        assert_eq!(polygon.find_edge(&a, &Point2::new(0.0, 0.0), 1e-9), None);
    }

    #[test]
    fn test_covers_boundary() {
        let polygon = Polygon::new("square", square(2.0)).unwrap();
        assert!(polygon.covers(&Point2::new(2.0, 1.0), 1e-9));
        assert!(!polygon.covers(&Point2::new(2.1, 1.0), 1e-9));
    }
}
