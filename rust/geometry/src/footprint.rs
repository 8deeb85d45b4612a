// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D footprints with holes and their triangulation

use crate::bool2d::{compute_signed_area, ensure_ccw, ensure_cw};
use crate::triangulation;
use hexmass_core::{Error, Polygon, Result};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Footprint of a volume: outer boundary plus holes.
///
/// Edges are numbered across rings: the outer ring first, then each hole in
/// order. Edge `i` of a ring runs from its vertex `i` to vertex `i + 1`, and
/// the solid always lies to the left of a directed edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    /// Outer boundary (counter-clockwise)
    pub outer: Vec<Point2<f64>>,
    /// Holes (clockwise)
    pub holes: Vec<Vec<Point2<f64>>>,
}

/// Triangulated footprint: flattened points (outer then holes) and indices.
#[derive(Debug, Clone)]
pub struct Triangulation {
    pub points: Vec<Point2<f64>>,
    pub indices: Vec<usize>,
}

impl Footprint {
    /// Create a footprint, normalising ring orientation.
    pub fn new(outer: Vec<Point2<f64>>, holes: Vec<Vec<Point2<f64>>>) -> Self {
        Self {
            outer: ensure_ccw(&outer),
            holes: holes.iter().map(|h| ensure_cw(h)).collect(),
        }
    }

    pub fn from_polygon(polygon: &Polygon) -> Self {
        Self::new(polygon.points().to_vec(), Vec::new())
    }

    /// Add a hole; the ring is reversed if needed.
    pub fn with_hole(mut self, hole: &Polygon) -> Self {
        self.holes.push(ensure_cw(hole.points()));
        self
    }

    pub fn rings(&self) -> impl Iterator<Item = &Vec<Point2<f64>>> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }

    pub fn edge_count(&self) -> usize {
        self.rings().map(|r| r.len()).sum()
    }

    /// Corner count equals edge count; corner `i` starts edge `i`.
    pub fn corner(&self, index: usize) -> Option<Point2<f64>> {
        let mut base = 0;
        for ring in self.rings() {
            if index < base + ring.len() {
                return Some(ring[index - base]);
            }
            base += ring.len();
        }
        None
    }

    pub fn set_corner(&mut self, index: usize, point: Point2<f64>) -> bool {
        let mut base = 0;
        let rings = std::iter::once(&mut self.outer).chain(self.holes.iter_mut());
        for ring in rings {
            if index < base + ring.len() {
                ring[index - base] = point;
                return true;
            }
            base += ring.len();
        }
        false
    }

    /// Global corner indices of edge `index`.
    pub fn edge_corners(&self, index: usize) -> Option<(usize, usize)> {
        let mut base = 0;
        for ring in self.rings() {
            let n = ring.len();
            if index < base + n {
                let local = index - base;
                return Some((index, base + (local + 1) % n));
            }
            base += n;
        }
        None
    }

    pub fn edge(&self, index: usize) -> Option<(Point2<f64>, Point2<f64>)> {
        let (a, b) = self.edge_corners(index)?;
        Some((self.corner(a)?, self.corner(b)?))
    }

    /// Unit normal pointing into the solid side of edge `index`.
    pub fn edge_inward_normal(&self, index: usize) -> Option<Vector2<f64>> {
        let (a, b) = self.edge(index)?;
        (b - a)
            .try_normalize(1e-12)
            .map(|d| Vector2::new(-d.y, d.x))
    }

    /// Index of the edge joining `a` and `b` in either direction.
    pub fn find_edge(&self, a: &Point2<f64>, b: &Point2<f64>, tolerance: f64) -> Option<usize> {
        (0..self.edge_count()).find(|&i| match self.edge(i) {
            Some((p, q)) => {
                ((p - a).norm() <= tolerance && (q - b).norm() <= tolerance)
                    || ((p - b).norm() <= tolerance && (q - a).norm() <= tolerance)
            }
            None => false,
        })
    }

    /// Net area (outer minus holes).
    pub fn area(&self) -> f64 {
        compute_signed_area(&self.outer).abs()
            - self
                .holes
                .iter()
                .map(|h| compute_signed_area(h).abs())
                .sum::<f64>()
    }

    /// Axis-aligned bounds of the outer ring.
    pub fn bounds(&self) -> (Point2<f64>, Point2<f64>) {
        let mut min = Point2::new(f64::MAX, f64::MAX);
        let mut max = Point2::new(f64::MIN, f64::MIN);
        for p in &self.outer {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        (min, max)
    }

    /// Vertex average of the outer ring.
    pub fn center(&self) -> Point2<f64> {
        let n = self.outer.len().max(1) as f64;
        let sum = self
            .outer
            .iter()
            .fold(Vector2::zeros(), |acc, p| acc + p.coords);
        Point2::from(sum / n)
    }

    /// Triangulate the footprint using earcutr.
    ///
    /// Triangles smaller than `min_area` are folded into their neighbours
    /// so that every corner stays referenced.
    pub fn triangulate(&self, entity: &str, min_area: f64) -> Result<Triangulation> {
        if self.outer.len() < 3 {
            return Err(Error::topology(
                entity,
                "footprint must have at least 3 vertices",
            ));
        }

        let indices = triangulation::triangulate_rings(&self.outer, &self.holes)
            .map_err(|e| Error::topology(entity, e.to_string()))?;

        let mut points = Vec::with_capacity(self.edge_count());
        for ring in self.rings() {
            points.extend_from_slice(ring);
        }
        let indices = triangulation::split_slivers(&points, &indices, min_area);

        if indices.len() % 3 != 0 || indices.iter().any(|&i| i >= points.len()) {
            return Err(Error::topology(entity, "triangulation produced invalid indices"));
        }

        Ok(Triangulation { points, indices })
    }
}
