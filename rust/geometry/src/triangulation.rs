// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cap triangulation
//!
//! Footprint rings go through earcutr. Ear clipping happily emits
//! zero-area triangles at corners that lie on a straight run of boundary
//! (terrain hole corners shared with two building tiles, for example).
//! Dropping such a sliver would leave its middle corner unused and open a
//! T-junction against the neighbouring volume, so [`split_slivers`] folds
//! the corner into the triangles across the sliver's long edge instead.

use crate::{Error, Point2, Point3, Result, Vector3};

/// Ear-clip an outer ring and its holes.
///
/// Returns triangle indices into the rings concatenated in order
/// (outer first, then each hole).
pub fn triangulate_rings(outer: &[Point2<f64>], holes: &[Vec<Point2<f64>>]) -> Result<Vec<usize>> {
    if outer.len() < 3 {
        return Err(Error::topology(
            "triangulation",
            "need at least 3 points in outer boundary",
        ));
    }

    let total_points: usize = outer.len() + holes.iter().map(|h| h.len()).sum::<usize>();
    let mut vertices = Vec::with_capacity(total_points * 2);
    for p in outer {
        vertices.push(p.x);
        vertices.push(p.y);
    }

    let mut hole_indices = Vec::with_capacity(holes.len());
    for hole in holes {
        if hole.len() < 3 {
            return Err(Error::topology(
                "triangulation",
                format!("hole with {} points", hole.len()),
            ));
        }
        hole_indices.push(vertices.len() / 2);
        for p in hole {
            vertices.push(p.x);
            vertices.push(p.y);
        }
    }

    earcutr::earcut(&vertices, &hole_indices, 2)
        .map_err(|e| Error::topology("triangulation", format!("{:?}", e)))
}

fn doubled_area(points: &[Point2<f64>], t: &[usize; 3]) -> f64 {
    let (a, b, c) = (points[t[0]], points[t[1]], points[t[2]]);
    (b - a).perp(&(c - a))
}

/// For a degenerate triangle, the corner lying strictly inside the longest
/// edge, with that edge's endpoints: `(a, middle, b)`.
fn middle_corner(points: &[Point2<f64>], t: &[usize; 3]) -> Option<(usize, usize, usize)> {
    let longest = (0..3)
        .map(|e| (e, (points[t[(e + 1) % 3]] - points[t[e]]).norm_squared()))
        .max_by(|x, y| x.1.total_cmp(&y.1))
        .map(|(e, _)| e)?;
    let (a, b, c) = (t[longest], t[(longest + 1) % 3], t[(longest + 2) % 3]);
    let ab = points[b] - points[a];
    let len2 = ab.norm_squared();
    if len2 <= 0.0 {
        return None;
    }
    let s = (points[c] - points[a]).dot(&ab) / len2;
    // Coincident corners cannot be folded into anything.
    let eps = 1e-12;
    (s > eps && s < 1.0 - eps).then_some((a, c, b))
}

/// Split every triangle that uses the undirected edge `a`-`b` at corner `c`.
fn split_edge(triangles: &mut Vec<[usize; 3]>, a: usize, b: usize, c: usize) -> bool {
    let mut split = false;
    for k in 0..triangles.len() {
        let t = triangles[k];
        let Some(e) = (0..3).find(|&e| {
            let (p, q) = (t[e], t[(e + 1) % 3]);
            (p == a && q == b) || (p == b && q == a)
        }) else {
            continue;
        };
        let (p, q, r) = (t[e], t[(e + 1) % 3], t[(e + 2) % 3]);
        triangles[k] = [p, c, r];
        triangles.push([c, q, r]);
        split = true;
    }
    split
}

/// Remove triangles below `min_area` without losing boundary corners.
///
/// A sliver's middle corner is folded into the triangles across its long
/// edge. Afterwards any corner that earcutr filtered out as collinear, or
/// that was only used by a sliver, is inserted into the edge it lies on.
/// Winding of every surviving triangle is preserved.
pub fn split_slivers(points: &[Point2<f64>], indices: &[usize], min_area: f64) -> Vec<usize> {
    let mut triangles: Vec<[usize; 3]> = indices
        .chunks_exact(3)
        .map(|t| [t[0], t[1], t[2]])
        .collect();

    let mut budget = triangles.len() * 4 + 8;
    while budget > 0 {
        budget -= 1;
        let Some(s) = triangles
            .iter()
            .position(|t| doubled_area(points, t).abs() * 0.5 < min_area)
        else {
            break;
        };
        let sliver = triangles.swap_remove(s);
        if let Some((a, c, b)) = middle_corner(points, &sliver) {
            split_edge(&mut triangles, a, b, c);
        }
    }

    let mut used = vec![false; points.len()];
    for &i in triangles.iter().flatten() {
        used[i] = true;
    }
    for c in (0..points.len()).filter(|&c| !used[c]) {
        let host = triangles.iter().find_map(|t| {
            (0..3).find_map(|e| {
                let (a, b) = (t[e], t[(e + 1) % 3]);
                let on_edge = doubled_area(points, &[a, c, b]).abs() * 0.5 < min_area
                    && middle_corner(points, &[a, c, b]).map(|(_, m, _)| m) == Some(c);
                on_edge.then_some((a, b))
            })
        });
        if let Some((a, b)) = host {
            split_edge(&mut triangles, a, b, c);
        }
    }

    triangles.into_iter().flatten().collect()
}

/// Area of a planar polygon in 3D (Newell vector magnitude).
pub fn polygon_area_3d(points: &[Point3<f64>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = Vector3::<f64>::zeros();
    for i in 0..n {
        let current = points[i].coords;
        let next = points[(i + 1) % n].coords;
        sum += current.cross(&next);
    }
    sum.norm() * 0.5
}

/// Vertex average of a polygon in 3D.
#[inline]
pub fn polygon_centroid_3d(points: &[Point3<f64>]) -> Point3<f64> {
    if points.is_empty() {
        return Point3::origin();
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / points.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(points: &[Point2<f64>], indices: &[usize]) -> f64 {
        indices
            .chunks(3)
            .map(|t| doubled_area(points, &[t[0], t[1], t[2]]).abs() * 0.5)
            .sum()
    }

    #[test]
    fn test_triangulate_square_with_hole() {
        let outer = vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        let hole = vec![
            Point2::new(3.0, 3.0),
            Point2::new(3.0, 7.0),
            Point2::new(7.0, 7.0),
            Point2::new(7.0, 3.0),
        ];
        let indices = triangulate_rings(&outer, &[hole.clone()]).unwrap();
        let points: Vec<_> = outer.iter().chain(&hole).copied().collect();
        assert_eq!(indices.len() % 3, 0);
        assert!((area(&points, &indices) - 84.0).abs() < 1e-9);
    }

    #[test]
    fn test_insufficient_points() {
        let points = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)];
        assert!(triangulate_rings(&points, &[]).is_err());
    }

    #[test]
    fn test_sliver_corner_folded_into_neighbour() {
        // Corner 1 sits on the straight run from 0 to 2.
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 4.0),
        ];
        let indices = vec![0, 1, 2, 0, 2, 3, 0, 3, 4];
        let split = split_slivers(&points, &indices, 1e-6);

        assert_eq!(split.len(), 12);
        assert!(split.contains(&1));
        assert!((area(&points, &split) - 16.0).abs() < 1e-12);
        for t in split.chunks(3) {
            assert!(doubled_area(&points, &[t[0], t[1], t[2]]) > 0.0, "{:?}", t);
        }
    }

    #[test]
    fn test_filtered_corner_reinserted() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 4.0),
        ];
        let split = split_slivers(&points, &[0, 2, 3, 0, 3, 4], 1e-6);
        assert_eq!(split.len(), 9);
        assert!(split.contains(&1));
        assert!((area(&points, &split) - 16.0).abs() < 1e-12);
    }

    #[test]
    fn test_coincident_sliver_dropped() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(0.0, 4.0),
        ];
        let indices = vec![0, 1, 2, 0, 2, 3];
        assert_eq!(split_slivers(&points, &indices, 1e-6), vec![0, 2, 3]);
    }

    #[test]
    fn test_polygon_area_3d_vertical_wall() {
        let wall = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 2.0),
            Point3::new(0.0, 0.0, 2.0),
        ];
        assert!((polygon_area_3d(&wall) - 6.0).abs() < 1e-12);
        let c = polygon_centroid_3d(&wall);
        assert!((c.x - 1.5).abs() < 1e-12 && (c.z - 1.0).abs() < 1e-12);
    }
}
