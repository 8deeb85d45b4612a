// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared-edge resolution
//!
//! Declared shared boundaries are checked against the tolerances and, when
//! they pass, their corners are merged into equivalence classes. Every class
//! snaps to one coordinate, so paired corners end up bit-identical. The snap
//! is carried to every volume extruded from the same outline.

use crate::scene::{SharedBoundary, Volume};
use hexmass_core::{Error, Result, Tolerances};
use nalgebra::Point2;
use rustc_hash::FxHashMap;

/// Summary of one resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResolutionStats {
    pub boundaries: usize,
    /// Corner classes with more than one member
    pub classes: usize,
    /// Footprint corners moved, siblings included
    pub snapped: usize,
    pub max_drift: f64,
}

/// A footprint corner of one volume.
type Node = (usize, usize);

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Join the class of `b` into the class of `a`; `a`'s root survives.
    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

/// Check every declaration, then snap paired corners together.
///
/// Nothing is modified unless every declaration passes.
pub fn resolve_shared_edges(
    volumes: &mut [Volume],
    boundaries: &[SharedBoundary],
    tolerances: &Tolerances,
) -> Result<ResolutionStats> {
    let index: FxHashMap<String, usize> = volumes
        .iter()
        .enumerate()
        .map(|(i, v)| (v.name().to_string(), i))
        .collect();

    let mut nodes: Vec<Node> = Vec::new();
    let mut node_ids: FxHashMap<Node, usize> = FxHashMap::default();
    let mut pairs: Vec<(usize, usize)> = Vec::new();
    let mut intern = |node: Node| -> usize {
        *node_ids.entry(node).or_insert_with(|| {
            nodes.push(node);
            nodes.len() - 1
        })
    };

    for boundary in boundaries {
        let (va, ca0, ca1, pa0, pa1) = edge_corners(volumes, &index, &boundary.a)?;
        let (vb, cb0, cb1, pb0, pb1) = edge_corners(volumes, &index, &boundary.b)?;

        let direct = (pa0 - pb0).norm() + (pa1 - pb1).norm();
        let reversed = (pa0 - pb1).norm() + (pa1 - pb0).norm();
        let (qb0, qb1, cb_for0, cb_for1) = if direct <= reversed {
            (pb0, pb1, cb0, cb1)
        } else {
            (pb1, pb0, cb1, cb0)
        };

        let len_a = (pa1 - pa0).norm();
        let len_b = (qb1 - qb0).norm();
        if (len_a - len_b).abs() > tolerances.edge_length {
            return Err(mismatch(boundary, len_b, len_a, tolerances.edge_length));
        }

        let mid_a = Point2::from((pa0.coords + pa1.coords) * 0.5);
        let mid_b = Point2::from((qb0.coords + qb1.coords) * 0.5);
        let deviation = (pa0 - qb0)
            .norm()
            .max((pa1 - qb1).norm())
            .max((mid_a - mid_b).norm());
        if deviation > tolerances.snap {
            return Err(mismatch(boundary, deviation, 0.0, tolerances.snap));
        }

        pairs.push((intern((va, ca0)), intern((vb, cb_for0))));
        pairs.push((intern((va, ca1)), intern((vb, cb_for1))));
    }

    let mut classes = UnionFind {
        parent: (0..nodes.len()).collect(),
    };
    for &(a, b) in &pairs {
        classes.union(a, b);
    }

    // Original positions, read before anything moves.
    let original: Vec<Point2<f64>> = nodes
        .iter()
        .map(|&(v, c)| volumes[v].footprint().corner(c).unwrap_or_else(Point2::origin))
        .collect();

    let mut siblings: FxHashMap<String, Vec<usize>> = FxHashMap::default();
    for (i, v) in volumes.iter().enumerate() {
        siblings.entry(v.outline().to_string()).or_default().push(i);
    }

    let mut stats = ResolutionStats {
        boundaries: boundaries.len(),
        ..ResolutionStats::default()
    };
    let mut roots_seen = vec![false; nodes.len()];
    for id in 0..nodes.len() {
        let root = classes.find(id);
        if root != id && !roots_seen[root] {
            roots_seen[root] = true;
            stats.classes += 1;
        }
        let (old, target) = (original[id], original[root]);
        if old == target {
            continue;
        }
        stats.max_drift = stats.max_drift.max((old - target).norm());
        let outline = volumes[nodes[id].0].outline().to_string();
        for &v in siblings.get(&outline).map(Vec::as_slice).unwrap_or(&[]) {
            stats.snapped += snap_volume(&mut volumes[v], &old, &target, tolerances.snap);
        }
    }

    tracing::info!(
        boundaries = stats.boundaries,
        classes = stats.classes,
        snapped = stats.snapped,
        max_drift = stats.max_drift,
        "Resolved shared edges"
    );
    Ok(stats)
}

/// Move every corner and vertex of `volume` lying within `snap` of `old`.
fn snap_volume(volume: &mut Volume, old: &Point2<f64>, target: &Point2<f64>, snap: f64) -> usize {
    let mut moved = 0;
    let count = volume.footprint().edge_count();
    for c in 0..count {
        if let Some(p) = volume.footprint().corner(c) {
            if (p - old).norm() <= snap && p != *target {
                volume.footprint_mut().set_corner(c, *target);
                moved += 1;
            }
        }
    }
    for v in volume.vertices_mut() {
        let xy = Point2::new(v.x, v.y);
        if (xy - old).norm() <= snap {
            v.x = target.x;
            v.y = target.y;
        }
    }
    moved
}

#[allow(clippy::type_complexity)]
fn edge_corners(
    volumes: &[Volume],
    index: &FxHashMap<String, usize>,
    edge: &crate::scene::EdgeRef,
) -> Result<(usize, usize, usize, Point2<f64>, Point2<f64>)> {
    let &v = index
        .get(&edge.volume)
        .ok_or_else(|| Error::topology(edge.to_string(), "unknown volume"))?;
    let footprint = volumes[v].footprint();
    let out_of_range = || {
        Error::topology(
            edge.to_string(),
            format!(
                "edge index out of range for a footprint with {} edges",
                footprint.edge_count()
            ),
        )
    };
    let (c0, c1) = footprint.edge_corners(edge.edge).ok_or_else(out_of_range)?;
    let (p0, p1) = footprint.edge(edge.edge).ok_or_else(out_of_range)?;
    Ok((v, c0, c1, p0, p1))
}

fn mismatch(boundary: &SharedBoundary, measured: f64, expected: f64, tolerance: f64) -> Error {
    Error::EdgeMismatch {
        a: boundary.a.to_string(),
        b: boundary.b.to_string(),
        measured,
        expected,
        tolerance,
    }
}
