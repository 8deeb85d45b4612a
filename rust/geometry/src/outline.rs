// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outline union by edge cancellation
//!
//! Tiles that meet edge to edge are merged without any polygon boolean:
//! corners are welded, edges split where a corner of another tile lands on
//! them, and every pair of opposite directed edges cancels. What survives is
//! the boundary of the union, chained into loops.

use crate::bool2d::{compute_signed_area, intersection_area};
use crate::footprint::Footprint;
use hexmass_core::polygon::distance_to_segment;
use hexmass_core::{Error, Result};
use nalgebra::Point2;
use rustc_hash::FxHashMap;

/// One tile taking part in the union: a counter-clockwise ring and the
/// volume whose footprint edges it mirrors.
#[derive(Debug, Clone, Copy)]
pub struct Tile<'a> {
    pub volume: &'a str,
    pub ring: &'a [Point2<f64>],
}

/// Where a loop edge came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeSource {
    /// The full edge `edge` of tile `tile`.
    Whole { tile: usize, edge: usize },
    /// A piece of a tile edge split at a T-junction.
    Partial { tile: usize, edge: usize },
}

/// Counter-clockwise boundary loop of the union.
#[derive(Debug, Clone)]
pub struct OutlineLoop {
    pub points: Vec<Point2<f64>>,
    /// `sources[k]` describes the edge from `points[k]` to `points[k + 1]`
    pub sources: Vec<EdgeSource>,
}

impl OutlineLoop {
    pub fn area(&self) -> f64 {
        compute_signed_area(&self.points)
    }

    /// The loop as a clockwise hole ring, with sources re-indexed to match.
    pub fn as_hole(&self) -> (Vec<Point2<f64>>, Vec<EdgeSource>) {
        let m = self.points.len();
        let ring: Vec<Point2<f64>> = self.points.iter().rev().copied().collect();
        // Reversed edge j runs p[m-1-j] -> p[m-2-j], i.e. loop edge m-2-j.
        let sources = (0..m)
            .map(|j| self.sources[(2 * m - 2 - j) % m].clone())
            .collect();
        (ring, sources)
    }
}

struct DirectedEdge {
    from: usize,
    to: usize,
    source: EdgeSource,
}

/// Union tile rings into boundary loops.
///
/// Fails when tiles overlap, when the boundary pinches at a vertex, or when
/// the tiles enclose a pocket that belongs to none of them.
pub fn union_outline(tiles: &[Tile<'_>], snap: f64, area_tolerance: f64) -> Result<Vec<OutlineLoop>> {
    check_overlaps(tiles, area_tolerance)?;

    // Weld corners within the snap tolerance; the first occurrence wins.
    let mut welded: Vec<Point2<f64>> = Vec::new();
    let mut rings: Vec<Vec<usize>> = Vec::with_capacity(tiles.len());
    for tile in tiles {
        let ids = tile
            .ring
            .iter()
            .map(|p| match welded.iter().position(|q| (q - p).norm() <= snap) {
                Some(id) => id,
                None => {
                    welded.push(*p);
                    welded.len() - 1
                }
            })
            .collect();
        rings.push(ids);
    }

    // Split edges at T-junctions.
    let mut edges: Vec<DirectedEdge> = Vec::new();
    for (t, ring) in rings.iter().enumerate() {
        let n = ring.len();
        for e in 0..n {
            let (a, b) = (ring[e], ring[(e + 1) % n]);
            let pa = welded[a];
            let dir = welded[b] - pa;
            let len2 = dir.norm_squared();
            let mut inner: Vec<(f64, usize)> = welded
                .iter()
                .enumerate()
                .filter(|&(id, _)| id != a && id != b)
                .filter_map(|(id, p)| {
                    let s = (p - pa).dot(&dir) / len2;
                    (s > 0.0 && s < 1.0 && distance_to_segment(p, &pa, &welded[b]) <= snap)
                        .then_some((s, id))
                })
                .collect();
            if inner.is_empty() {
                edges.push(DirectedEdge {
                    from: a,
                    to: b,
                    source: EdgeSource::Whole { tile: t, edge: e },
                });
                continue;
            }
            inner.sort_by(|x, y| x.0.total_cmp(&y.0));
            let mut from = a;
            for to in inner.into_iter().map(|(_, id)| id).chain(std::iter::once(b)) {
                edges.push(DirectedEdge {
                    from,
                    to,
                    source: EdgeSource::Partial { tile: t, edge: e },
                });
                from = to;
            }
        }
    }

    // Cancel opposite pairs; a repeated direction means two tiles overlap.
    let mut by_key: FxHashMap<(usize, usize), usize> = FxHashMap::default();
    for (i, edge) in edges.iter().enumerate() {
        if let Some(&j) = by_key.get(&(edge.from, edge.to)) {
            return Err(Error::topology(
                tiles[tile_of(&edge.source)].volume,
                format!(
                    "boundary overlaps {} along ({:.3}, {:.3}) -> ({:.3}, {:.3})",
                    tiles[tile_of(&edges[j].source)].volume,
                    welded[edge.from].x,
                    welded[edge.from].y,
                    welded[edge.to].x,
                    welded[edge.to].y
                ),
            ));
        }
        by_key.insert((edge.from, edge.to), i);
    }
    let alive: Vec<bool> = edges
        .iter()
        .map(|e| !by_key.contains_key(&(e.to, e.from)))
        .collect();

    let mut outgoing: FxHashMap<usize, usize> = FxHashMap::default();
    for (i, edge) in edges.iter().enumerate().filter(|(i, _)| alive[*i]) {
        if outgoing.insert(edge.from, i).is_some() {
            let p = welded[edge.from];
            return Err(Error::topology(
                tiles[tile_of(&edge.source)].volume,
                format!("outline pinches at ({:.3}, {:.3})", p.x, p.y),
            ));
        }
    }

    // Chain survivors into loops, in edge order.
    let mut used = vec![false; edges.len()];
    let mut loops = Vec::new();
    for start in 0..edges.len() {
        if !alive[start] || used[start] {
            continue;
        }
        let mut points = Vec::new();
        let mut sources = Vec::new();
        let mut current = start;
        loop {
            used[current] = true;
            points.push(welded[edges[current].from]);
            sources.push(edges[current].source.clone());
            let next_vertex = edges[current].to;
            match outgoing.get(&next_vertex) {
                Some(&next) if next == start => break,
                Some(&next) if !used[next] => current = next,
                _ => {
                    let p = welded[next_vertex];
                    return Err(Error::topology(
                        tiles[tile_of(&edges[current].source)].volume,
                        format!("outline does not close at ({:.3}, {:.3})", p.x, p.y),
                    ));
                }
            }
        }
        let outline = OutlineLoop { points, sources };
        if outline.area() <= 0.0 {
            let p = outline.points[0];
            return Err(Error::topology(
                "terrain",
                format!(
                    "tiles enclose a pocket near ({:.3}, {:.3}) of area {:.3}",
                    p.x,
                    p.y,
                    -outline.area()
                ),
            ));
        }
        loops.push(outline);
    }

    tracing::debug!(
        tiles = tiles.len(),
        vertices = welded.len(),
        loops = loops.len(),
        "Merged tile outlines"
    );
    Ok(loops)
}

fn tile_of(source: &EdgeSource) -> usize {
    match source {
        EdgeSource::Whole { tile, .. } | EdgeSource::Partial { tile, .. } => *tile,
    }
}

fn check_overlaps(tiles: &[Tile<'_>], area_tolerance: f64) -> Result<()> {
    let footprints: Vec<Footprint> = tiles
        .iter()
        .map(|t| Footprint::new(t.ring.to_vec(), Vec::new()))
        .collect();
    for i in 0..footprints.len() {
        for j in i + 1..footprints.len() {
            let overlap = intersection_area(&footprints[i], &footprints[j]);
            if overlap > area_tolerance {
                return Err(Error::topology(
                    tiles[i].volume,
                    format!("overlaps {} by area {:.6}", tiles[j].volume, overlap),
                ));
            }
        }
    }
    Ok(())
}
