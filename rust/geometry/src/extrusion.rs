// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extrusion operations - converting footprints to closed volumes
//!
//! Vertex layout of an extruded volume: footprint corner `i` (global index)
//! at the bottom is vertex `i`, the same corner at the top is vertex `n + i`,
//! and a pyramid apex, when present, is vertex `2n`.

use crate::elevation::Elevation;
use crate::footprint::Footprint;
use crate::scene::{EdgeRole, Face, Material, NormalRule, Volume};
use crate::triangulation::polygon_area_3d;
use hexmass_core::{Error, Result, Tolerances};
use nalgebra::{Point2, Point3, Vector2};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Horizontal inset of wall anchors into the solid.
const ANCHOR_INSET: f64 = 1e-2;

/// How the top of a volume is closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Flat or graded top cap.
    Prism,
    /// Pyramid rising `rise` above the top elevation to an apex over the
    /// footprint centroid. Outer ring only.
    Pyramid { rise: f64 },
}

/// Cap materials; `None` leaves that side open.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Caps {
    pub bottom: Option<Material>,
    pub top: Option<Material>,
}

impl Caps {
    pub fn both(material: Material) -> Self {
        Self {
            bottom: Some(material),
            top: Some(material),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

/// Per-edge roles: a default plus explicit overrides by global edge index.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeTable {
    pub default: EdgeRole,
    pub overrides: BTreeMap<usize, EdgeRole>,
}

impl EdgeTable {
    pub fn uniform(role: EdgeRole) -> Self {
        Self {
            default: role,
            overrides: BTreeMap::new(),
        }
    }

    pub fn walls(material: Material) -> Self {
        Self::uniform(EdgeRole::Wall(material))
    }

    pub fn open() -> Self {
        Self::uniform(EdgeRole::Open)
    }

    pub fn with(mut self, edge: usize, role: EdgeRole) -> Self {
        self.overrides.insert(edge, role);
        self
    }

    #[inline]
    pub fn role(&self, edge: usize) -> EdgeRole {
        self.overrides.get(&edge).copied().unwrap_or(self.default)
    }
}

/// Declarative description of one volume.
#[derive(Debug, Clone)]
pub struct VolumeSpec {
    pub name: String,
    /// Plan outline label; volumes sharing a label are siblings
    pub outline: String,
    pub footprint: Footprint,
    pub bottom: Elevation,
    pub top: Elevation,
    pub shape: Shape,
    pub caps: Caps,
    pub edges: EdgeTable,
    pub normal_rule: NormalRule,
}

impl VolumeSpec {
    /// Flat prism with walls and caps of one material.
    pub fn slab(
        name: impl Into<String>,
        outline: impl Into<String>,
        footprint: Footprint,
        bottom: f64,
        top: f64,
        material: Material,
    ) -> Self {
        Self {
            name: name.into(),
            outline: outline.into(),
            footprint,
            bottom: Elevation::Flat(bottom),
            top: Elevation::Flat(top),
            shape: Shape::Prism,
            caps: Caps::both(material),
            edges: EdgeTable::walls(material),
            normal_rule: NormalRule::Outward,
        }
    }

    /// Walls only, no caps.
    pub fn walls(
        name: impl Into<String>,
        outline: impl Into<String>,
        footprint: Footprint,
        bottom: f64,
        top: f64,
        material: Material,
    ) -> Self {
        Self {
            caps: Caps::none(),
            ..Self::slab(name, outline, footprint, bottom, top, material)
        }
    }
}

/// Extrude one volume.
pub fn extrude_volume(spec: &VolumeSpec, tolerances: &Tolerances) -> Result<Volume> {
    let footprint = &spec.footprint;
    let n = footprint.edge_count();
    if footprint.outer.len() < 3 {
        return Err(Error::topology(
            &spec.name,
            "footprint must have at least 3 vertices",
        ));
    }
    if let Some((&edge, _)) = spec.edges.overrides.range(n..).next() {
        return Err(Error::topology(
            &spec.name,
            format!(
                "edge override {} out of range for a footprint with {} edges",
                edge, n
            ),
        ));
    }

    let corners: Vec<Point2<f64>> = footprint.rings().flatten().copied().collect();

    // Corner heights; a top below the bottom is never repaired.
    let mut vertices = Vec::with_capacity(2 * n + 1);
    let mut heights = Vec::with_capacity(n);
    for c in &corners {
        vertices.push(Point3::new(c.x, c.y, spec.bottom.at(c)));
    }
    for (i, c) in corners.iter().enumerate() {
        let zb = vertices[i].z;
        let zt = spec.top.at(c);
        let h = zt - zb;
        if h < -tolerances.coordinate {
            return Err(Error::topology(
                &spec.name,
                format!(
                    "top ({:.6}) below bottom ({:.6}) at corner {}",
                    zt, zb, i
                ),
            ));
        }
        let h = if h <= tolerances.coordinate { 0.0 } else { h };
        heights.push(h);
        vertices.push(Point3::new(c.x, c.y, zb + h));
    }

    let mut faces = Vec::new();
    let mut dropped = 0usize;

    if spec.caps.bottom.is_some() || (spec.caps.top.is_some() && spec.shape == Shape::Prism) {
        let tri = footprint.triangulate(&spec.name, tolerances.area)?;
        for t in tri.indices.chunks_exact(3) {
            let (mut i, j, mut k) = (t[0], t[1], t[2]);
            // Orient counter-clockwise seen from above.
            if (corners[j] - corners[i]).perp(&(corners[k] - corners[i])) < 0.0 {
                std::mem::swap(&mut i, &mut k);
            }
            let centre = Point2::from((corners[i].coords + corners[j].coords + corners[k].coords) / 3.0);
            let mid_z = (spec.bottom.at(&centre) + spec.top.at(&centre)) * 0.5;
            let anchor = Point3::new(centre.x, centre.y, mid_z);

            if let Some(material) = spec.caps.bottom {
                let face = Face::new(&[i as u32, k as u32, j as u32], material).with_anchor(anchor);
                push_face(&mut faces, face, &vertices, tolerances, &mut dropped);
            }
            if let (Some(material), Shape::Prism) = (spec.caps.top, spec.shape) {
                let face = Face::new(&[(n + i) as u32, (n + j) as u32, (n + k) as u32], material)
                    .with_anchor(anchor);
                push_face(&mut faces, face, &vertices, tolerances, &mut dropped);
            }
        }
    }

    let mut skipped = 0usize;
    for edge in 0..n {
        let EdgeRole::Wall(material) = spec.edges.role(edge) else {
            continue;
        };
        let Some((c0, c1)) = footprint.edge_corners(edge) else {
            continue;
        };
        let (b0, b1, t0, t1) = (c0 as u32, c1 as u32, (n + c0) as u32, (n + c1) as u32);
        let indices = match (heights[c0] > 0.0, heights[c1] > 0.0) {
            (true, true) => vec![b0, b1, t1, t0],
            (false, true) => vec![b0, b1, t1],
            (true, false) => vec![b0, b1, t0],
            (false, false) => {
                skipped += 1;
                continue;
            }
        };
        let inward = footprint
            .edge_inward_normal(edge)
            .unwrap_or_else(Vector2::zeros);
        let mid = Point2::from((corners[c0].coords + corners[c1].coords) * 0.5);
        let inside = mid + inward * ANCHOR_INSET;
        let mid_z = (spec.bottom.at(&mid) + spec.top.at(&mid)) * 0.5;
        let face = Face::new(&indices, material).with_anchor(Point3::new(inside.x, inside.y, mid_z));
        push_face(&mut faces, face, &vertices, tolerances, &mut dropped);
    }

    if let Shape::Pyramid { rise } = spec.shape {
        add_pyramid(spec, rise, n, &mut vertices, &mut faces)?;
    }

    if dropped > 0 || skipped > 0 {
        tracing::debug!(
            volume = %spec.name,
            dropped_slivers = dropped,
            skipped_walls = skipped,
            "Pruned degenerate faces"
        );
    }

    if faces.is_empty() {
        return Err(Error::topology(&spec.name, "extrusion produced no faces"));
    }

    Ok(Volume::new(
        spec.name.clone(),
        spec.outline.clone(),
        spec.normal_rule,
        footprint.clone(),
        vertices,
        faces,
    ))
}

/// Extrude every spec in parallel, keeping declaration order.
pub fn extrude_all(specs: &[VolumeSpec], tolerances: &Tolerances) -> Result<Vec<Volume>> {
    let volumes = specs
        .par_iter()
        .map(|spec| extrude_volume(spec, tolerances))
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(
        volumes = volumes.len(),
        faces = volumes.iter().map(|v| v.faces().len()).sum::<usize>(),
        "Extruded volumes"
    );
    Ok(volumes)
}

fn push_face(
    faces: &mut Vec<Face>,
    face: Face,
    vertices: &[Point3<f64>],
    tolerances: &Tolerances,
    dropped: &mut usize,
) {
    if polygon_area_3d(&face.points(vertices)) < tolerances.area {
        *dropped += 1;
    } else {
        faces.push(face);
    }
}

fn add_pyramid(
    spec: &VolumeSpec,
    rise: f64,
    n: usize,
    vertices: &mut Vec<Point3<f64>>,
    faces: &mut Vec<Face>,
) -> Result<()> {
    if !spec.footprint.holes.is_empty() {
        return Err(Error::topology(&spec.name, "pyramid footprint has holes"));
    }
    if !(rise > 0.0) {
        return Err(Error::topology(
            &spec.name,
            format!("pyramid rise must be positive, got {}", rise),
        ));
    }
    let Some(material) = spec.caps.top else {
        return Err(Error::topology(&spec.name, "pyramid needs a top material"));
    };
    let polygon = hexmass_core::Polygon::new(&spec.name, spec.footprint.outer.clone())?;
    let centre = polygon.centroid();
    let apex_z = spec.top.at(&centre) + rise;
    let apex = vertices.len() as u32;
    vertices.push(Point3::new(centre.x, centre.y, apex_z));

    for i in 0..spec.footprint.outer.len() {
        let j = (i + 1) % spec.footprint.outer.len();
        faces.push(Face::new(&[(n + i) as u32, (n + j) as u32, apex], material));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::elevation::GradedSurface;

    fn square(min: f64, max: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(min, min),
            Point2::new(max, min),
            Point2::new(max, max),
            Point2::new(min, max),
        ]
    }

    fn tol() -> Tolerances {
        Tolerances::default()
    }

    #[test]
    fn test_slab_is_closed_box() {
        let spec = VolumeSpec::slab(
            "slab",
            "slab",
            Footprint::new(square(0.0, 10.0), Vec::new()),
            0.0,
            1.0,
            Material::Concrete,
        );
        let volume = extrude_volume(&spec, &tol()).unwrap();
        assert_eq!(volume.vertices().len(), 8);
        // 2 + 2 cap triangles, 4 wall quads
        assert_eq!(volume.faces().len(), 8);
        let (lo, hi) = volume.z_range();
        assert_relative_eq!(lo, 0.0);
        assert_relative_eq!(hi, 1.0);
        for face in volume.faces() {
            assert!(face.anchor.is_some());
            assert!(!face.outward);
        }
    }

    #[test]
    fn test_open_edges_and_hole_walls() {
        let footprint = Footprint::new(square(0.0, 10.0), vec![square(4.0, 6.0)]);
        let mut spec = VolumeSpec::walls("facade", "ring", footprint, 0.0, 3.0, Material::Glass);
        spec.edges = EdgeTable::walls(Material::Glass).with(0, EdgeRole::Open);
        let volume = extrude_volume(&spec, &tol()).unwrap();
        // 3 outer walls + 4 hole walls, no caps
        assert_eq!(volume.faces().len(), 7);
    }

    #[test]
    fn test_wall_degenerates_where_height_vanishes() {
        // Top slopes down to meet the bottom along x = 10.
        let surface = GradedSurface::new(
            Point2::origin(),
            Vector2::x(),
            vec![(0.0, 5.0), (10.0, 0.0)],
        )
        .unwrap();
        let spec = VolumeSpec {
            top: Elevation::Graded(surface),
            ..VolumeSpec::walls(
                "bank",
                "bank",
                Footprint::new(square(0.0, 10.0), Vec::new()),
                0.0,
                0.0,
                Material::Ground,
            )
        };
        let volume = extrude_volume(&spec, &tol()).unwrap();
        // Edge 0 (y=0): triangle; edge 1 (x=10): skipped; edge 2: triangle; edge 3: quad
        let sizes: Vec<usize> = volume.faces().iter().map(|f| f.indices.len()).collect();
        assert_eq!(sizes, vec![3, 3, 4]);
    }

    #[test]
    fn test_top_below_bottom_rejected() {
        let spec = VolumeSpec::slab(
            "inverted",
            "inverted",
            Footprint::new(square(0.0, 1.0), Vec::new()),
            2.0,
            1.0,
            Material::Concrete,
        );
        let err = extrude_volume(&spec, &tol()).unwrap_err();
        assert!(matches!(err, Error::Topology { ref entity, .. } if entity == "inverted"));
    }

    #[test]
    fn test_override_beyond_edge_count_rejected() {
        let mut spec = VolumeSpec::slab(
            "slab",
            "slab",
            Footprint::new(square(0.0, 1.0), Vec::new()),
            0.0,
            1.0,
            Material::Concrete,
        );
        spec.edges = spec.edges.with(4, EdgeRole::Open);
        assert!(extrude_volume(&spec, &tol()).is_err());
    }

    #[test]
    fn test_pyramid_roof() {
        let spec = VolumeSpec {
            shape: Shape::Pyramid { rise: 6.0 },
            ..VolumeSpec::slab(
                "roof",
                "roof",
                Footprint::new(square(-1.0, 1.0), Vec::new()),
                10.0,
                11.0,
                Material::Glass,
            )
        };
        let volume = extrude_volume(&spec, &tol()).unwrap();
        assert_eq!(volume.vertices().len(), 9);
        let apex = volume.vertices()[8];
        assert_relative_eq!(apex.z, 17.0);
        // bottom cap (2) + walls (4) + pyramid sides (4)
        assert_eq!(volume.faces().len(), 10);

        let mut holed = spec.clone();
        holed.footprint = Footprint::new(square(-1.0, 1.0), vec![square(-0.5, 0.5)]);
        assert!(extrude_volume(&holed, &tol()).is_err());
    }

    #[test]
    fn test_extrude_all_keeps_order() {
        let specs: Vec<VolumeSpec> = (0..8)
            .map(|i| {
                VolumeSpec::slab(
                    format!("slab_{}", i),
                    "stack",
                    Footprint::new(square(0.0, 1.0), Vec::new()),
                    i as f64,
                    i as f64 + 1.0,
                    Material::Concrete,
                )
            })
            .collect();
        let volumes = extrude_all(&specs, &tol()).unwrap();
        let names: Vec<&str> = volumes.iter().map(|v| v.name()).collect();
        assert_eq!(names, specs.iter().map(|s| s.name.as_str()).collect::<Vec<_>>());
    }
}
