// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene data structures: volumes, faces and the contracts between them

use crate::footprint::Footprint;
use crate::triangulation::{polygon_area_3d, polygon_centroid_3d};
use hexmass_core::{Error, Result, Tolerances};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// Surface material of a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    Concrete,
    Glass,
    Ground,
    Marble,
}

impl Material {
    pub const ALL: [Material; 4] = [
        Material::Concrete,
        Material::Glass,
        Material::Ground,
        Material::Marble,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Material::Concrete => "concrete",
            Material::Glass => "glass",
            Material::Ground => "ground",
            Material::Marble => "marble",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Material::ALL.into_iter().find(|m| m.name() == name)
    }
}

/// What an extruded footprint edge produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeRole {
    /// No wall; the volume is open on this side.
    Open,
    Wall(Material),
}

impl EdgeRole {
    pub fn name(self) -> &'static str {
        match self {
            EdgeRole::Open => "open",
            EdgeRole::Wall(m) => m.name(),
        }
    }
}

impl FromStr for EdgeRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "open" {
            return Ok(EdgeRole::Open);
        }
        Material::from_name(s)
            .map(EdgeRole::Wall)
            .ok_or_else(|| Error::topology("edge_role", format!("unknown edge role '{}'", s)))
    }
}

/// Which way a volume's faces must point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalRule {
    #[default]
    Outward,
    /// Retaining structures face into the space they enclose.
    Inward,
}

/// Planar face of a volume (triangle or quad).
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// Indices into the owning volume's vertex buffer
    pub indices: SmallVec<[u32; 4]>,
    pub material: Material,
    /// Set once the orientation has been verified against the volume's rule
    pub outward: bool,
    /// Point just inside the solid next to this face
    pub anchor: Option<Point3<f64>>,
}

impl Face {
    pub fn new(indices: &[u32], material: Material) -> Self {
        Self {
            indices: SmallVec::from_slice(indices),
            material,
            outward: false,
            anchor: None,
        }
    }

    pub fn with_anchor(mut self, anchor: Point3<f64>) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn points(&self, vertices: &[Point3<f64>]) -> SmallVec<[Point3<f64>; 4]> {
        self.indices
            .iter()
            .filter_map(|&i| vertices.get(i as usize).copied())
            .collect()
    }

    /// Cross product of the first two edge vectors from the first vertex.
    pub fn normal(&self, vertices: &[Point3<f64>]) -> Vector3<f64> {
        let p = self.points(vertices);
        if p.len() < 3 {
            return Vector3::zeros();
        }
        (p[1] - p[0]).cross(&(p[2] - p[0]))
    }

    pub fn area(&self, vertices: &[Point3<f64>]) -> f64 {
        polygon_area_3d(&self.points(vertices))
    }

    pub fn centroid(&self, vertices: &[Point3<f64>]) -> Point3<f64> {
        polygon_centroid_3d(&self.points(vertices))
    }

    /// Reverse winding, keeping the first vertex in place.
    pub fn reverse(&mut self) {
        if self.indices.len() > 1 {
            self.indices[1..].reverse();
        }
    }
}

/// Named solid extruded from one plan outline.
///
/// A volume owns its footprint copy; nothing ties it back to the source
/// polygon except the `outline` label.
#[derive(Debug, Clone)]
pub struct Volume {
    name: String,
    outline: String,
    normal_rule: NormalRule,
    footprint: Footprint,
    vertices: Vec<Point3<f64>>,
    faces: Vec<Face>,
}

impl Volume {
    pub fn new(
        name: impl Into<String>,
        outline: impl Into<String>,
        normal_rule: NormalRule,
        footprint: Footprint,
        vertices: Vec<Point3<f64>>,
        faces: Vec<Face>,
    ) -> Self {
        Self {
            name: name.into(),
            outline: outline.into(),
            normal_rule,
            footprint,
            vertices,
            faces,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Label of the plan outline this volume was extruded from.
    pub fn outline(&self) -> &str {
        &self.outline
    }

    pub fn normal_rule(&self) -> NormalRule {
        self.normal_rule
    }

    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub(crate) fn vertices_mut(&mut self) -> &mut Vec<Point3<f64>> {
        &mut self.vertices
    }

    pub(crate) fn faces_mut(&mut self) -> &mut Vec<Face> {
        &mut self.faces
    }

    pub(crate) fn footprint_mut(&mut self) -> &mut Footprint {
        &mut self.footprint
    }

    /// Lowest and highest vertex elevation.
    pub fn z_range(&self) -> (f64, f64) {
        self.vertices
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.z), hi.max(p.z))
            })
    }

    /// Vertex average; used when a face carries no anchor.
    pub fn centroid(&self) -> Point3<f64> {
        polygon_centroid_3d(&self.vertices)
    }

    /// Area of the footprint (outer minus holes)
    pub fn footprint_area(&self) -> f64 {
        self.footprint.area()
    }
}

/// One footprint edge of a named volume.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeRef {
    pub volume: String,
    pub edge: usize,
}

impl EdgeRef {
    pub fn new(volume: impl Into<String>, edge: usize) -> Self {
        Self {
            volume: volume.into(),
            edge,
        }
    }
}

impl fmt::Display for EdgeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.volume, self.edge)
    }
}

/// Two edges that must coincide after resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedBoundary {
    pub a: EdgeRef,
    pub b: EdgeRef,
}

impl SharedBoundary {
    pub fn new(a: EdgeRef, b: EdgeRef) -> Self {
        Self { a, b }
    }

    /// Check name used in validation reports.
    pub fn label(&self) -> String {
        format!("{}~{}", self.a, self.b)
    }
}

/// Edges that must all have the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualEdgeGroup {
    pub name: String,
    /// Target length; `None` compares the edges with each other only
    pub expected: Option<f64>,
    pub edges: Vec<EdgeRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackKind {
    /// The upper volume may sit on or overlap the lower one.
    Stacked,
    /// The upper volume starts exactly where the lower one ends.
    Continuous,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackRelation {
    pub lower: String,
    pub upper: String,
    pub kind: StackKind,
}

impl StackRelation {
    pub fn continuous(lower: impl Into<String>, upper: impl Into<String>) -> Self {
        Self {
            lower: lower.into(),
            upper: upper.into(),
            kind: StackKind::Continuous,
        }
    }

    pub fn stacked(lower: impl Into<String>, upper: impl Into<String>) -> Self {
        Self {
            lower: lower.into(),
            upper: upper.into(),
            kind: StackKind::Stacked,
        }
    }

    /// Whether this relation links `a` and `b` in either order.
    pub fn links(&self, a: &str, b: &str) -> bool {
        (self.lower == a && self.upper == b) || (self.lower == b && self.upper == a)
    }
}

/// Declarations the validator re-verifies after the build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneContracts {
    pub shared_boundaries: Vec<SharedBoundary>,
    pub equal_edges: Vec<EqualEdgeGroup>,
    pub stacks: Vec<StackRelation>,
}

/// Ordered set of volumes plus export metadata.
#[derive(Debug, Clone)]
pub struct Scene {
    units: String,
    axis_correction_degrees: f64,
    export_unit_scale: f64,
    tolerances: Tolerances,
    contracts: SceneContracts,
    volumes: Vec<Volume>,
}

impl Scene {
    pub const UNITS: &'static str = "feet";

    /// Scene in feet, exported z-up to y-up in metres.
    pub fn new(tolerances: Tolerances, contracts: SceneContracts, volumes: Vec<Volume>) -> Self {
        Self {
            units: Self::UNITS.to_string(),
            axis_correction_degrees: -90.0,
            export_unit_scale: 0.3048,
            tolerances,
            contracts,
            volumes,
        }
    }

    /// Root transform applied by exporters; coordinates stay untouched.
    pub fn with_export_frame(mut self, axis_correction_degrees: f64, export_unit_scale: f64) -> Self {
        self.axis_correction_degrees = axis_correction_degrees;
        self.export_unit_scale = export_unit_scale;
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    /// Length unit of every coordinate
    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn axis_correction_degrees(&self) -> f64 {
        self.axis_correction_degrees
    }

    pub fn export_unit_scale(&self) -> f64 {
        self.export_unit_scale
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    pub fn contracts(&self) -> &SceneContracts {
        &self.contracts
    }

    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    pub(crate) fn volumes_mut(&mut self) -> &mut [Volume] {
        &mut self.volumes
    }

    /// Swap in a rebuilt volume, returning the one it replaces.
    ///
    /// Face orientation of the new volume is not re-verified; run
    /// [`crate::correct_normals`] afterwards.
    pub fn replace_volume(&mut self, index: usize, volume: Volume) -> Option<Volume> {
        let slot = self.volumes.get_mut(index)?;
        Some(std::mem::replace(slot, volume))
    }

    pub fn volume(&self, name: &str) -> Option<&Volume> {
        self.volumes.iter().find(|v| v.name() == name)
    }

    pub fn volume_index(&self, name: &str) -> Option<usize> {
        self.volumes.iter().position(|v| v.name() == name)
    }

    pub fn face_count(&self) -> usize {
        self.volumes.iter().map(|v| v.faces().len()).sum()
    }

    /// Both endpoints of a referenced footprint edge.
    pub fn edge(&self, edge: &EdgeRef) -> Result<(nalgebra::Point2<f64>, nalgebra::Point2<f64>)> {
        let volume = self
            .volume(&edge.volume)
            .ok_or_else(|| Error::topology(edge.to_string(), "unknown volume"))?;
        volume.footprint().edge(edge.edge).ok_or_else(|| {
            Error::topology(
                edge.to_string(),
                format!(
                    "edge index out of range for a footprint with {} edges",
                    volume.footprint().edge_count()
                ),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;

    #[test]
    fn test_edge_role_parsing() {
        assert_eq!("open".parse::<EdgeRole>().unwrap(), EdgeRole::Open);
        assert_eq!(
            "glass".parse::<EdgeRole>().unwrap(),
            EdgeRole::Wall(Material::Glass)
        );
        let err = "brick".parse::<EdgeRole>().unwrap_err();
        assert!(matches!(err, Error::Topology { .. }));
    }

    #[test]
    fn test_face_reverse_keeps_first_vertex() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mut face = Face::new(&[0, 1, 2, 3], Material::Marble);
        assert!(face.normal(&vertices).z > 0.0);
        face.reverse();
        assert_eq!(face.indices.as_slice(), &[0, 3, 2, 1]);
        assert!(face.normal(&vertices).z < 0.0);
        assert!((face.area(&vertices) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scene_edge_lookup() {
        let footprint = Footprint::new(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(2.0, 0.0),
                Point2::new(0.0, 2.0),
            ],
            Vec::new(),
        );
        let slab = Volume::new(
            "slab",
            "slab",
            NormalRule::Outward,
            footprint,
            Vec::new(),
            Vec::new(),
        );
        let mut scene = Scene::new(Tolerances::default(), SceneContracts::default(), vec![slab.clone()]);
        assert_eq!(scene.units(), Scene::UNITS);
        let (a, b) = scene.edge(&EdgeRef::new("slab", 1)).unwrap();
        assert_eq!(a, Point2::new(2.0, 0.0));
        assert_eq!(b, Point2::new(0.0, 2.0));
        assert!(scene.edge(&EdgeRef::new("slab", 3)).is_err());
        assert!(scene.edge(&EdgeRef::new("roof", 0)).is_err());

        assert!(scene.replace_volume(0, slab.clone()).is_some());
        assert!(scene.replace_volume(1, slab).is_none());
        assert_eq!(scene.volumes().len(), 1);
    }
}
