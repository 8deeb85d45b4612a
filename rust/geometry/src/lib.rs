// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! hexmass geometry
//!
//! Turns a plan into a scene of closed volumes: footprints are extruded with
//! earcutr-triangulated caps, declared shared edges are snapped together and
//! face winding is corrected against each volume's normal rule.
//!
//! ```rust,no_run
//! use hexmass_core::{generate_plan, GeneratorConfig};
//! use hexmass_geometry::build_scene;
//!
//! let config = GeneratorConfig::default();
//! let plan = generate_plan(&config).unwrap();
//! let scene = build_scene(&plan, &config).unwrap();
//! println!("{} volumes, {} faces", scene.volumes().len(), scene.face_count());
//! ```

pub mod bool2d;
pub mod builder;
pub mod driveway;
pub mod elevation;
pub mod extrusion;
pub mod footprint;
pub mod normals;
pub mod outline;
pub mod resolver;
pub mod scene;
pub mod terrain;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use hexmass_core::{Error, Result};

pub use builder::{build_scene, wing_base, wing_component};
pub use elevation::{Elevation, GradedSurface};
pub use extrusion::{extrude_all, extrude_volume, Caps, EdgeTable, Shape, VolumeSpec};
pub use footprint::Footprint;
pub use normals::{correct_normals, outward_alignment, satisfies_rule, CorrectionStats};
pub use resolver::{resolve_shared_edges, ResolutionStats};
pub use scene::{
    EdgeRef, EdgeRole, EqualEdgeGroup, Face, Material, NormalRule, Scene, SceneContracts,
    SharedBoundary, StackKind, StackRelation, Volume,
};
pub use triangulation::{split_slivers, triangulate_rings};
