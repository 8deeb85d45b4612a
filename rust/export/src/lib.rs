// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # hexmass export
//!
//! Writers for the two artifacts of a generation run, and readers that bring
//! them back for validate-only runs.
//!
//! - **GLB**: [`write_glb`] emits one node and mesh per volume under a root
//!   node carrying the axis correction and unit scale. Footprints, normal
//!   rules and scene contracts travel in glTF `extras`, so [`read_glb`]
//!   recovers a [`Scene`](hexmass_geometry::Scene) the validator accepts.
//! - **SVG**: [`render_plan_svg`] draws the plan outlines in feet with
//!   round-trip coordinates; [`read_svg_paths`] parses them back.
//!
//! Neither writer mutates the scene, and output bytes depend only on the
//! scene contents.
//!
//! ```rust,no_run
//! use hexmass_core::{generate_plan, GeneratorConfig};
//! use hexmass_export::{render_plan_svg, write_glb, SvgOptions};
//! use hexmass_geometry::build_scene;
//!
//! let config = GeneratorConfig::default();
//! let plan = generate_plan(&config).unwrap();
//! let scene = build_scene(&plan, &config).unwrap();
//! let glb = write_glb(&scene).unwrap();
//! let svg = render_plan_svg(&plan, Some(&scene), &SvgOptions::default());
//! ```

pub mod error;
pub mod glb;
pub mod gltf;
pub mod svg;
pub mod svg_reader;

pub use error::{ExportError, Result};
pub use glb::{read_glb, read_glb_file, write_glb, write_glb_file, ANCHOR_ATTRIBUTE, ROOT_NODE};
pub use svg::{render_plan_svg, write_svg_file, SvgOptions};
pub use svg_reader::{read_svg_paths, SvgPath};
