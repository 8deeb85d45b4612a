// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # hexmass core
//!
//! Configuration, error taxonomy and the plan generator for parametric
//! "exploded hexagon" massing models.
//!
//! ## Overview
//!
//! - **Configuration**: [`GeneratorConfig`] is a single immutable value,
//!   loaded from JSON with unknown keys rejected, threaded through every stage
//! - **Polygons**: [`Polygon`] is validated on construction (simple,
//!   non-degenerate, counter-clockwise) and never mutated afterwards
//! - **Plan**: [`generate_plan`] lays out the atrium hexagon, the three wings,
//!   the master triangle and the optional courtyard in one shared frame
//!
//! ## Quick Start
//!
//! ```rust
//! use hexmass_core::{generate_plan, GeneratorConfig};
//!
//! let config = GeneratorConfig::from_json_str(r#"{"side_length": 23.0}"#).unwrap();
//! let plan = generate_plan(&config).unwrap();
//! assert_eq!(plan.atrium.len(), 6);
//! ```

pub mod config;
pub mod error;
pub mod plan;
pub mod polygon;

pub use config::{CourtyardMode, Elevations, GeneratorConfig, Tolerances};
pub use error::{Error, Result};
pub use plan::{
    adjacent_hexagon, generate_plan, hexagon, offset_edge, Courtyard, Plan, SideCourtyard, Wing,
    WingId, FRONT_EDGE, MOTORCOURT_MOUTH, SIDE_COURTYARDS,
};
pub use polygon::Polygon;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Vector2};
