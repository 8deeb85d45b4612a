// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! hexmass validation
//!
//! Read-only checks over a finished [`Scene`](hexmass_geometry::Scene) and
//! its plan. Every check runs to completion, so one report lists every
//! defect of a generation run.
//!
//! ```rust,no_run
//! use hexmass_core::{generate_plan, GeneratorConfig};
//! use hexmass_geometry::build_scene;
//! use hexmass_validation::{validate, validate_plan};
//!
//! let config = GeneratorConfig::default();
//! let plan = generate_plan(&config).unwrap();
//! let scene = build_scene(&plan, &config).unwrap();
//! let report = validate(&scene).merge(validate_plan(&plan, &config));
//! println!("{}", report);
//! ```

pub mod checks;
pub mod plan_checks;
pub mod report;

pub use checks::validate;
pub use plan_checks::validate_plan;
pub use report::{CheckResult, Offender, ValidationReport};
