// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Whole-pipeline validation scenarios.

use hexmass_core::{generate_plan, CourtyardMode, GeneratorConfig};
use hexmass_geometry::build_scene;
use hexmass_validation::{validate, validate_plan, ValidationReport};

fn run(config: &GeneratorConfig) -> ValidationReport {
    let plan = generate_plan(config).unwrap();
    let scene = build_scene(&plan, config).unwrap();
    validate(&scene).merge(validate_plan(&plan, config))
}

#[test]
fn test_default_model_is_clean() {
    let config = GeneratorConfig::default();
    let report = run(&config);
    assert!(report.is_clean(), "{}", report);

    let sides = &report.checks["equal_edges.atrium_sides"];
    assert!(sides.measured <= 1e-6);
    assert!(report.checks["plan.hexagon_sides"].passed);
    assert!(report.checks.contains_key("elevation_stack"));
    assert!(report.areas["atrium"] > 0.0);
}

#[test]
fn test_flat_terrain_has_no_stack_defects() {
    let config = GeneratorConfig {
        terrain_drop: 0.0,
        ..GeneratorConfig::default()
    };
    let report = run(&config);
    assert!(report.checks["elevation_stack"].passed, "{}", report);
    assert!(report.checks["stack_continuity"].passed, "{}", report);
    assert!(report.is_clean(), "{}", report);
}

#[test]
fn test_exterior_courtyard_shares_one_atrium_edge() {
    let config = GeneratorConfig {
        courtyard_enabled: true,
        courtyard_mode: CourtyardMode::ExteriorHex,
        ..GeneratorConfig::default()
    };
    let report = run(&config);
    assert!(report.is_clean(), "{}", report);

    let shared = &report.checks["plan.courtyard_shared_edges"];
    assert_eq!(shared.measured, 1.0);
    let edge = report
        .checks
        .iter()
        .find(|(name, _)| {
            name.starts_with("shared_boundary.atrium_floor#4~courtyard_floor#")
        })
        .map(|(_, check)| check)
        .unwrap();
    assert_eq!(edge.measured, 0.0);
}

#[test]
fn test_interior_courtyard_is_clean() {
    let config = GeneratorConfig {
        courtyard_enabled: true,
        courtyard_mode: CourtyardMode::InteriorVoid,
        ..GeneratorConfig::default()
    };
    let report = run(&config);
    assert!(report.is_clean(), "{}", report);
}

#[test]
fn test_exploded_model_is_clean() {
    let config = GeneratorConfig {
        explosion_gap: 2.0,
        ..GeneratorConfig::default()
    };
    let report = run(&config);
    assert!(report.is_clean(), "{}", report);
}
