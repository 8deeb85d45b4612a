// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Artifact-level tests: determinism and read-back of GLB and SVG output.

use hexmass_core::{generate_plan, CourtyardMode, GeneratorConfig, Plan};
use hexmass_export::{read_glb, read_svg_paths, render_plan_svg, write_glb, SvgOptions};
use hexmass_geometry::{build_scene, Scene};
use hexmass_validation::{validate, validate_plan};

fn generate(config: &GeneratorConfig) -> (Plan, Scene) {
    let plan = generate_plan(config).unwrap();
    let scene = build_scene(&plan, config).unwrap();
    (plan, scene)
}

#[test]
fn test_glb_is_byte_identical_across_runs() {
    let config = GeneratorConfig::default();
    let (_, first) = generate(&config);
    let (_, second) = generate(&config);
    assert_eq!(write_glb(&first).unwrap(), write_glb(&second).unwrap());
}

#[test]
fn test_glb_read_back_validates_clean() {
    let config = GeneratorConfig::default();
    let (_, scene) = generate(&config);
    let restored = read_glb(&write_glb(&scene).unwrap()).unwrap();
    assert_eq!(restored.volumes().len(), scene.volumes().len());

    let report = validate(&restored);
    assert!(report.is_clean(), "{}", report);
}

#[test]
fn test_courtyard_glb_read_back_validates_clean() {
    let config = GeneratorConfig {
        courtyard_enabled: true,
        courtyard_mode: CourtyardMode::ExteriorHex,
        ..GeneratorConfig::default()
    };
    let (_, scene) = generate(&config);
    let restored = read_glb(&write_glb(&scene).unwrap()).unwrap();
    let report = validate(&restored);
    assert!(report.is_clean(), "{}", report);
}

#[test]
fn test_svg_round_trip_recovers_outlines() {
    let config = GeneratorConfig::default();
    let (plan, scene) = generate(&config);
    let svg = render_plan_svg(&plan, Some(&scene), &SvgOptions::default());
    let paths = read_svg_paths(&svg).unwrap();
    let tolerance = config.coordinate_tolerance;

    for (name, polygon) in plan.outlines() {
        let path = paths
            .iter()
            .find(|p| p.id == name)
            .unwrap_or_else(|| panic!("no path for {}", name));
        assert_eq!(path.rings.len(), 1);
        let ring = &path.rings[0];
        assert_eq!(ring.len(), polygon.len(), "{}", name);
        for (a, b) in ring.iter().zip(polygon.points()) {
            assert!((a - b).norm() <= tolerance, "{}: {} vs {}", name, a, b);
        }
    }

    let driveway = paths
        .iter()
        .find(|p| p.id == "footprint-driveway_ramp")
        .expect("driveway footprint drawn");
    assert_eq!(driveway.class.as_deref(), Some("footprint"));
}

#[test]
fn test_plan_report_survives_json() {
    let config = GeneratorConfig::default();
    let (plan, scene) = generate(&config);
    let report = validate(&scene).merge(validate_plan(&plan, &config));
    let json = report.to_json().unwrap();
    let parsed = hexmass_validation::ValidationReport::from_json(&json).unwrap();
    assert_eq!(parsed.checks.len(), report.checks.len());
    assert!(parsed.is_clean());
}
