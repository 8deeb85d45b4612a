// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Plan-level checks and room areas

use crate::report::{CheckResult, Offender, ValidationReport};
use hexmass_core::{Courtyard, GeneratorConfig, Plan, WingId};
use hexmass_core::plan::direction;
use hexmass_geometry::bool2d::{clip_half_plane, compute_signed_area};
use hexmass_geometry::Point2;

/// Check the 2D plan against its parameters and report plan areas.
pub fn validate_plan(plan: &Plan, config: &GeneratorConfig) -> ValidationReport {
    let tolerances = config.tolerances();
    let s = plan.side_length;
    let mut report = ValidationReport::default();

    let mut sides = CheckResult::new(tolerances.edge_length);
    for i in 0..plan.atrium.len() {
        if let Some(len) = plan.atrium.edge_length(i) {
            sides.measure(
                vec![format!("atrium#{}", i)],
                (len - s).abs(),
                format!("length {:.6}", len),
            );
        }
    }
    report.insert("plan.hexagon_sides", sides);

    let mut extensions = CheckResult::new(tolerances.edge_length);
    for wing in &plan.wings {
        for edge in [0, 1, 3] {
            if let Some(len) = wing.polygon.edge_length(edge) {
                extensions.measure(
                    vec![format!("{}#{}", wing.id.name(), edge)],
                    (len - s).abs(),
                    format!("length {:.6}", len),
                );
            }
        }
    }
    report.insert("plan.wing_extensions", extensions);

    let mut contains = CheckResult::new(0.0);
    for (i, p) in plan.atrium.points().iter().enumerate() {
        if !plan.triangle.covers(p, tolerances.coordinate) {
            contains.fail(Offender::new(
                vec![format!("atrium/vertex{}", i)],
                1.0,
                format!("({:.3}, {:.3}) outside the master triangle", p.x, p.y),
            ));
        }
    }
    contains.measured = contains.offenders.len() as f64;
    report.insert("plan.triangle_contains_atrium", contains);

    if let Some(courtyard) = &plan.courtyard {
        check_courtyard(plan, courtyard, config, &mut report);
    }

    plan_areas(plan, &mut report);
    report
}

fn check_courtyard(
    plan: &Plan,
    courtyard: &Courtyard,
    config: &GeneratorConfig,
    report: &mut ValidationReport,
) {
    let tolerances = config.tolerances();
    let polygon = courtyard.polygon();
    match courtyard {
        Courtyard::ExteriorHex { .. } => {
            let shared: Vec<(usize, usize)> = (0..polygon.len())
                .filter_map(|i| {
                    let (a, b) = polygon.edge(i)?;
                    plan.atrium
                        .find_edge(&a, &b, tolerances.coordinate)
                        .map(|j| (i, j))
                })
                .collect();
            let mut check = CheckResult::new(0.0);
            check.measured = shared.len() as f64;
            if shared.len() != 1 {
                check.fail(Offender::new(
                    vec!["courtyard".to_string(), "atrium".to_string()],
                    shared.len() as f64,
                    format!("{} full edges shared, expected exactly one", shared.len()),
                ));
            }
            report.insert("plan.courtyard_shared_edges", check);

            let mut area = CheckResult::new(tolerances.area);
            area.measure(
                vec!["courtyard".to_string()],
                (polygon.area() - plan.atrium.area()).abs(),
                format!("area {:.3}, atrium {:.3}", polygon.area(), plan.atrium.area()),
            );
            report.insert("plan.courtyard_area", area);
        }
        Courtyard::InteriorVoid { wing, .. } => {
            // The void is the wing scaled about its centroid.
            let host = plan.wing(*wing).map(|w| w.polygon.area()).unwrap_or(0.0);
            let ratio = config.courtyard_void_ratio;
            let expected = host * ratio * ratio;
            let mut area = CheckResult::new(tolerances.area);
            area.measure(
                vec!["courtyard".to_string(), wing.name().to_string()],
                (polygon.area() - expected).abs(),
                format!(
                    "area {:.3}, expected {:.3} of wing {:.3}",
                    polygon.area(),
                    expected,
                    host
                ),
            );
            report.insert("plan.courtyard_area", area);
        }
    }
}

/// Outline areas plus the three master rooms: the triangle floor minus the
/// atrium, split into 120° sectors centred on the wings.
fn plan_areas(plan: &Plan, report: &mut ValidationReport) {
    let areas = &mut report.areas;
    areas.insert("atrium".into(), plan.atrium.area());
    let mut total = 0.0;
    for wing in &plan.wings {
        let area = wing.polygon.area();
        total += area;
        areas.insert(wing.id.name().into(), area);
    }
    areas.insert("wings_total".into(), total);
    areas.insert("master_triangle".into(), plan.triangle.area());
    if let Some(courtyard) = &plan.courtyard {
        areas.insert("courtyard".into(), courtyard.polygon().area());
    }
    if let Some(motorcourt) = &plan.motorcourt {
        areas.insert("motorcourt".into(), motorcourt.area());
    }
    for court in &plan.side_courtyards {
        areas.insert(court.name.into(), court.polygon.area());
    }

    // Each sector is a 120° wedge from the atrium centre; the atrium lies
    // inside the triangle, so a room is the triangle's share of the wedge
    // less the atrium's.
    let origin = Point2::origin();
    let wedge_area = |ring: &[Point2<f64>], centre: f64| {
        let half = clip_half_plane(ring, &origin, &direction(centre - 60.0));
        compute_signed_area(&clip_half_plane(&half, &origin, &-direction(centre + 60.0)))
    };
    for id in WingId::ALL {
        let centre = 60.0 * id.hex_edge() as f64 + 30.0;
        areas.insert(
            format!("master_room_{}", id.name().trim_start_matches("wing_")),
            wedge_area(plan.triangle.points(), centre) - wedge_area(plan.atrium.points(), centre),
        );
    }
}
