// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene checks
//!
//! Every check scans the whole scene and records all offenders; nothing here
//! returns early on a failure.

use crate::report::{CheckResult, Offender, ValidationReport};
use hexmass_geometry::bool2d::intersection_area;
use hexmass_geometry::{satisfies_rule, EdgeRef, Point2, Scene, StackKind, Volume};
use rayon::prelude::*;

/// Run every scene check.
pub fn validate(scene: &Scene) -> ValidationReport {
    let mut report = ValidationReport::default();

    report.insert("contracts", check_contracts(scene));
    for (name, check) in check_equal_edges(scene) {
        report.insert(name, check);
    }
    for (name, check) in check_shared_boundaries(scene) {
        report.insert(name, check);
    }
    report.insert("degenerate_faces", check_degenerate_faces(scene));
    report.insert("normal_orientation", check_normals(scene));
    report.insert("elevation_stack", check_elevation_stack(scene));
    report.insert("stack_continuity", check_stack_continuity(scene));

    for volume in scene.volumes() {
        report
            .areas
            .insert(volume.name().to_string(), volume.footprint_area());
    }

    let failures = report.failures().len();
    tracing::info!(
        volumes = scene.volumes().len(),
        checks = report.checks.len(),
        failures = failures,
        "Validated scene"
    );
    report
}

/// Declarations that reference missing volumes or edges.
fn check_contracts(scene: &Scene) -> CheckResult {
    let mut check = CheckResult::new(0.0);
    let contracts = scene.contracts();

    let edges = contracts
        .shared_boundaries
        .iter()
        .flat_map(|b| [&b.a, &b.b])
        .chain(contracts.equal_edges.iter().flat_map(|g| g.edges.iter()));
    let mut unresolved = 0usize;
    for edge in edges {
        if let Err(e) = scene.edge(edge) {
            unresolved += 1;
            check.fail(Offender::new(vec![edge.to_string()], 1.0, e.to_string()));
        }
    }
    for stack in &contracts.stacks {
        for name in [&stack.lower, &stack.upper] {
            if scene.volume(name).is_none() {
                unresolved += 1;
                check.fail(Offender::new(vec![name.clone()], 1.0, "unknown volume in stack"));
            }
        }
    }
    check.measured = unresolved as f64;
    check
}

fn edge_length(scene: &Scene, edge: &EdgeRef) -> Option<f64> {
    scene.edge(edge).ok().map(|(a, b)| (b - a).norm())
}

fn check_equal_edges(scene: &Scene) -> Vec<(String, CheckResult)> {
    let tolerance = scene.tolerances().edge_length;
    scene
        .contracts()
        .equal_edges
        .iter()
        .map(|group| {
            let mut check = CheckResult::new(tolerance);
            let lengths: Vec<(&EdgeRef, f64)> = group
                .edges
                .iter()
                .filter_map(|e| edge_length(scene, e).map(|len| (e, len)))
                .collect();

            match group.expected {
                Some(expected) => {
                    for (edge, len) in &lengths {
                        check.measure(
                            vec![edge.to_string()],
                            (len - expected).abs(),
                            format!("length {:.6}, expected {:.6}", len, expected),
                        );
                    }
                }
                None => {
                    let min = lengths.iter().map(|(_, l)| *l).fold(f64::INFINITY, f64::min);
                    let max = lengths.iter().map(|(_, l)| *l).fold(f64::NEG_INFINITY, f64::max);
                    if lengths.len() > 1 {
                        let spread = max - min;
                        check.measured = spread;
                        if !(spread <= tolerance) {
                            for (edge, len) in &lengths {
                                check.fail(Offender::new(
                                    vec![edge.to_string()],
                                    len - min,
                                    format!("length {:.6}", len),
                                ));
                            }
                        }
                    }
                }
            }
            (format!("equal_edges.{}", group.name), check)
        })
        .collect()
}

/// Distance from `p` to the nearest vertex of `volume` in plan.
/// Plan distance from `p` to the closest vertex any face of `volume` uses.
///
/// Vertices no face references close no crack, so they are skipped.
fn nearest_vertex(volume: &Volume, p: &Point2<f64>) -> f64 {
    let vertices = volume.vertices();
    volume
        .faces()
        .iter()
        .flat_map(|f| f.indices.iter())
        .filter_map(|&i| vertices.get(i as usize))
        .map(|v| (Point2::new(v.x, v.y) - p).norm())
        .fold(f64::INFINITY, f64::min)
}

fn check_shared_boundaries(scene: &Scene) -> Vec<(String, CheckResult)> {
    let tolerance = scene.tolerances().coordinate;
    scene
        .contracts()
        .shared_boundaries
        .par_iter()
        .map(|boundary| {
            let mut check = CheckResult::new(tolerance);
            let entities = vec![boundary.a.to_string(), boundary.b.to_string()];
            let (Ok((a0, a1)), Ok((b0, b1))) = (scene.edge(&boundary.a), scene.edge(&boundary.b))
            else {
                // Reported under `contracts`.
                return (format!("shared_boundary.{}", boundary.label()), check);
            };

            let direct = (a0 - b0).norm().max((a1 - b1).norm());
            let reversed = (a0 - b1).norm().max((a1 - b0).norm());
            let endpoints = direct.min(reversed);
            let mid_a = Point2::from((a0.coords + a1.coords) * 0.5);
            let mid_b = Point2::from((b0.coords + b1.coords) * 0.5);
            let midpoint = (mid_a - mid_b).norm();
            check.measure(
                entities.clone(),
                endpoints.max(midpoint),
                format!("endpoint {:e}, midpoint {:e}", endpoints, midpoint),
            );

            if let (Some(va), Some(vb)) = (
                scene.volume(&boundary.a.volume),
                scene.volume(&boundary.b.volume),
            ) {
                for p in [a0, a1] {
                    let deviation = nearest_vertex(va, &p).max(nearest_vertex(vb, &p));
                    check.measure(
                        entities.clone(),
                        deviation,
                        format!("vertex near ({:.3}, {:.3})", p.x, p.y),
                    );
                }
            }
            (format!("shared_boundary.{}", boundary.label()), check)
        })
        .collect()
}

fn check_degenerate_faces(scene: &Scene) -> CheckResult {
    let tolerance = scene.tolerances().area;
    let per_volume: Vec<(f64, Vec<Offender>)> = scene
        .volumes()
        .par_iter()
        .map(|volume| {
            let mut smallest = f64::INFINITY;
            let mut offenders = Vec::new();
            for (i, face) in volume.faces().iter().enumerate() {
                let area = face.area(volume.vertices());
                smallest = smallest.min(area);
                if !(area >= tolerance) {
                    offenders.push(Offender::new(
                        vec![format!("{}/face{}", volume.name(), i)],
                        area,
                        format!("{} vertices", face.indices.len()),
                    ));
                }
            }
            (smallest, offenders)
        })
        .collect();

    let mut check = CheckResult::new(tolerance);
    let smallest = per_volume
        .iter()
        .map(|(s, _)| *s)
        .fold(f64::INFINITY, f64::min);
    check.measured = if smallest.is_finite() { smallest } else { 0.0 };
    for offender in per_volume.into_iter().flat_map(|(_, o)| o) {
        check.fail(offender);
    }
    check
}

fn check_normals(scene: &Scene) -> CheckResult {
    let per_volume: Vec<Vec<Offender>> = scene
        .volumes()
        .par_iter()
        .map(|volume| {
            volume
                .faces()
                .iter()
                .enumerate()
                .filter(|(_, face)| !face.outward || !satisfies_rule(volume, face))
                .map(|(i, face)| {
                    let detail = if face.outward {
                        format!("violates {:?} rule", volume.normal_rule())
                    } else {
                        "not verified".to_string()
                    };
                    Offender::new(
                        vec![format!("{}/face{}", volume.name(), i)],
                        hexmass_geometry::outward_alignment(volume, face),
                        detail,
                    )
                })
                .collect()
        })
        .collect();

    let mut check = CheckResult::new(0.0);
    for offender in per_volume.into_iter().flatten() {
        check.fail(offender);
    }
    check.measured = check.offenders.len() as f64;
    check
}

/// Volumes sharing z and plan area without a `Stacked` declaration.
fn check_elevation_stack(scene: &Scene) -> CheckResult {
    let z_tolerance = scene.tolerances().coordinate;
    let tolerance = scene.tolerances().area;
    let volumes = scene.volumes();
    let ranges: Vec<(f64, f64)> = volumes.iter().map(Volume::z_range).collect();

    let stacked = |a: &str, b: &str| {
        scene
            .contracts()
            .stacks
            .iter()
            .any(|s| s.kind == StackKind::Stacked && s.links(a, b))
    };

    let overlaps: Vec<Offender> = (0..volumes.len())
        .into_par_iter()
        .flat_map_iter(|i| {
            let mut found = Vec::new();
            for j in (i + 1)..volumes.len() {
                let overlap = ranges[i].1.min(ranges[j].1) - ranges[i].0.max(ranges[j].0);
                if overlap <= z_tolerance {
                    continue;
                }
                let (a, b) = (&volumes[i], &volumes[j]);
                if stacked(a.name(), b.name()) {
                    continue;
                }
                let area = intersection_area(a.footprint(), b.footprint());
                if area > tolerance {
                    found.push(Offender::new(
                        vec![a.name().to_string(), b.name().to_string()],
                        area,
                        format!("overlap {:.3} ft in z", overlap),
                    ));
                }
            }
            found
        })
        .collect();

    let mut check = CheckResult::new(tolerance);
    for offender in overlaps {
        check.measured = check.measured.max(offender.measured);
        check.fail(offender);
    }
    check
}

/// `Continuous` pairs whose boundary elevations differ.
fn check_stack_continuity(scene: &Scene) -> CheckResult {
    let mut check = CheckResult::new(scene.tolerances().coordinate);
    for stack in &scene.contracts().stacks {
        if stack.kind != StackKind::Continuous {
            continue;
        }
        let (Some(lower), Some(upper)) = (scene.volume(&stack.lower), scene.volume(&stack.upper))
        else {
            continue;
        };
        let top = lower.z_range().1;
        let bottom = upper.z_range().0;
        check.measure(
            vec![stack.lower.clone(), stack.upper.clone()],
            (bottom - top).abs(),
            format!("lower top {:.6}, upper bottom {:.6}", top, bottom),
        );
    }
    check
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexmass_core::Tolerances;
    use hexmass_geometry::{
        extrude_volume, EdgeRef, EqualEdgeGroup, Footprint, Material, SceneContracts,
        SharedBoundary, StackRelation, VolumeSpec,
    };

    fn square(x0: f64, y0: f64, side: f64) -> Footprint {
        Footprint::new(
            vec![
                Point2::new(x0, y0),
                Point2::new(x0 + side, y0),
                Point2::new(x0 + side, y0 + side),
                Point2::new(x0, y0 + side),
            ],
            Vec::new(),
        )
    }

    fn block(name: &str, footprint: Footprint, bottom: f64, top: f64) -> Volume {
        let spec = VolumeSpec::slab(name, name, footprint, bottom, top, Material::Concrete);
        let mut volume = extrude_volume(&spec, &Tolerances::default()).unwrap();
        hexmass_geometry::normals::correct_volume(&mut volume);
        volume
    }

    fn scene(volumes: Vec<Volume>, contracts: SceneContracts) -> Scene {
        Scene::new(Tolerances::default(), contracts, volumes)
    }

    #[test]
    fn test_overlap_reported_unless_stacked() {
        let volumes = vec![
            block("lower", square(0.0, 0.0, 10.0), 0.0, 5.0),
            block("upper", square(5.0, 5.0, 10.0), 4.0, 8.0),
        ];
        let report = validate(&scene(volumes.clone(), SceneContracts::default()));
        let check = &report.checks["elevation_stack"];
        assert!(!check.passed);
        assert!((check.offenders[0].measured - 25.0).abs() < 1e-6);

        let contracts = SceneContracts {
            stacks: vec![StackRelation::stacked("lower", "upper")],
            ..SceneContracts::default()
        };
        let report = validate(&scene(volumes, contracts));
        assert!(report.checks["elevation_stack"].passed);
    }

    #[test]
    fn test_continuity_gap_reported() {
        let volumes = vec![
            block("floor", square(0.0, 0.0, 10.0), 0.0, 1.0),
            block("walls", square(0.0, 0.0, 10.0), 1.5, 12.0),
        ];
        let contracts = SceneContracts {
            stacks: vec![StackRelation::continuous("floor", "walls")],
            ..SceneContracts::default()
        };
        let report = validate(&scene(volumes, contracts));
        let check = &report.checks["stack_continuity"];
        assert!(!check.passed);
        assert!((check.measured - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_shared_corner_needs_a_face() {
        let left = block("left", square(0.0, 0.0, 10.0), 0.0, 1.0);
        let right = block("right", square(10.0, 0.0, 10.0), 0.0, 1.0);
        let contracts = SceneContracts {
            shared_boundaries: vec![SharedBoundary::new(
                EdgeRef::new("left", 1),
                EdgeRef::new("right", 3),
            )],
            ..SceneContracts::default()
        };
        let label = "shared_boundary.left#1~right#3";
        let report = validate(&scene(vec![left.clone(), right.clone()], contracts.clone()));
        assert!(report.checks[label].passed, "{}", report);

        // Keep every vertex but drop the faces touching corner (10, 0) of
        // the right block, as a cap that lost a collinear corner would.
        let vertices = right.vertices().to_vec();
        let faces: Vec<_> = right
            .faces()
            .iter()
            .filter(|f| {
                f.indices.iter().all(|&i| {
                    let v = vertices[i as usize];
                    (v.x - 10.0).abs() > 1e-9 || v.y.abs() > 1e-9
                })
            })
            .cloned()
            .collect();
        assert!(faces.len() < right.faces().len());
        let orphaned = Volume::new(
            right.name(),
            right.outline(),
            right.normal_rule(),
            right.footprint().clone(),
            vertices,
            faces,
        );
        let report = validate(&scene(vec![left, orphaned], contracts));
        let check = &report.checks[label];
        assert!(!check.passed);
        assert!(check.measured > 1.0);
    }

    #[test]
    fn test_collects_every_failure() {
        let volumes = vec![
            block("left", square(0.0, 0.0, 10.0), 0.0, 1.0),
            block("right", square(10.25, 0.0, 10.5), 0.0, 1.0),
        ];
        let contracts = SceneContracts {
            shared_boundaries: vec![SharedBoundary::new(
                EdgeRef::new("left", 1),
                EdgeRef::new("right", 3),
            )],
            equal_edges: vec![EqualEdgeGroup {
                name: "sides".into(),
                expected: None,
                edges: vec![
                    EdgeRef::new("left", 0),
                    EdgeRef::new("right", 0),
                    EdgeRef::new("ghost", 0),
                ],
            }],
            stacks: Vec::new(),
        };
        let report = validate(&scene(volumes, contracts));
        assert_eq!(
            report.failures(),
            vec!["contracts", "equal_edges.sides", "shared_boundary.left#1~right#3"]
        );
        let sides = &report.checks["equal_edges.sides"];
        assert!((sides.measured - 0.5).abs() < 1e-12);
        assert!(report.checks["normal_orientation"].passed);
        assert_eq!(report.areas["right"], 10.5 * 10.5);
    }
}
