// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end checks of extrusion, shared-edge resolution and winding
//! correction on generated plans.

use hexmass_core::{generate_plan, CourtyardMode, GeneratorConfig, Tolerances, WingId};
use hexmass_geometry::{
    build_scene, correct_normals, extrude_volume, resolve_shared_edges, satisfies_rule, EdgeRef,
    Footprint, Material, Point2, SharedBoundary, Volume, VolumeSpec,
};
use proptest::prelude::*;
use std::collections::HashMap;

fn exterior_courtyard() -> GeneratorConfig {
    GeneratorConfig {
        courtyard_enabled: true,
        courtyard_mode: CourtyardMode::ExteriorHex,
        ..GeneratorConfig::default()
    }
}

/// Undirected mesh edges of a volume keyed by rounded end positions, with
/// the number of faces using each.
fn edge_uses(volume: &Volume) -> HashMap<[(i64, i64, i64); 2], usize> {
    let key = |i: u32| {
        let v = volume.vertices()[i as usize];
        let q = |x: f64| (x * 1e6).round() as i64;
        (q(v.x), q(v.y), q(v.z))
    };
    let mut uses = HashMap::new();
    for face in volume.faces() {
        let n = face.indices.len();
        for k in 0..n {
            let (a, b) = (key(face.indices[k]), key(face.indices[(k + 1) % n]));
            let edge = if a <= b { [a, b] } else { [b, a] };
            *uses.entry(edge).or_insert(0) += 1;
        }
    }
    uses
}

/// Atrium floor and front wing foundation, with the wing's inner corners
/// pushed by the given offsets.
fn atrium_and_wing(dx0: f64, dy0: f64, dx1: f64, dy1: f64) -> Vec<Volume> {
    let config = GeneratorConfig::default();
    let plan = generate_plan(&config).unwrap();
    let tolerances = config.tolerances();

    let atrium = VolumeSpec::slab(
        "atrium_floor",
        "atrium",
        Footprint::from_polygon(&plan.atrium),
        -2.0,
        -1.0,
        Material::Marble,
    );
    let mut ring = plan.wing(WingId::A).unwrap().polygon.points().to_vec();
    ring[0].x += dx0;
    ring[0].y += dy0;
    ring[1].x += dx1;
    ring[1].y += dy1;
    let wing = VolumeSpec::slab(
        "wing_a_foundation",
        "wing_a",
        Footprint::new(ring, Vec::new()),
        -2.0,
        1.0,
        Material::Concrete,
    );
    vec![
        extrude_volume(&atrium, &tolerances).unwrap(),
        extrude_volume(&wing, &tolerances).unwrap(),
    ]
}

fn shared_edge() -> Vec<SharedBoundary> {
    vec![SharedBoundary::new(
        EdgeRef::new("atrium_floor", WingId::A.hex_edge()),
        EdgeRef::new("wing_a_foundation", 0),
    )]
}

fn deviation(volumes: &[Volume]) -> f64 {
    let (a0, a1) = volumes[0].footprint().edge(WingId::A.hex_edge()).unwrap();
    let (b0, b1) = volumes[1].footprint().edge(0).unwrap();
    (a0 - b1).norm().max((a1 - b0).norm())
}

#[test]
fn test_perturbed_shared_edge_snaps_exactly() {
    let mut volumes = atrium_and_wing(1e-4, -5e-5, 1e-4, -5e-5);
    assert!(deviation(&volumes) > 0.0);

    let stats =
        resolve_shared_edges(&mut volumes, &shared_edge(), &Tolerances::default()).unwrap();
    assert_eq!(stats.boundaries, 1);
    assert_eq!(deviation(&volumes), 0.0);

    // The atrium side is authoritative and stays on the hexagon.
    let plan = generate_plan(&GeneratorConfig::default()).unwrap();
    let (a0, a1) = plan.atrium.edge(WingId::A.hex_edge()).unwrap();
    assert_eq!(volumes[0].footprint().edge(WingId::A.hex_edge()).unwrap(), (a0, a1));

    // Extruded vertices followed their footprint corners.
    let moved = volumes[1]
        .vertices()
        .iter()
        .filter(|v| Point2::new(v.x, v.y) == a0 || Point2::new(v.x, v.y) == a1)
        .count();
    assert_eq!(moved, 4);
}

#[test]
fn test_default_scene_faces_satisfy_rules() {
    let config = GeneratorConfig::default();
    let plan = generate_plan(&config).unwrap();
    let scene = build_scene(&plan, &config).unwrap();
    for volume in scene.volumes() {
        for face in volume.faces() {
            assert!(satisfies_rule(volume, face), "{} has a misoriented face", volume.name());
        }
    }
}

#[test]
fn test_flipped_face_is_corrected() {
    let config = GeneratorConfig::default();
    let plan = generate_plan(&config).unwrap();
    let mut scene = build_scene(&plan, &config).unwrap();

    let index = scene.volume_index("atrium_facade").unwrap();
    let original = &scene.volumes()[index];
    let mut faces = original.faces().to_vec();
    faces[0].reverse();
    let broken = Volume::new(
        original.name(),
        original.outline(),
        original.normal_rule(),
        original.footprint().clone(),
        original.vertices().to_vec(),
        faces,
    );
    assert!(!satisfies_rule(&broken, &broken.faces()[0]));
    scene.replace_volume(index, broken);

    let stats = correct_normals(&mut scene);
    assert_eq!(stats.flipped, 1);
    let fixed = &scene.volumes()[index];
    assert!(fixed.faces().iter().all(|f| satisfies_rule(fixed, f)));
}

#[test]
fn test_flat_terrain_builds() {
    let config = GeneratorConfig {
        terrain_drop: 0.0,
        ..GeneratorConfig::default()
    };
    let plan = generate_plan(&config).unwrap();
    let scene = build_scene(&plan, &config).unwrap();
    let terrain = scene.volume("terrain").unwrap();
    let (_, top) = terrain.z_range();
    assert_eq!(top, 13.0);
}

#[test]
fn test_exploded_scene_builds_light_wells() {
    let config = GeneratorConfig {
        explosion_gap: 3.0,
        ..GeneratorConfig::default()
    };
    let plan = generate_plan(&config).unwrap();
    let scene = build_scene(&plan, &config).unwrap();
    for id in WingId::ALL {
        assert!(scene.volume(id.light_well_name()).is_some());
    }
    let atrium_to_wells = scene
        .contracts()
        .shared_boundaries
        .iter()
        .filter(|b| b.a.volume == "atrium_floor" && b.b.volume.starts_with("light_well"))
        .count();
    assert_eq!(atrium_to_wells, 3);
}

#[test]
fn test_terrain_cut_is_closed() {
    for config in [GeneratorConfig::default(), exterior_courtyard()] {
        let plan = generate_plan(&config).unwrap();
        let scene = build_scene(&plan, &config).unwrap();
        let terrain = scene.volume("terrain").unwrap();
        let open: Vec<_> = edge_uses(terrain)
            .into_iter()
            .filter(|(_, uses)| *uses != 2)
            .collect();
        assert!(open.is_empty(), "{} unpaired terrain edges: {:?}", open.len(), &open[..open.len().min(4)]);
    }
}

#[test]
fn test_terrain_corners_all_used() {
    let config = exterior_courtyard();
    let plan = generate_plan(&config).unwrap();
    let scene = build_scene(&plan, &config).unwrap();
    let terrain = scene.volume("terrain").unwrap();
    let mut used = vec![false; terrain.vertices().len()];
    for face in terrain.faces() {
        for &i in &face.indices {
            used[i as usize] = true;
        }
    }
    // Bottom and top copies of every footprint corner.
    let corners = terrain.footprint().edge_count();
    for c in 0..corners {
        assert!(used[c] && used[corners + c], "corner {} unused", c);
    }
}

proptest! {
    #[test]
    fn resolution_never_increases_deviation(
        dx0 in -4e-4f64..4e-4,
        dy0 in -4e-4f64..4e-4,
        dx1 in -4e-4f64..4e-4,
        dy1 in -4e-4f64..4e-4,
    ) {
        let mut volumes = atrium_and_wing(dx0, dy0, dx1, dy1);
        let before = deviation(&volumes);
        let tolerances = Tolerances { edge_length: 1e-2, ..Tolerances::default() };
        resolve_shared_edges(&mut volumes, &shared_edge(), &tolerances).unwrap();
        let after = deviation(&volumes);
        prop_assert!(after <= before);
        prop_assert_eq!(after, 0.0);
    }
}
