// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property tests for plan generation over the valid parameter space.

use hexmass_core::{generate_plan, GeneratorConfig, WingId};
use proptest::prelude::*;

fn config(side: f64, clearance_ratio: f64, gap: f64) -> GeneratorConfig {
    // Clearance between the covering minimum and the back-corner maximum.
    let apothem = side * 3f64.sqrt() / 2.0;
    let min_clearance = side - apothem;
    let max_clearance = 2.0 * side - apothem;
    GeneratorConfig {
        side_length: side,
        clearance_distance: min_clearance + (max_clearance - min_clearance) * clearance_ratio,
        explosion_gap: gap,
        driveway_width: side * 0.5,
        ..GeneratorConfig::default()
    }
}

proptest! {
    #[test]
    fn hexagon_edges_equal_side_length(
        side in 5.0f64..80.0,
        ratio in 0.01f64..0.99,
        gap in 0.0f64..6.0,
    ) {
        let cfg = config(side, ratio, gap);
        let plan = generate_plan(&cfg).unwrap();
        let tolerance = cfg.edge_length_tolerance;
        for i in 0..6 {
            let len = plan.atrium.edge_length(i).unwrap();
            prop_assert!((len - side).abs() <= tolerance, "edge {} has length {}", i, len);
        }
        for id in WingId::ALL {
            let wing = plan.wing(id).unwrap();
            for edge in [0, 1, 3] {
                let len = wing.polygon.edge_length(edge).unwrap();
                prop_assert!((len - side).abs() <= tolerance);
            }
        }
    }

    #[test]
    fn triangle_always_covers_atrium(side in 5.0f64..80.0, ratio in 0.01f64..0.99) {
        let plan = generate_plan(&config(side, ratio, 0.0)).unwrap();
        for p in plan.atrium.points() {
            prop_assert!(plan.triangle.contains(p));
        }
    }
}
