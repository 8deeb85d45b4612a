// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Driveway: ramp, level crest and a quarter-turn to the left
//!
//! Every segment polygon starts with its entry edge (edge 0) and runs down
//! the right side, across the exit edge and back up the left side, so the
//! exit edge of a segment with `k` right-side edges is edge `k + 1`.
//! The retaining walls follow the union of the three segments in the same
//! order, standing on the driving surface and rising to the terrain.

use crate::elevation::{Elevation, GradedSurface};
use crate::extrusion::{Caps, EdgeTable, Shape, VolumeSpec};
use crate::footprint::Footprint;
use crate::scene::{
    EdgeRef, EdgeRole, EqualEdgeGroup, Material, NormalRule, SharedBoundary, StackRelation,
};
use hexmass_core::{Courtyard, Error, GeneratorConfig, Plan, Polygon, Result, MOTORCOURT_MOUTH};
use nalgebra::{Point2, Vector2};
use std::f64::consts::FRAC_PI_2;

pub const RAMP: &str = "driveway_ramp";
pub const CREST: &str = "driveway_crest";
pub const CURVE: &str = "driveway_curve";
pub const WALLS: &str = "driveway_walls";

/// Arc segments of the quarter turn.
const CURVE_SEGMENTS: usize = 24;

/// Smallest inner turning radius.
const MIN_INNER_RADIUS: f64 = 0.5;

/// The three driveway volumes and their seams.
#[derive(Debug, Clone)]
pub struct DrivewayModel {
    pub specs: Vec<VolumeSpec>,
    pub boundaries: Vec<SharedBoundary>,
    pub width_group: EqualEdgeGroup,
    /// Driving surface shared by all segments
    pub surface: GradedSurface,
    /// Retaining walls holding the terrain back from the driving surface.
    pub walls: VolumeSpec,
    /// The walls stand on every segment.
    pub stacks: Vec<StackRelation>,
}

impl DrivewayModel {
    pub fn polygons(&self) -> impl Iterator<Item = (&str, &[Point2<f64>])> {
        self.specs
            .iter()
            .map(|s| (s.name.as_str(), s.footprint.outer.as_slice()))
    }
}

/// Lay out the driveway against the front of the building.
pub fn build_driveway(
    plan: &Plan,
    config: &GeneratorConfig,
    terrain: &Elevation,
) -> Result<DrivewayModel> {
    let w = config.driveway_width;
    let ramp_length = config.driveway_length;
    let flat = config.driveway_flat_length;
    let lower = config.lower_ground;

    let (a, b, u) = start_edge(plan)?;
    let start = Point2::from((a.coords + b.coords) * 0.5);
    let n = Vector2::new(-u.y, u.x);
    let half = n * (w * 0.5);

    // Ramp and crest quads. A mouth exactly one driveway wide is reused
    // corner for corner.
    let (l0, r0) = if ((b - a).norm() - w).abs() <= config.coordinate_tolerance {
        (b, a)
    } else {
        (start + half, start - half)
    };
    let l1 = l0 + u * ramp_length;
    let r1 = r0 + u * ramp_length;
    let l2 = l1 + u * flat;
    let r2 = r1 + u * flat;
    let ramp = Polygon::new(RAMP, vec![l0, r0, r1, l1])?;
    let crest = Polygon::new(CREST, vec![l1, r1, r2, l2])?;

    // Quarter turn about a centre to the left of the crest end.
    let radius = 2.0 * config.driveway_curve_length / std::f64::consts::PI;
    let inner = radius - w * 0.5;
    if inner < MIN_INNER_RADIUS {
        return Err(Error::invalid_parameter(
            "driveway_curve_length",
            config.driveway_curve_length,
            format!(
                "turning radius {:.3} leaves an inner radius of {:.3} for width {}",
                radius, inner, w
            ),
        ));
    }
    let crest_end = start + u * (ramp_length + flat);
    let centre = crest_end + n * radius;
    let arc = |r: f64, phi: f64| centre + (-n * phi.cos() + u * phi.sin()) * r;

    let outer: Vec<Point2<f64>> = (1..=CURVE_SEGMENTS)
        .map(|k| arc(radius + w * 0.5, FRAC_PI_2 * k as f64 / CURVE_SEGMENTS as f64))
        .collect();
    let inner_arc: Vec<Point2<f64>> = (1..=CURVE_SEGMENTS)
        .rev()
        .map(|k| arc(inner, FRAC_PI_2 * k as f64 / CURVE_SEGMENTS as f64))
        .collect();
    let mut curve = vec![l2, r2];
    curve.extend(&outer);
    curve.extend(&inner_arc);
    let curve = Polygon::new(CURVE, curve)?;

    let mut union = vec![l0, r0, r1, r2];
    union.extend(&outer);
    let walls_exit = union.len() - 1;
    union.extend(&inner_arc);
    union.extend([l2, l1]);
    let union = Polygon::new(WALLS, union)?;

    // One surface along the heading: ramp up to the terrain, then descend
    // gently across the crest and the turn.
    let z1 = terrain.at(&(start + u * ramp_length));
    let grade = (z1 - lower).abs() / ramp_length;
    if grade > config.driveway_max_grade {
        return Err(Error::invalid_parameter(
            "driveway_length",
            ramp_length,
            format!(
                "ramp grade {:.4} exceeds the maximum of {}",
                grade, config.driveway_max_grade
            ),
        ));
    }
    let run = flat + radius + w;
    let surface = GradedSurface::new(
        start,
        u,
        vec![
            (0.0, lower),
            (ramp_length, z1),
            (ramp_length + run, z1 - config.driveway_approach_slope * run),
        ],
    )?;
    let top = Elevation::Graded(surface.clone());
    let bottom = top.offset(-config.slab_thickness);

    let curve_exit = CURVE_SEGMENTS + 1;
    let segment = |name: &str, polygon: &Polygon, exit: usize, open_exit: bool| {
        let mut edges = EdgeTable::walls(Material::Concrete).with(0, EdgeRole::Open);
        if open_exit {
            edges = edges.with(exit, EdgeRole::Open);
        }
        VolumeSpec {
            name: name.to_string(),
            outline: name.to_string(),
            footprint: Footprint::from_polygon(polygon),
            bottom: bottom.clone(),
            top: top.clone(),
            shape: Shape::Prism,
            caps: Caps::both(Material::Concrete),
            edges,
            normal_rule: NormalRule::Outward,
        }
    };
    let specs = vec![
        segment(RAMP, &ramp, 2, true),
        segment(CREST, &crest, 2, true),
        segment(CURVE, &curve, curve_exit, false),
    ];

    let walls = VolumeSpec {
        name: WALLS.to_string(),
        outline: WALLS.to_string(),
        footprint: Footprint::from_polygon(&union),
        bottom: top.clone(),
        top: terrain.clone(),
        shape: Shape::Prism,
        caps: Caps::none(),
        edges: EdgeTable::walls(Material::Concrete)
            .with(0, EdgeRole::Open)
            .with(walls_exit, EdgeRole::Open),
        normal_rule: NormalRule::Outward,
    };
    let stacks = [RAMP, CREST, CURVE]
        .iter()
        .map(|segment| StackRelation::stacked(*segment, WALLS))
        .collect();

    let boundaries = vec![
        SharedBoundary::new(EdgeRef::new(RAMP, 2), EdgeRef::new(CREST, 0)),
        SharedBoundary::new(EdgeRef::new(CREST, 2), EdgeRef::new(CURVE, 0)),
    ];
    let width_group = EqualEdgeGroup {
        name: "driveway_width".to_string(),
        expected: Some(w),
        edges: vec![
            EdgeRef::new(RAMP, 0),
            EdgeRef::new(RAMP, 2),
            EdgeRef::new(CREST, 0),
            EdgeRef::new(CREST, 2),
            EdgeRef::new(CURVE, 0),
            EdgeRef::new(CURVE, curve_exit),
        ],
    };

    tracing::debug!(
        grade = grade,
        radius = radius,
        crest_height = z1,
        "Laid out driveway"
    );

    Ok(DrivewayModel {
        specs,
        boundaries,
        width_group,
        surface,
        walls,
        stacks,
    })
}

/// Front edge the driveway leaves from and its outward direction.
fn start_edge(plan: &Plan) -> Result<(Point2<f64>, Point2<f64>, Vector2<f64>)> {
    let (polygon, edge) = match (&plan.motorcourt, &plan.courtyard) {
        (Some(motorcourt), _) => (motorcourt, MOTORCOURT_MOUTH),
        (None, Some(Courtyard::ExteriorHex { edge: 4, polygon })) => (polygon, 4),
        _ => (&plan.atrium, 4),
    };
    let (a, b) = polygon
        .edge(edge)
        .ok_or_else(|| Error::topology("driveway", "front edge missing"))?;
    let u = polygon
        .edge_outward_normal(edge)
        .ok_or_else(|| Error::topology("driveway", "front edge has zero length"))?;
    Ok((a, b, u))
}
