// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sloped terrain around the building
//!
//! The terrain is a closed solid: the cut around the building and driveway
//! carries its own ground faces, so the slab stays watertight whatever is
//! set into the hole.

use crate::elevation::{Elevation, GradedSurface};
use crate::extrusion::{Caps, EdgeTable, Shape, VolumeSpec};
use crate::footprint::Footprint;
use crate::outline::{union_outline, EdgeSource, Tile};
use crate::scene::{EdgeRef, Material, NormalRule, SharedBoundary};
use hexmass_core::{Error, GeneratorConfig, Plan, Result, WingId};
use nalgebra::{Point2, Vector2};

pub const TERRAIN: &str = "terrain";

/// Terrain square side as a multiple of the building extent.
const EXTENT_FACTOR: f64 = 6.0;

/// Terrain volume plus the boundaries it shares with the tiles cut from it.
#[derive(Debug, Clone)]
pub struct TerrainModel {
    pub spec: VolumeSpec,
    pub boundaries: Vec<SharedBoundary>,
}

/// Ground surface: level with the upper ground in front of the back edge of
/// the front wings, falling by `terrain_drop` to the middle of the back
/// wing's outer edge, level again beyond.
pub fn terrain_surface(plan: &Plan, config: &GeneratorConfig) -> Result<Elevation> {
    let upper = config.elevations().upper_ground;
    if config.terrain_drop == 0.0 {
        return Ok(Elevation::Flat(upper));
    }

    let y_break = [WingId::A, WingId::B]
        .iter()
        .filter_map(|&id| plan.wing(id))
        .flat_map(|w| w.polygon.points().iter().map(|p| p.y))
        .fold(f64::NEG_INFINITY, f64::max);
    let back = plan
        .wing(WingId::C)
        .and_then(|w| w.polygon.edge(2))
        .ok_or_else(|| Error::topology(TERRAIN, "back wing outer edge missing"))?;
    let y_low = (back.0.y + back.1.y) * 0.5;
    if !(y_low > y_break) {
        return Err(Error::topology(
            TERRAIN,
            format!(
                "slope start {:.3} is not in front of slope end {:.3}",
                y_break, y_low
            ),
        ));
    }

    let surface = GradedSurface::new(
        Point2::origin(),
        Vector2::y(),
        vec![(y_break, upper), (y_low, upper - config.terrain_drop)],
    )?;
    Ok(Elevation::Graded(surface))
}

/// Axis-aligned bounds of every plan outline.
pub fn building_bounds(plan: &Plan) -> (Point2<f64>, Point2<f64>) {
    let mut min = Point2::new(f64::MAX, f64::MAX);
    let mut max = Point2::new(f64::MIN, f64::MIN);
    for (_, polygon) in plan.outlines() {
        for p in polygon.points() {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
    }
    (min, max)
}

/// Build the terrain slab with every tile cut out as a hole.
///
/// `tiles` are the ground-level footprints (building and driveway); each
/// tile ring must be the outer ring of the named volume's footprint so that
/// tile edge indices are volume edge indices.
pub fn build_terrain(
    plan: &Plan,
    config: &GeneratorConfig,
    surface: &Elevation,
    tiles: &[Tile<'_>],
) -> Result<TerrainModel> {
    let tolerances = config.tolerances();
    let elevations = config.elevations();

    let (min, max) = building_bounds(plan);
    let extent = (max.x - min.x).max(max.y - min.y);
    let half = extent * EXTENT_FACTOR * 0.5;
    let centre = Point2::from((min.coords + max.coords) * 0.5);
    let square = vec![
        centre + Vector2::new(-half, -half),
        centre + Vector2::new(half, -half),
        centre + Vector2::new(half, half),
        centre + Vector2::new(-half, half),
    ];

    for tile in tiles {
        if let Some(p) = tile.ring.iter().find(|p| {
            (p.x - centre.x).abs() >= half || (p.y - centre.y).abs() >= half
        }) {
            return Err(Error::topology(
                tile.volume,
                format!("leaves the terrain at ({:.3}, {:.3})", p.x, p.y),
            ));
        }
    }

    let loops = union_outline(tiles, tolerances.snap, tolerances.area)?;

    let mut holes = Vec::with_capacity(loops.len());
    let mut boundaries = Vec::new();
    let mut base = square.len();
    for outline in &loops {
        let (ring, sources) = outline.as_hole();
        for (j, source) in sources.iter().enumerate() {
            if let EdgeSource::Whole { tile, edge } = source {
                boundaries.push(SharedBoundary::new(
                    EdgeRef::new(tiles[*tile].volume, *edge),
                    EdgeRef::new(TERRAIN, base + j),
                ));
            }
        }
        base += ring.len();
        holes.push(ring);
    }

    // Rings are already oriented; Footprint::new keeps them as given.
    let footprint = Footprint::new(square, holes);

    let bottom = surface.min_height().min(elevations.atrium_floor) - config.slab_thickness;

    tracing::debug!(
        side = half * 2.0,
        holes = loops.len(),
        shared = boundaries.len(),
        "Built terrain"
    );

    Ok(TerrainModel {
        spec: VolumeSpec {
            name: TERRAIN.to_string(),
            outline: TERRAIN.to_string(),
            footprint,
            bottom: Elevation::Flat(bottom),
            top: surface.clone(),
            shape: Shape::Prism,
            caps: Caps::both(Material::Ground),
            edges: EdgeTable::walls(Material::Ground),
            normal_rule: NormalRule::Outward,
        },
        boundaries,
    })
}
