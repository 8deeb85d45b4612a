// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene assembly
//!
//! The scene is declared as a table of volume specs plus the contracts that
//! bind them, then extruded, resolved and corrected in that order.
//!
//! Elevation stack (defaults in feet):
//!
//! | component | bottom | top |
//! |---|---|---|
//! | atrium floor | lower − depth | + slab |
//! | atrium facade | atrium floor top | atrium roof base |
//! | front wing foundation | atrium floor bottom | lower + slab |
//! | front wing garage | lower + slab | upper |
//! | front wing floor / facade / roof | upper | triangle floor + slab |
//! | back wing plinth / floor / facade / roof | atrium floor bottom | triangle floor + slab |
//! | master triangle floor / facade / roof | triangle floor | triangle top |
//! | motorcourt / side courtyard floor | lower − slab | lower |
//! | motorcourt walls | lower | terrain |
//! | side courtyard walls | lower | terrain + wall rise |
//! | driveway walls | driving surface | terrain |

use crate::driveway::{build_driveway, DrivewayModel, CREST, CURVE, RAMP};
use crate::elevation::Elevation;
use crate::extrusion::{extrude_all, Caps, EdgeTable, Shape, VolumeSpec};
use crate::footprint::Footprint;
use crate::normals::correct_normals;
use crate::outline::Tile;
use crate::resolver::resolve_shared_edges;
use crate::scene::{
    EdgeRef, EdgeRole, EqualEdgeGroup, Material, NormalRule, Scene, SceneContracts,
    SharedBoundary, StackRelation,
};
use crate::terrain::{build_terrain, terrain_surface};
use hexmass_core::{
    Courtyard, Elevations, Error, GeneratorConfig, Plan, Polygon, Result, WingId,
    MOTORCOURT_MOUTH,
};
use std::collections::BTreeMap;

pub const ATRIUM_FLOOR: &str = "atrium_floor";
pub const ATRIUM_FACADE: &str = "atrium_facade";
pub const ATRIUM_ROOF: &str = "atrium_roof";
pub const TRIANGLE_FLOOR: &str = "triangle_floor";
pub const TRIANGLE_FACADE: &str = "triangle_facade";
pub const TRIANGLE_ROOF: &str = "triangle_roof";
pub const COURTYARD_FLOOR: &str = "courtyard_floor";
pub const COURTYARD_WALLS: &str = "courtyard_walls";
pub const MOTORCOURT_FLOOR: &str = "motorcourt_floor";
pub const MOTORCOURT_WALLS: &str = "motorcourt_walls";

/// Height of the side courtyard walls above the surrounding terrain.
const SIDE_COURTYARD_WALL_RISE: f64 = 4.0;

/// Name of a wing component, e.g. `wing_a_roof`.
pub fn wing_component(id: WingId, part: &str) -> String {
    format!("{}_{}", id.name(), part)
}

/// Ground-level volume of a wing; its footprint is the bare wing outline.
pub fn wing_base(id: WingId) -> String {
    match id {
        WingId::A | WingId::B => wing_component(id, "foundation"),
        WingId::C => wing_component(id, "plinth"),
    }
}

/// Build, resolve and orient the full scene for a plan.
pub fn build_scene(plan: &Plan, config: &GeneratorConfig) -> Result<Scene> {
    let mut builder = SceneBuilder::new(plan, config);
    builder.add_atrium();
    builder.add_wings()?;
    builder.add_light_wells();
    builder.add_triangle();
    builder.add_courtyard()?;
    builder.add_motorcourt()?;
    builder.add_side_courtyards()?;
    builder.add_driveway_and_terrain()?;
    builder.apply_edge_overrides(&config.edge_overrides)?;
    builder.finish()
}

struct SceneBuilder<'a> {
    plan: &'a Plan,
    config: &'a GeneratorConfig,
    elevations: Elevations,
    specs: Vec<VolumeSpec>,
    contracts: SceneContracts,
}

impl<'a> SceneBuilder<'a> {
    fn new(plan: &'a Plan, config: &'a GeneratorConfig) -> Self {
        Self {
            plan,
            config,
            elevations: config.elevations(),
            specs: Vec::new(),
            contracts: SceneContracts::default(),
        }
    }

    fn t(&self) -> f64 {
        self.config.slab_thickness
    }

    fn push(&mut self, mut spec: VolumeSpec) {
        if self.config.faces_inward(&spec.name) {
            spec.normal_rule = NormalRule::Inward;
        }
        self.specs.push(spec);
    }

    fn spec(&self, name: &str) -> Option<&VolumeSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    fn share(&mut self, a: &str, a_edge: usize, b: &str, b_edge: usize) {
        self.contracts.shared_boundaries.push(SharedBoundary::new(
            EdgeRef::new(a, a_edge),
            EdgeRef::new(b, b_edge),
        ));
    }

    fn chain(&mut self, names: &[&str]) {
        for pair in names.windows(2) {
            self.contracts
                .stacks
                .push(StackRelation::continuous(pair[0], pair[1]));
        }
    }

    fn equal_edges(&mut self, name: &str, expected: Option<f64>, edges: Vec<EdgeRef>) {
        self.contracts.equal_edges.push(EqualEdgeGroup {
            name: name.to_string(),
            expected,
            edges,
        });
    }

    fn add_atrium(&mut self) {
        let e = self.elevations;
        let t = self.t();
        let footprint = Footprint::from_polygon(&self.plan.atrium);

        self.push(VolumeSpec::slab(
            ATRIUM_FLOOR,
            "atrium",
            footprint.clone(),
            e.atrium_floor,
            e.atrium_floor + t,
            Material::Marble,
        ));

        let mut facade = VolumeSpec::walls(
            ATRIUM_FACADE,
            "atrium",
            footprint.clone(),
            e.atrium_floor + t,
            e.atrium_roof,
            Material::Glass,
        );
        if self.config.explosion_gap == 0.0 {
            for id in [WingId::A, WingId::C] {
                facade.edges = facade.edges.with(id.hex_edge(), EdgeRole::Open);
            }
        }
        self.push(facade);

        let rise = self.config.atrium_roof_rise;
        let mut roof = VolumeSpec::slab(
            ATRIUM_ROOF,
            "atrium",
            footprint,
            e.atrium_roof,
            e.atrium_roof + t,
            Material::Glass,
        );
        if rise > 0.0 {
            roof.shape = Shape::Pyramid { rise };
        }
        self.push(roof);

        self.chain(&[ATRIUM_FLOOR, ATRIUM_FACADE, ATRIUM_ROOF]);
        let s = self.plan.side_length;
        self.equal_edges(
            "atrium_sides",
            Some(s),
            (0..6).map(|i| EdgeRef::new(ATRIUM_FLOOR, i)).collect(),
        );
    }

    fn add_wings(&mut self) -> Result<()> {
        let e = self.elevations;
        let t = self.t();
        let s = self.plan.side_length;
        let interior_void = match &self.plan.courtyard {
            Some(Courtyard::InteriorVoid { wing, polygon }) => Some((*wing, polygon.clone())),
            _ => None,
        };

        let plan = self.plan;
        for wing in &plan.wings {
            let id = wing.id;
            let outline = id.name();
            let plain = Footprint::from_polygon(&wing.polygon);
            let names: Vec<String>;

            match id {
                WingId::A | WingId::B => {
                    names = ["foundation", "garage", "floor", "facade", "roof"]
                        .iter()
                        .map(|p| wing_component(id, p))
                        .collect();
                    self.push(VolumeSpec::slab(
                        &names[0],
                        outline,
                        plain.clone(),
                        e.atrium_floor,
                        e.lower_ground + t,
                        Material::Concrete,
                    ));
                    self.push(VolumeSpec::walls(
                        &names[1],
                        outline,
                        plain.clone(),
                        e.lower_ground + t,
                        e.upper_ground,
                        Material::Concrete,
                    ));
                    self.push(VolumeSpec::slab(
                        &names[2],
                        outline,
                        plain.clone(),
                        e.upper_ground,
                        e.upper_ground + t,
                        Material::Concrete,
                    ));
                    let mut facade = VolumeSpec::walls(
                        &names[3],
                        outline,
                        plain.clone(),
                        e.upper_ground + t,
                        e.triangle_floor,
                        Material::Glass,
                    );
                    facade.edges = facade.edges.with(0, EdgeRole::Open);
                    self.push(facade);
                    self.push(VolumeSpec::slab(
                        &names[4],
                        outline,
                        plain,
                        e.triangle_floor,
                        e.triangle_floor + t,
                        Material::Concrete,
                    ));
                }
                WingId::C => {
                    names = ["plinth", "floor", "facade", "roof"]
                        .iter()
                        .map(|p| wing_component(id, p))
                        .collect();
                    let holed = match &interior_void {
                        Some((void_wing, polygon)) if *void_wing == id => {
                            plain.clone().with_hole(polygon)
                        }
                        _ => plain.clone(),
                    };

                    self.push(VolumeSpec::slab(
                        &names[0],
                        outline,
                        plain,
                        e.atrium_floor,
                        e.lower_ground,
                        Material::Concrete,
                    ));
                    self.push(VolumeSpec::slab(
                        &names[1],
                        outline,
                        holed.clone(),
                        e.lower_ground,
                        e.lower_ground + t,
                        Material::Concrete,
                    ));
                    let mut facade = VolumeSpec::walls(
                        &names[2],
                        outline,
                        holed.clone(),
                        e.lower_ground + t,
                        e.triangle_floor,
                        Material::Glass,
                    );
                    facade.edges = facade.edges.with(0, EdgeRole::Open);
                    for hole_edge in holed.outer.len()..holed.edge_count() {
                        facade.edges = facade.edges.with(hole_edge, EdgeRole::Open);
                    }
                    self.push(facade);
                    self.push(VolumeSpec::slab(
                        &names[3],
                        outline,
                        holed,
                        e.triangle_floor,
                        e.triangle_floor + t,
                        Material::Concrete,
                    ));
                }
            }

            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            self.chain(&refs);
            if let Some(roof) = names.last() {
                self.contracts
                    .stacks
                    .push(StackRelation::stacked(roof.as_str(), TRIANGLE_FLOOR));
            }

            let base = wing_base(id);
            match &wing.light_well {
                None => self.share(ATRIUM_FLOOR, id.hex_edge(), &base, 0),
                Some(_) => {
                    let well = id.light_well_name();
                    self.share(ATRIUM_FLOOR, id.hex_edge(), well, 0);
                    self.share(well, 2, &base, 0);
                }
            }
        }

        if self.plan.wings.len() != WingId::ALL.len() {
            return Err(Error::topology(
                "plan",
                format!("expected 3 wings, found {}", self.plan.wings.len()),
            ));
        }

        let bases: Vec<String> = WingId::ALL.iter().map(|&id| wing_base(id)).collect();
        self.equal_edges(
            "wing_extensions",
            Some(s),
            bases
                .iter()
                .flat_map(|b| [EdgeRef::new(b.as_str(), 1), EdgeRef::new(b.as_str(), 3)])
                .collect(),
        );
        self.equal_edges(
            "wing_inner_edges",
            Some(s),
            bases.iter().map(|b| EdgeRef::new(b.as_str(), 0)).collect(),
        );
        Ok(())
    }

    fn add_light_wells(&mut self) {
        let e = self.elevations;
        let t = self.t();
        let wells: Vec<(&'static str, Polygon)> = self
            .plan
            .wings
            .iter()
            .filter_map(|w| w.light_well.clone().map(|p| (w.id.light_well_name(), p)))
            .collect();
        for (name, polygon) in wells {
            self.push(VolumeSpec::slab(
                name,
                name,
                Footprint::from_polygon(&polygon),
                e.atrium_floor,
                e.atrium_floor + t,
                Material::Ground,
            ));
        }
    }

    fn add_triangle(&mut self) {
        let e = self.elevations;
        let t = self.t();
        let outline = "master_triangle";
        let footprint = Footprint::from_polygon(&self.plan.triangle).with_hole(&self.plan.atrium);
        let outer = footprint.outer.len();

        self.push(VolumeSpec::slab(
            TRIANGLE_FLOOR,
            outline,
            footprint.clone(),
            e.triangle_floor,
            e.triangle_floor + t,
            Material::Concrete,
        ));
        let mut facade = VolumeSpec::walls(
            TRIANGLE_FACADE,
            outline,
            footprint.clone(),
            e.triangle_floor + t,
            e.triangle_top - t,
            Material::Glass,
        );
        for hole_edge in outer..footprint.edge_count() {
            facade.edges = facade.edges.with(hole_edge, EdgeRole::Open);
        }
        self.push(facade);
        self.push(VolumeSpec::slab(
            TRIANGLE_ROOF,
            outline,
            footprint,
            e.triangle_top - t,
            e.triangle_top,
            Material::Concrete,
        ));

        self.chain(&[TRIANGLE_FLOOR, TRIANGLE_FACADE, TRIANGLE_ROOF]);
        self.equal_edges(
            "triangle_sides",
            None,
            (0..outer).map(|i| EdgeRef::new(TRIANGLE_FLOOR, i)).collect(),
        );
    }

    /// Volumes whose footprint is a bare building tile at ground level.
    fn building_tiles(&self) -> Vec<String> {
        let mut names = vec![ATRIUM_FLOOR.to_string()];
        names.extend(WingId::ALL.iter().map(|&id| wing_base(id)));
        names.extend(
            self.plan
                .wings
                .iter()
                .filter(|w| w.light_well.is_some())
                .map(|w| w.id.light_well_name().to_string()),
        );
        names
    }

    /// Edges of `polygon` lying on a building tile edge, as
    /// `(tile, tile edge, polygon edge)`.
    fn tile_contacts(&self, polygon: &Polygon) -> Vec<(String, usize, usize)> {
        let snap = self.config.snap_tolerance;
        let mut found = Vec::new();
        for tile in self.building_tiles() {
            let Some(spec) = self.spec(&tile) else {
                continue;
            };
            for i in 0..polygon.len() {
                let Some((a, b)) = polygon.edge(i) else {
                    continue;
                };
                if let Some(j) = spec.footprint.find_edge(&a, &b, snap) {
                    found.push((tile.clone(), j, i));
                }
            }
        }
        found
    }

    /// Sunken ground-level court: a floor slab below the lower ground and a
    /// ring of retaining walls up to `top`. Edges against building tiles
    /// share their boundary and stay open, as do the edges in `open`.
    fn add_sunken_court(
        &mut self,
        (floor, walls, outline): (&str, &str, &str),
        polygon: &Polygon,
        material: Material,
        top: Elevation,
        open: &[usize],
    ) {
        let e = self.elevations;
        let t = self.t();
        let footprint = Footprint::from_polygon(polygon);
        self.push(VolumeSpec::slab(
            floor,
            outline,
            footprint.clone(),
            e.lower_ground - t,
            e.lower_ground,
            material,
        ));

        let mut spec = VolumeSpec {
            name: walls.to_string(),
            outline: outline.to_string(),
            footprint,
            bottom: Elevation::Flat(e.lower_ground),
            top,
            shape: Shape::Prism,
            caps: Caps::none(),
            edges: EdgeTable::walls(Material::Concrete),
            normal_rule: NormalRule::Outward,
        };
        for (tile, j, i) in self.tile_contacts(polygon) {
            self.share(&tile, j, floor, i);
            spec.edges = spec.edges.with(i, EdgeRole::Open);
        }
        for &i in open {
            spec.edges = spec.edges.with(i, EdgeRole::Open);
        }
        self.push(spec);
        self.chain(&[floor, walls]);
    }

    fn add_courtyard(&mut self) -> Result<()> {
        let Some(courtyard) = self.plan.courtyard.clone() else {
            return Ok(());
        };
        let e = self.elevations;
        let t = self.t();
        let snap = self.config.snap_tolerance;
        let s = self.plan.side_length;
        let polygon = courtyard.polygon().clone();
        let footprint = Footprint::from_polygon(&polygon);

        match courtyard {
            Courtyard::ExteriorHex { edge: hex_edge, .. } => {
                let surface = terrain_surface(self.plan, self.config)?;
                let open: &[usize] = if hex_edge == 4 { &[4] } else { &[] };
                self.add_sunken_court(
                    (COURTYARD_FLOOR, COURTYARD_WALLS, "courtyard"),
                    &polygon,
                    Material::Ground,
                    surface,
                    open,
                );
                self.equal_edges(
                    "courtyard_sides",
                    Some(s),
                    (0..polygon.len())
                        .map(|i| EdgeRef::new(COURTYARD_FLOOR, i))
                        .collect(),
                );
            }
            Courtyard::InteriorVoid { wing, .. } => {
                self.push(VolumeSpec::slab(
                    COURTYARD_FLOOR,
                    "courtyard",
                    footprint.clone(),
                    e.lower_ground,
                    e.lower_ground + t,
                    Material::Ground,
                ));
                self.push(VolumeSpec::walls(
                    COURTYARD_WALLS,
                    "courtyard",
                    footprint,
                    e.lower_ground + t,
                    e.triangle_floor,
                    Material::Concrete,
                ));

                let host = wing_component(wing, "floor");
                let mut found = Vec::new();
                if let Some(spec) = self.spec(&host) {
                    for i in 0..polygon.len() {
                        let Some((a, b)) = polygon.edge(i) else {
                            continue;
                        };
                        if let Some(j) = spec.footprint.find_edge(&a, &b, snap) {
                            found.push((i, j));
                        }
                    }
                }
                if found.len() != polygon.len() {
                    return Err(Error::topology(
                        COURTYARD_FLOOR,
                        format!(
                            "only {} of {} edges match the hole in {}",
                            found.len(),
                            polygon.len(),
                            host
                        ),
                    ));
                }
                for (i, j) in found {
                    self.share(&host, j, COURTYARD_FLOOR, i);
                }
                let ratio = self.config.courtyard_void_ratio;
                self.equal_edges(
                    "courtyard_sides",
                    Some(s * ratio),
                    [1, 3]
                        .iter()
                        .map(|&i| EdgeRef::new(COURTYARD_FLOOR, i))
                        .collect(),
                );
                self.chain(&[COURTYARD_FLOOR, COURTYARD_WALLS]);
            }
        }
        Ok(())
    }

    fn add_motorcourt(&mut self) -> Result<()> {
        let Some(polygon) = self.plan.motorcourt.clone() else {
            return Ok(());
        };
        let surface = terrain_surface(self.plan, self.config)?;
        self.add_sunken_court(
            (MOTORCOURT_FLOOR, MOTORCOURT_WALLS, "motorcourt"),
            &polygon,
            Material::Concrete,
            surface,
            &[MOTORCOURT_MOUTH],
        );
        Ok(())
    }

    /// Lawn courts in the free slots beside the back wing. Their walls
    /// stand proud of the terrain and leave the back edge open.
    fn add_side_courtyards(&mut self) -> Result<()> {
        let surface = terrain_surface(self.plan, self.config)?;
        let top = surface.offset(SIDE_COURTYARD_WALL_RISE);
        let plan = self.plan;
        for court in &plan.side_courtyards {
            let polygon = &court.polygon;
            let back = (0..polygon.len())
                .filter_map(|i| polygon.edge(i).map(|(a, b)| (i, a.y + b.y)))
                .max_by(|x, y| x.1.total_cmp(&y.1))
                .map(|(i, _)| i)
                .ok_or_else(|| Error::topology(court.name, "court has no edges"))?;
            let floor = format!("{}_floor", court.name);
            let walls = format!("{}_walls", court.name);
            self.add_sunken_court(
                (&floor, &walls, court.name),
                polygon,
                Material::Ground,
                top.clone(),
                &[back],
            );
        }
        Ok(())
    }

    fn add_driveway_and_terrain(&mut self) -> Result<()> {
        let surface = terrain_surface(self.plan, self.config)?;
        let DrivewayModel {
            specs,
            boundaries,
            width_group,
            walls,
            stacks,
            ..
        } = build_driveway(self.plan, self.config, &surface)?;
        for spec in specs {
            self.push(spec);
        }
        self.push(walls);
        self.contracts.shared_boundaries.extend(boundaries);
        self.contracts.stacks.extend(stacks);
        self.contracts.equal_edges.push(width_group);
        if self.plan.motorcourt.is_some() {
            self.share(MOTORCOURT_FLOOR, MOTORCOURT_MOUTH, RAMP, 0);
        }

        let mut names = self.building_tiles();
        if matches!(self.plan.courtyard, Some(Courtyard::ExteriorHex { .. })) {
            names.push(COURTYARD_FLOOR.to_string());
        }
        if self.plan.motorcourt.is_some() {
            names.push(MOTORCOURT_FLOOR.to_string());
        }
        names.extend(
            self.plan
                .side_courtyards
                .iter()
                .map(|c| format!("{}_floor", c.name)),
        );
        names.extend([RAMP, CREST, CURVE].iter().map(|s| s.to_string()));

        let terrain = {
            let mut tiles = Vec::with_capacity(names.len());
            for name in &names {
                let spec = self
                    .spec(name)
                    .ok_or_else(|| Error::topology(name.as_str(), "tile volume missing"))?;
                tiles.push(Tile {
                    volume: name.as_str(),
                    ring: &spec.footprint.outer,
                });
            }
            build_terrain(self.plan, self.config, &surface, &tiles)?
        };
        self.contracts.shared_boundaries.extend(terrain.boundaries);
        self.push(terrain.spec);
        Ok(())
    }

    fn apply_edge_overrides(
        &mut self,
        overrides: &BTreeMap<String, BTreeMap<usize, String>>,
    ) -> Result<()> {
        for (component, edges) in overrides {
            let spec = self
                .specs
                .iter_mut()
                .find(|s| &s.name == component)
                .ok_or_else(|| {
                    Error::invalid_parameter("edge_overrides", component, "unknown component")
                })?;
            let count = spec.footprint.edge_count();
            for (&edge, role) in edges {
                let role: EdgeRole = role.parse()?;
                if edge >= count {
                    return Err(Error::topology(
                        component.as_str(),
                        format!(
                            "edge override {} out of range for a footprint with {} edges",
                            edge, count
                        ),
                    ));
                }
                spec.edges = spec.edges.clone().with(edge, role);
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<Scene> {
        let tolerances = self.config.tolerances();
        let mut volumes = extrude_all(&self.specs, &tolerances)?;
        let resolution =
            resolve_shared_edges(&mut volumes, &self.contracts.shared_boundaries, &tolerances)?;

        let mut scene = Scene::new(tolerances, self.contracts, volumes).with_export_frame(
            self.config.axis_correction_degrees,
            self.config.export_unit_scale,
        );
        let correction = correct_normals(&mut scene);

        tracing::info!(
            volumes = scene.volumes().len(),
            faces = scene.face_count(),
            snapped = resolution.snapped,
            flipped = correction.flipped,
            "Built scene"
        );
        Ok(scene)
    }
}
