// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Plan generator: 2D outlines of the exploded-hexagon scheme.
//!
//! All outlines share one frame centred on the atrium. The atrium is a
//! flat-top hexagon whose vertex `i` sits at `60° · i`, so edge 1 is the back
//! edge and edge 4 the front edge. Wings hang off the alternate edges 5, 3
//! and 1; the master triangle floats above them.

use crate::config::{CourtyardMode, GeneratorConfig};
use crate::error::{Error, Result};
use crate::polygon::Polygon;
use nalgebra::{Point2, Vector2};

/// Containment slack for the triangle-covers-atrium test.
const COVER_TOLERANCE: f64 = 1e-9;

/// Atrium edge facing the street.
pub const FRONT_EDGE: usize = 4;

/// Free atrium edges that receive a lawn court, with the court's name.
pub const SIDE_COURTYARDS: [(usize, &str); 2] =
    [(0, "side_courtyard_right"), (2, "side_courtyard_left")];

/// Motorcourt edge the driveway leaves from.
pub const MOTORCOURT_MOUTH: usize = 4;

/// The three wings and the hexagon edge each one is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WingId {
    /// Front right.
    A,
    /// Front left.
    B,
    /// Back, double height.
    C,
}

impl WingId {
    pub const ALL: [WingId; 3] = [WingId::A, WingId::B, WingId::C];

    /// Atrium edge the wing is attached to.
    pub fn hex_edge(self) -> usize {
        match self {
            WingId::A => 5,
            WingId::B => 3,
            WingId::C => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WingId::A => "wing_a",
            WingId::B => "wing_b",
            WingId::C => "wing_c",
        }
    }

    pub fn light_well_name(self) -> &'static str {
        match self {
            WingId::A => "light_well_a",
            WingId::B => "light_well_b",
            WingId::C => "light_well_c",
        }
    }

    /// Whether `edge` of the atrium carries a wing.
    pub fn is_wing_edge(edge: usize) -> bool {
        WingId::ALL.iter().any(|w| w.hex_edge() == edge)
    }
}

/// One wing quadrilateral.
///
/// Edge 0 faces the atrium, edges 1 and 3 are the radial sides and edge 2 is
/// the outer edge.
#[derive(Debug, Clone)]
pub struct Wing {
    pub id: WingId,
    pub polygon: Polygon,
    /// Gap between the atrium and the wing when the plan is exploded.
    /// Edge 0 lies on the atrium, edge 2 on the wing's inner edge.
    pub light_well: Option<Polygon>,
}

#[derive(Debug, Clone)]
pub enum Courtyard {
    InteriorVoid { wing: WingId, polygon: Polygon },
    ExteriorHex { edge: usize, polygon: Polygon },
}

impl Courtyard {
    pub fn polygon(&self) -> &Polygon {
        match self {
            Courtyard::InteriorVoid { polygon, .. } | Courtyard::ExteriorHex { polygon, .. } => {
                polygon
            }
        }
    }
}

/// Sunken lawn court in a free hexagon slot between two wings.
#[derive(Debug, Clone)]
pub struct SideCourtyard {
    pub name: &'static str,
    /// Atrium edge the court sits against.
    pub edge: usize,
    pub polygon: Polygon,
}

/// The generated plan.
#[derive(Debug, Clone)]
pub struct Plan {
    pub side_length: f64,
    pub clearance_distance: f64,
    pub atrium: Polygon,
    /// Hex vertex `i` pushed out radially by one side length.
    pub extension_vertices: Vec<Point2<f64>>,
    pub wings: Vec<Wing>,
    pub triangle: Polygon,
    /// Rotation applied to the master triangle, counter-clockwise.
    pub triangle_rotation_degrees: f64,
    pub courtyard: Option<Courtyard>,
    /// Paved forecourt in front of the atrium, tapering to the driveway.
    ///
    /// Edge 1 lies on the atrium front edge, edges 0 and 2 on the front
    /// wings and edge 4 is the driveway mouth. Absent when an exterior
    /// courtyard takes the front slot.
    pub motorcourt: Option<Polygon>,
    pub side_courtyards: Vec<SideCourtyard>,
}

impl Plan {
    pub fn wing(&self, id: WingId) -> Option<&Wing> {
        self.wings.iter().find(|w| w.id == id)
    }

    /// Every outline with its component name, in a fixed order.
    pub fn outlines(&self) -> Vec<(String, &Polygon)> {
        let mut outlines = vec![("atrium".to_string(), &self.atrium)];
        for wing in &self.wings {
            outlines.push((wing.id.name().to_string(), &wing.polygon));
        }
        for wing in &self.wings {
            if let Some(well) = &wing.light_well {
                outlines.push((wing.id.light_well_name().to_string(), well));
            }
        }
        outlines.push(("master_triangle".to_string(), &self.triangle));
        if let Some(courtyard) = &self.courtyard {
            outlines.push(("courtyard".to_string(), courtyard.polygon()));
        }
        if let Some(motorcourt) = &self.motorcourt {
            outlines.push(("motorcourt".to_string(), motorcourt));
        }
        for court in &self.side_courtyards {
            outlines.push((court.name.to_string(), &court.polygon));
        }
        outlines
    }
}

/// Unit vector at `degrees` from the +x axis.
pub fn direction(degrees: f64) -> Vector2<f64> {
    let r = degrees.to_radians();
    Vector2::new(r.cos(), r.sin())
}

/// Flat-top hexagon of the given side length around `center`.
pub fn hexagon(name: &str, center: Point2<f64>, side: f64) -> Result<Polygon> {
    let points = (0..6)
        .map(|i| center + direction(60.0 * i as f64) * side)
        .collect();
    Polygon::new(name, points)
}

/// Hexagon of side `side` mirrored across atrium edge `edge`.
pub fn adjacent_hexagon(name: &str, edge: usize, side: f64) -> Result<Polygon> {
    let apothem = side * 3f64.sqrt() / 2.0;
    let offset = direction(30.0 + 60.0 * edge as f64) * (2.0 * apothem);
    hexagon(name, Point2::origin() + offset, side)
}

/// Edge `edge` of `polygon` moved outward by `distance`.
pub fn offset_edge(
    polygon: &Polygon,
    edge: usize,
    distance: f64,
) -> Result<(Point2<f64>, Point2<f64>)> {
    let (a, b) = polygon.edge(edge).ok_or_else(|| {
        Error::invalid_parameter(
            "edge",
            edge,
            format!("out of range for a polygon with {} edges", polygon.len()),
        )
    })?;
    let (Some(normal), true) = (polygon.edge_outward_normal(edge), distance != 0.0) else {
        return Ok((a, b));
    };
    Ok((a + normal * distance, b + normal * distance))
}

/// Build every plan outline from the configuration.
pub fn generate_plan(config: &GeneratorConfig) -> Result<Plan> {
    let s = config.side_length;
    let d = config.clearance_distance;
    if !(s > 0.0) {
        return Err(Error::invalid_parameter("side_length", s, "must be positive"));
    }
    if d < 0.0 {
        return Err(Error::invalid_parameter(
            "clearance_distance",
            d,
            "must not be negative",
        ));
    }

    let center = Point2::origin();
    let atrium = hexagon("atrium", center, s)?;
    let hex = atrium.points().to_vec();
    let extension_vertices: Vec<Point2<f64>> = (0..6)
        .map(|i| hex[i] + direction(60.0 * i as f64) * s)
        .collect();

    let mut wings = Vec::with_capacity(3);
    for id in WingId::ALL {
        wings.push(build_wing(&atrium, id, s, config.explosion_gap)?);
    }

    let (triangle, triangle_rotation_degrees) = build_triangle(&atrium, config)?;

    let courtyard = match config.effective_courtyard() {
        CourtyardMode::None => None,
        CourtyardMode::ExteriorHex => {
            let edge = config.courtyard_edge;
            if edge >= 6 {
                return Err(Error::invalid_parameter(
                    "courtyard_edge",
                    edge,
                    "hexagon edge index out of range (0..6)",
                ));
            }
            if WingId::is_wing_edge(edge) {
                return Err(Error::invalid_parameter(
                    "courtyard_edge",
                    edge,
                    "edge already carries a wing",
                ));
            }
            let polygon = adjacent_hexagon("courtyard", edge, s)?;
            Some(Courtyard::ExteriorHex { edge, polygon })
        }
        CourtyardMode::InteriorVoid => {
            let wing = wings
                .iter()
                .find(|w| w.id == WingId::C)
                .ok_or_else(|| Error::topology("courtyard", "back wing missing"))?;
            let centroid = wing.polygon.centroid();
            let polygon =
                wing.polygon
                    .scaled("courtyard", &centroid, config.courtyard_void_ratio)?;
            Some(Courtyard::InteriorVoid {
                wing: WingId::C,
                polygon,
            })
        }
    };

    let occupied = match &courtyard {
        Some(Courtyard::ExteriorHex { edge, .. }) => Some(*edge),
        _ => None,
    };
    let motorcourt = if occupied == Some(FRONT_EDGE) {
        None
    } else {
        Some(build_motorcourt(s, config.driveway_width)?)
    };
    let side_courtyards = SIDE_COURTYARDS
        .iter()
        .filter(|(edge, _)| occupied != Some(*edge))
        .map(|&(edge, name)| {
            Ok(SideCourtyard {
                name,
                edge,
                polygon: adjacent_hexagon(name, edge, s)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        side_length = s,
        clearance = d,
        rotation = triangle_rotation_degrees,
        courtyard = courtyard.is_some(),
        motorcourt = motorcourt.is_some(),
        side_courtyards = side_courtyards.len(),
        "Generated plan"
    );

    Ok(Plan {
        side_length: s,
        clearance_distance: d,
        atrium,
        extension_vertices,
        wings,
        triangle,
        triangle_rotation_degrees,
        courtyard,
        motorcourt,
        side_courtyards,
    })
}

/// Front hexagon slot cut back to a funnel: the near half of the hexagon,
/// then the two far sides run on towards their meeting point until the gap
/// between them is one driveway wide.
fn build_motorcourt(s: f64, width: f64) -> Result<Polygon> {
    if !(width > 0.0 && width < 2.0 * s) {
        return Err(Error::invalid_parameter(
            "driveway_width",
            width,
            "motorcourt mouth must be narrower than twice the hexagon side",
        ));
    }
    let hex = adjacent_hexagon("motorcourt", FRONT_EDGE, s)?;
    let v = hex.points();
    // Sides v3-v4 and v0-v5 meet one side length beyond v4 and v5.
    let apex = v[3] + (v[4] - v[3]) * 2.0;
    let t = width / (v[0] - v[3]).norm();
    let left = apex + (v[3] - apex) * t;
    let right = apex + (v[0] - apex) * t;
    Polygon::new("motorcourt", vec![v[0], v[1], v[2], v[3], left, right])
}

fn build_wing(atrium: &Polygon, id: WingId, s: f64, gap: f64) -> Result<Wing> {
    let k = id.hex_edge();
    let i0 = k;
    let i1 = (k + 1) % 6;
    let (in0, in1) = offset_edge(atrium, k, gap)?;
    let out0 = in0 + direction(60.0 * i0 as f64) * s;
    let out1 = in1 + direction(60.0 * i1 as f64) * s;
    let polygon = Polygon::new(id.name(), vec![in1, in0, out0, out1])?;

    let light_well = if gap > 0.0 {
        let hex = atrium.points();
        Some(Polygon::new(
            id.light_well_name(),
            vec![hex[i1], hex[i0], in0, in1],
        )?)
    } else {
        None
    };

    Ok(Wing {
        id,
        polygon,
        light_well,
    })
}

/// Master triangle offset from the wing edges and turned so its back edge
/// runs through the outer corner of the back wing.
fn build_triangle(atrium: &Polygon, config: &GeneratorConfig) -> Result<(Polygon, f64)> {
    let s = config.side_length;
    let d = config.clearance_distance;
    let inradius = s * 3f64.sqrt() / 2.0 + d;

    // Back edge normal at 90° + θ must satisfy n · ext[1] = inradius, which
    // reduces to 2s · cos(θ + 30°) = inradius.
    let ratio = inradius / (2.0 * s);
    if ratio > 1.0 {
        return Err(Error::invalid_parameter(
            "clearance_distance",
            d,
            "master triangle back edge cannot reach the back wing corner",
        ));
    }
    let phi = ratio.acos().to_degrees();
    let rotation = [phi - 30.0, -phi - 30.0]
        .into_iter()
        .map(|a| a.rem_euclid(360.0))
        .fold(f64::INFINITY, f64::min)
        - config.triangle_backoff_degrees;

    let circumradius = 2.0 * inradius;
    let points = [30.0, 150.0, 270.0]
        .iter()
        .map(|a| Point2::origin() + direction(a + rotation) * circumradius)
        .collect();
    let triangle = Polygon::new("master_triangle", points)?;

    if let Some(i) = atrium
        .points()
        .iter()
        .position(|p| !triangle.covers(p, COVER_TOLERANCE))
    {
        return Err(Error::invalid_parameter(
            "clearance_distance",
            d,
            format!("master triangle does not cover atrium vertex {}", i),
        ));
    }

    Ok((triangle, rotation))
}
