// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! SVG plan export
//!
//! Path coordinates are plan feet, printed with round-trip precision, inside
//! a group that flips y so north is up. Labels and dimension text sit outside
//! the flipped group.

use crate::error::{ExportError, Result};
use hexmass_core::{Plan, Polygon, WingId};
use hexmass_geometry::{Point2, Scene};
use std::fmt::Write;
use std::path::Path;

/// Parameters for plan SVG export.
#[derive(Debug, Clone)]
pub struct SvgOptions {
    /// Output width in pixels; height follows the plan aspect ratio.
    pub width: u32,
    /// Space around the drawing, plan feet.
    pub margin: f64,
    pub stroke_width: f64,
    pub labels: bool,
    pub dimensions: bool,
    pub legend: bool,
    /// Also draw footprints of scene volumes with their own outline, such as
    /// the driveway.
    pub footprints: bool,
}

impl Default for SvgOptions {
    fn default() -> Self {
        Self {
            width: 1200,
            margin: 20.0,
            stroke_width: 0.3,
            labels: true,
            dimensions: true,
            legend: true,
            footprints: true,
        }
    }
}

impl SvgOptions {
    /// Bare outlines only.
    pub fn outlines_only() -> Self {
        Self {
            labels: false,
            dimensions: false,
            legend: false,
            footprints: false,
            ..Self::default()
        }
    }
}

/// Fill colour per outline class.
const CLASSES: [(&str, &str, &str); 6] = [
    ("atrium", "#ebe6dc", "Atrium"),
    ("wing", "#b3b3b8", "Wings"),
    ("triangle", "none", "Master triangle"),
    ("courtyard", "#6e9e5a", "Courtyards"),
    ("motorcourt", "#a39e93", "Motorcourt"),
    ("footprint", "#d9d0c1", "Scene footprints"),
];

fn class_of(name: &str) -> &'static str {
    if name == "atrium" {
        "atrium"
    } else if name.starts_with("wing_") || name.starts_with("light_well") {
        "wing"
    } else if name == "master_triangle" {
        "triangle"
    } else if name == "courtyard" || name.starts_with("side_courtyard") {
        "courtyard"
    } else if name == "motorcourt" {
        "motorcourt"
    } else {
        "footprint"
    }
}

fn fill_of(class: &str) -> &'static str {
    CLASSES
        .iter()
        .find(|(c, _, _)| *c == class)
        .map(|(_, fill, _)| *fill)
        .unwrap_or("none")
}

fn ring_data(d: &mut String, ring: &[Point2<f64>]) {
    for (i, p) in ring.iter().enumerate() {
        let op = if i == 0 { "M" } else { " L" };
        let _ = write!(d, "{} {} {}", op, p.x, p.y);
    }
    d.push_str(" Z");
}

fn path(svg: &mut String, id: &str, class: &str, rings: &[&[Point2<f64>]], stroke: f64) {
    let mut d = String::new();
    for (i, ring) in rings.iter().enumerate() {
        if i > 0 {
            d.push(' ');
        }
        ring_data(&mut d, ring);
    }
    let _ = writeln!(
        svg,
        r#"    <path id="{}" class="{}" d="{}" fill="{}" fill-rule="evenodd" stroke="black" stroke-width="{}"/>"#,
        id,
        class,
        d,
        fill_of(class),
        stroke
    );
}

/// Text placed at plan point `p`, outside the flipped group.
fn label(svg: &mut String, p: &Point2<f64>, size: f64, text: &str) {
    let _ = writeln!(
        svg,
        r#"  <text x="{:.3}" y="{:.3}" font-size="{:.2}" text-anchor="middle">{}</text>"#,
        p.x, -p.y, size, text
    );
}

fn dimension(svg: &mut String, polygon: &Polygon, edge: usize, offset: f64, size: f64) {
    let (Some((a, b)), Some(n)) = (polygon.edge(edge), polygon.edge_outward_normal(edge)) else {
        return;
    };
    let (a, b) = (a + n * offset, b + n * offset);
    let _ = writeln!(
        svg,
        r#"  <line class="dimension" x1="{:.3}" y1="{:.3}" x2="{:.3}" y2="{:.3}" stroke="gray" stroke-width="{:.2}"/>"#,
        a.x,
        -a.y,
        b.x,
        -b.y,
        size * 0.05
    );
    let mid = Point2::from((a.coords + b.coords) * 0.5) + n * (size * 0.8);
    label(svg, &mid, size, &format!("{:.1} ft", (b - a).norm()));
}

/// Render the plan, optionally with the footprints of a built scene.
pub fn render_plan_svg(plan: &Plan, scene: Option<&Scene>, options: &SvgOptions) -> String {
    let outlines = plan.outlines();
    let footprints: Vec<(&str, Vec<&[Point2<f64>]>)> = match scene {
        Some(scene) if options.footprints => scene
            .volumes()
            .iter()
            .filter(|v| v.name() != "terrain" && v.outline() == v.name())
            .map(|v| {
                (
                    v.name(),
                    v.footprint().rings().map(|r| r.as_slice()).collect(),
                )
            })
            .collect(),
        _ => Vec::new(),
    };

    let mut min = Point2::new(f64::MAX, f64::MAX);
    let mut max = Point2::new(f64::MIN, f64::MIN);
    let points = outlines
        .iter()
        .flat_map(|(_, p)| p.points().iter())
        .chain(footprints.iter().flat_map(|(_, rings)| rings.iter().flat_map(|r| r.iter())));
    for p in points {
        min = min.inf(p);
        max = max.sup(p);
    }
    if min.x > max.x {
        min = Point2::origin();
        max = Point2::origin();
    }
    let m = options.margin;
    let (vx, vy) = (min.x - m, -(max.y + m));
    let (vw, vh) = (max.x - min.x + 2.0 * m, max.y - min.y + 2.0 * m);
    let height = (options.width as f64 * vh / vw.max(f64::MIN_POSITIVE)).round() as u32;
    let text_size = (plan.side_length * 0.12).max(1.0);

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="{} {} {} {}">"#,
        options.width, height, vx, vy, vw, vh
    );
    let _ = writeln!(svg, r#"  <g id="plan" transform="scale(1,-1)">"#);
    for (name, rings) in &footprints {
        path(
            &mut svg,
            &format!("footprint-{}", name),
            "footprint",
            rings,
            options.stroke_width * 0.5,
        );
    }
    for (name, polygon) in &outlines {
        path(
            &mut svg,
            name,
            class_of(name),
            &[polygon.points()],
            options.stroke_width,
        );
    }
    svg.push_str("  </g>\n");

    if options.labels {
        for (name, polygon) in &outlines {
            if name != "master_triangle" {
                label(&mut svg, &polygon.centroid(), text_size, name);
            }
        }
    }

    if options.dimensions {
        dimension(&mut svg, &plan.atrium, 4, -text_size * 1.5, text_size);
        for id in WingId::ALL {
            if let Some(wing) = plan.wing(id) {
                dimension(&mut svg, &wing.polygon, 1, text_size, text_size);
            }
        }
    }

    if options.legend {
        let x = vx + text_size;
        let mut y = vy + text_size;
        for (class, fill, title) in CLASSES {
            if class == "footprint" && footprints.is_empty() {
                continue;
            }
            let _ = writeln!(
                svg,
                r#"  <rect class="legend" x="{:.3}" y="{:.3}" width="{:.3}" height="{:.3}" fill="{}" stroke="black" stroke-width="{:.2}"/>"#,
                x,
                y,
                text_size,
                text_size,
                fill,
                text_size * 0.05
            );
            let _ = writeln!(
                svg,
                r#"  <text x="{:.3}" y="{:.3}" font-size="{:.2}">{}</text>"#,
                x + text_size * 1.5,
                y + text_size * 0.85,
                text_size,
                title
            );
            y += text_size * 1.5;
        }
    }

    svg.push_str("</svg>\n");
    svg
}

pub fn write_svg_file(
    plan: &Plan,
    scene: Option<&Scene>,
    options: &SvgOptions,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, render_plan_svg(plan, scene, options))
        .map_err(|e| ExportError::io(path, e))?;
    tracing::info!(path = %path.display(), "Wrote SVG plan");
    Ok(())
}
