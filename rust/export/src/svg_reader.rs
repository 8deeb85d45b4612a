// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! SVG plan reader using nom
//!
//! Understands the subset written by [`render_plan_svg`](crate::render_plan_svg):
//! `<path>` elements whose `d` attribute is a sequence of `M x y (L x y)* Z`
//! rings in absolute coordinates.

use crate::error::{ExportError, Result};
use hexmass_geometry::Point2;
use nom::{
    bytes::complete::{tag, take_till, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{all_consuming, map},
    multi::{many0, many1},
    number::complete::double,
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
    IResult,
};

/// One `<path>` element recovered from an SVG document.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgPath {
    pub id: String,
    pub class: Option<String>,
    pub rings: Vec<Vec<Point2<f64>>>,
}

/// Parse a coordinate pair: `x y`
fn point(input: &str) -> IResult<&str, Point2<f64>> {
    map(
        separated_pair(double, multispace1, double),
        |(x, y)| Point2::new(x, y),
    )(input)
}

/// Parse one closed ring: `M x y L x y ... Z`
fn ring(input: &str) -> IResult<&str, Vec<Point2<f64>>> {
    map(
        tuple((
            preceded(pair(char('M'), multispace1), point),
            many0(preceded(
                tuple((multispace1, char('L'), multispace1)),
                point,
            )),
            preceded(multispace1, char('Z')),
        )),
        |(first, mut rest, _)| {
            rest.insert(0, first);
            rest
        },
    )(input)
}

/// Parse a complete `d` attribute value.
fn path_data(input: &str) -> IResult<&str, Vec<Vec<Point2<f64>>>> {
    all_consuming(delimited(
        multispace0,
        many1(terminated(ring, multispace0)),
        multispace0,
    ))(input)
}

/// Parse `name="value"`
fn attribute(input: &str) -> IResult<&str, (&str, &str)> {
    preceded(
        multispace1,
        separated_pair(
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == ':' || c == '_'),
            char('='),
            delimited(char('"'), take_till(|c: char| c == '"'), char('"')),
        ),
    )(input)
}

/// Parse a self-closing `<path .../>` element.
fn path_element(input: &str) -> IResult<&str, Vec<(&str, &str)>> {
    delimited(
        tag("<path"),
        many0(attribute),
        preceded(multispace0, tag("/>")),
    )(input)
}

/// Every `<path>` in the document, in document order.
pub fn read_svg_paths(svg: &str) -> Result<Vec<SvgPath>> {
    let mut paths = Vec::new();
    let mut rest = svg;
    while let Some(start) = rest.find("<path") {
        let offset = svg.len() - rest.len() + start;
        let (after, attributes) = path_element(&rest[start..]).map_err(|e| {
            ExportError::malformed("SVG", format!("bad <path> element at byte {}: {}", offset, e))
        })?;
        let get = |name: &str| attributes.iter().find(|(k, _)| *k == name).map(|(_, v)| *v);

        let id = get("id")
            .ok_or_else(|| ExportError::malformed("SVG", "path without id"))?
            .to_string();
        let d = get("d")
            .ok_or_else(|| ExportError::malformed("SVG", format!("path {} has no data", id)))?;
        let (_, rings) = path_data(d).map_err(|e| {
            ExportError::malformed("SVG", format!("path {} has unsupported data: {}", id, e))
        })?;

        paths.push(SvgPath {
            id,
            class: get("class").map(str::to_string),
            rings,
        });
        rest = after;
    }
    Ok(paths)
}
