// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Generator configuration.
//!
//! One immutable [`GeneratorConfig`] drives a whole generation run and is
//! passed by reference through every stage. Documents are JSON; unknown keys
//! are rejected and missing keys fall back to the defaults below.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Placement of the optional courtyard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CourtyardMode {
    #[default]
    None,
    /// Void cut from the back wing.
    InteriorVoid,
    /// Hexagon of the atrium's size attached flush to a hex edge.
    ExteriorHex,
}

/// Numeric tolerances used by the resolver and validator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Allowed deviation between declared-equal edge lengths.
    pub edge_length: f64,
    /// Allowed componentwise deviation of shared vertices.
    pub coordinate: f64,
    /// Faces below this area are degenerate.
    pub area: f64,
    /// Largest drift the resolver will snap away.
    pub snap: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            edge_length: 1e-6,
            coordinate: 1e-6,
            area: 1e-6,
            snap: 1e-3,
        }
    }
}

/// Generator configuration. All lengths are in feet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Side length of the atrium hexagon (the module size).
    pub side_length: f64,
    /// Clearance between the hexagon and the master triangle.
    pub clearance_distance: f64,
    /// Clear height of one storey.
    pub ceiling_height: f64,
    /// Thickness of floor and roof slabs.
    pub slab_thickness: f64,
    /// Front-to-back fall of the terrain surface.
    pub terrain_drop: f64,
    pub courtyard_enabled: bool,
    pub courtyard_mode: CourtyardMode,
    /// Length of the driveway ramp.
    pub driveway_length: f64,
    /// Length of the straight crest after the ramp.
    pub driveway_flat_length: f64,
    /// Arc length of the 90 degree turn.
    pub driveway_curve_length: f64,
    /// Grade of the crest and turn, falling away from the ramp.
    pub driveway_approach_slope: f64,
    /// Rotation about X applied at export to reconcile up axes.
    pub axis_correction_degrees: f64,
    /// Factor from feet to the export unit.
    pub export_unit_scale: f64,
    /// Offset between the atrium and the wings; positive values open light wells.
    pub explosion_gap: f64,
    /// Elevation of the lower ground (garage and back-wing floors).
    pub lower_ground: f64,
    /// Depth of the atrium floor below the lower ground.
    pub atrium_floor_depth: f64,
    /// Height of the atrium wall above the master triangle roof.
    pub atrium_clerestory: f64,
    /// Rise of the pyramidal atrium roof; zero gives a flat slab.
    pub atrium_roof_rise: f64,
    /// Extra clockwise rotation of the master triangle.
    pub triangle_backoff_degrees: f64,
    /// Hex edge receiving the exterior courtyard.
    pub courtyard_edge: usize,
    /// Scale of the interior courtyard relative to the back wing.
    pub courtyard_void_ratio: f64,
    pub driveway_width: f64,
    /// Steepest grade accepted for the driveway ramp.
    pub driveway_max_grade: f64,
    pub edge_length_tolerance: f64,
    pub coordinate_tolerance: f64,
    pub area_tolerance: f64,
    pub snap_tolerance: f64,
    /// Components whose normals face the interior space instead of away from the solid.
    pub inward_normal_components: Vec<String>,
    /// Per-component edge role overrides: component -> edge index -> role name.
    pub edge_overrides: BTreeMap<String, BTreeMap<usize, String>>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let tolerances = Tolerances::default();
        Self {
            side_length: 23.0,
            clearance_distance: 7.0,
            ceiling_height: 12.0,
            slab_thickness: 1.0,
            terrain_drop: 13.0,
            courtyard_enabled: false,
            courtyard_mode: CourtyardMode::None,
            driveway_length: 67.5,
            driveway_flat_length: 50.0,
            driveway_curve_length: 50.0,
            driveway_approach_slope: 0.02,
            axis_correction_degrees: -90.0,
            export_unit_scale: 0.3048,
            explosion_gap: 0.0,
            lower_ground: 0.0,
            atrium_floor_depth: 2.0,
            atrium_clerestory: 3.0,
            atrium_roof_rise: 6.0,
            triangle_backoff_degrees: 0.0,
            courtyard_edge: 4,
            courtyard_void_ratio: 0.4,
            driveway_width: 12.0,
            driveway_max_grade: 0.25,
            edge_length_tolerance: tolerances.edge_length,
            coordinate_tolerance: tolerances.coordinate,
            area_tolerance: tolerances.area,
            snap_tolerance: tolerances.snap,
            inward_normal_components: [
                "courtyard_walls",
                "motorcourt_walls",
                "side_courtyard_right_walls",
                "side_courtyard_left_walls",
                "driveway_walls",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            edge_overrides: BTreeMap::new(),
        }
    }
}

/// Elevations derived from the storey parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Elevations {
    pub lower_ground: f64,
    /// Lower ground plus one storey; the wing floors of the front wings.
    pub upper_ground: f64,
    /// Bottom of the atrium floor slab.
    pub atrium_floor: f64,
    /// Bottom of the master triangle floor slab.
    pub triangle_floor: f64,
    /// Top of the master triangle roof slab.
    pub triangle_top: f64,
    /// Base of the atrium roof.
    pub atrium_roof: f64,
}

impl GeneratorConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Deserialize and validate an already-parsed JSON value.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        let config: Self =
            serde_json::from_value(value).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn tolerances(&self) -> Tolerances {
        Tolerances {
            edge_length: self.edge_length_tolerance,
            coordinate: self.coordinate_tolerance,
            area: self.area_tolerance,
            snap: self.snap_tolerance,
        }
    }

    /// Courtyard placement after applying the enable flag.
    pub fn effective_courtyard(&self) -> CourtyardMode {
        if self.courtyard_enabled {
            self.courtyard_mode
        } else {
            CourtyardMode::None
        }
    }

    pub fn elevations(&self) -> Elevations {
        let t = self.slab_thickness;
        let upper_ground = self.lower_ground + t + self.ceiling_height;
        let triangle_floor = upper_ground + t + self.ceiling_height;
        let triangle_top = triangle_floor + t + self.ceiling_height + t;
        Elevations {
            lower_ground: self.lower_ground,
            upper_ground,
            atrium_floor: self.lower_ground - self.atrium_floor_depth,
            triangle_floor,
            triangle_top,
            atrium_roof: triangle_top + self.atrium_clerestory,
        }
    }

    /// Whether the named component uses the inward normal rule.
    pub fn faces_inward(&self, component: &str) -> bool {
        self.inward_normal_components.iter().any(|c| c == component)
    }

    /// Check every value against its accepted range.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            ("side_length", self.side_length),
            ("clearance_distance", self.clearance_distance),
            ("ceiling_height", self.ceiling_height),
            ("slab_thickness", self.slab_thickness),
            ("terrain_drop", self.terrain_drop),
            ("driveway_length", self.driveway_length),
            ("driveway_flat_length", self.driveway_flat_length),
            ("driveway_curve_length", self.driveway_curve_length),
            ("driveway_approach_slope", self.driveway_approach_slope),
            ("axis_correction_degrees", self.axis_correction_degrees),
            ("export_unit_scale", self.export_unit_scale),
            ("explosion_gap", self.explosion_gap),
            ("lower_ground", self.lower_ground),
            ("atrium_floor_depth", self.atrium_floor_depth),
            ("atrium_clerestory", self.atrium_clerestory),
            ("atrium_roof_rise", self.atrium_roof_rise),
            ("triangle_backoff_degrees", self.triangle_backoff_degrees),
            ("courtyard_void_ratio", self.courtyard_void_ratio),
            ("driveway_width", self.driveway_width),
            ("driveway_max_grade", self.driveway_max_grade),
            ("edge_length_tolerance", self.edge_length_tolerance),
            ("coordinate_tolerance", self.coordinate_tolerance),
            ("area_tolerance", self.area_tolerance),
            ("snap_tolerance", self.snap_tolerance),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(Error::invalid_parameter(name, value, "must be finite"));
            }
        }

        let positive = [
            ("side_length", self.side_length),
            ("ceiling_height", self.ceiling_height),
            ("slab_thickness", self.slab_thickness),
            ("driveway_length", self.driveway_length),
            ("driveway_flat_length", self.driveway_flat_length),
            ("driveway_curve_length", self.driveway_curve_length),
            ("export_unit_scale", self.export_unit_scale),
            ("driveway_width", self.driveway_width),
            ("driveway_max_grade", self.driveway_max_grade),
            ("edge_length_tolerance", self.edge_length_tolerance),
            ("coordinate_tolerance", self.coordinate_tolerance),
            ("area_tolerance", self.area_tolerance),
            ("snap_tolerance", self.snap_tolerance),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(Error::invalid_parameter(name, value, "must be positive"));
            }
        }

        let non_negative = [
            ("clearance_distance", self.clearance_distance),
            ("terrain_drop", self.terrain_drop),
            ("explosion_gap", self.explosion_gap),
            ("atrium_floor_depth", self.atrium_floor_depth),
            ("atrium_clerestory", self.atrium_clerestory),
            ("atrium_roof_rise", self.atrium_roof_rise),
        ];
        for (name, value) in non_negative {
            if value < 0.0 {
                return Err(Error::invalid_parameter(name, value, "must not be negative"));
            }
        }

        if self.driveway_approach_slope < 0.0
            || self.driveway_approach_slope > self.driveway_max_grade
        {
            return Err(Error::invalid_parameter(
                "driveway_approach_slope",
                self.driveway_approach_slope,
                format!("must lie in [0, {}]", self.driveway_max_grade),
            ));
        }

        if self.driveway_width >= self.side_length {
            return Err(Error::invalid_parameter(
                "driveway_width",
                self.driveway_width,
                "must be narrower than the hexagon side",
            ));
        }

        if !(self.courtyard_void_ratio > 0.0 && self.courtyard_void_ratio < 1.0) {
            return Err(Error::invalid_parameter(
                "courtyard_void_ratio",
                self.courtyard_void_ratio,
                "must lie strictly between 0 and 1",
            ));
        }

        if self.snap_tolerance < self.coordinate_tolerance {
            return Err(Error::invalid_parameter(
                "snap_tolerance",
                self.snap_tolerance,
                "must not be smaller than coordinate_tolerance",
            ));
        }

        let storey = self.slab_thickness + self.ceiling_height;
        if self.terrain_drop > storey {
            return Err(Error::invalid_parameter(
                "terrain_drop",
                self.terrain_drop,
                format!("terrain must not fall below the lower ground ({} ft)", storey),
            ));
        }

        if self.courtyard_enabled && self.courtyard_mode == CourtyardMode::None {
            return Err(Error::invalid_parameter(
                "courtyard_mode",
                "none",
                "courtyard_enabled requires a courtyard mode",
            ));
        }

        if self.courtyard_edge >= 6 {
            return Err(Error::invalid_parameter(
                "courtyard_edge",
                self.courtyard_edge,
                "hexagon edge index out of range (0..6)",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GeneratorConfig::default();
        config.validate().unwrap();
        assert_eq!(config.side_length, 23.0);
        assert_eq!(config.effective_courtyard(), CourtyardMode::None);
        assert!(config.faces_inward("driveway_walls"));
        assert!(!config.faces_inward("terrain"));
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let config = GeneratorConfig::from_json_str(r#"{"side_length": 30.0}"#).unwrap();
        assert_eq!(config.side_length, 30.0);
        assert_eq!(config.clearance_distance, 7.0);
        assert_eq!(config.ceiling_height, 12.0);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = GeneratorConfig::from_json_str(r#"{"side_lenght": 30.0}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("side_lenght"));
    }

    #[test]
    fn test_courtyard_mode_names() {
        let config = GeneratorConfig::from_json_str(
            r#"{"courtyard_enabled": true, "courtyard_mode": "exterior_hex"}"#,
        )
        .unwrap();
        assert_eq!(config.effective_courtyard(), CourtyardMode::ExteriorHex);

        let err = GeneratorConfig::from_json_str(r#"{"courtyard_mode": "atrium"}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_disabled_courtyard_ignores_mode() {
        let config =
            GeneratorConfig::from_json_str(r#"{"courtyard_mode": "interior_void"}"#).unwrap();
        assert_eq!(config.effective_courtyard(), CourtyardMode::None);
    }

    #[test]
    fn test_invalid_parameters() {
        for json in [
            r#"{"side_length": 0.0}"#,
            r#"{"side_length": -5.0}"#,
            r#"{"clearance_distance": -1.0}"#,
            r#"{"courtyard_edge": 6}"#,
            r#"{"courtyard_enabled": true}"#,
            r#"{"driveway_width": 40.0}"#,
            r#"{"driveway_approach_slope": 0.5}"#,
            r#"{"terrain_drop": 13.5}"#,
        ] {
            let err = GeneratorConfig::from_json_str(json).unwrap_err();
            assert!(
                matches!(err, Error::InvalidParameter { .. }),
                "{} gave {:?}",
                json,
                err
            );
        }
    }

    #[test]
    fn test_non_finite_tolerances_rejected() {
        let cases = [
            GeneratorConfig {
                area_tolerance: f64::INFINITY,
                ..GeneratorConfig::default()
            },
            GeneratorConfig {
                snap_tolerance: f64::INFINITY,
                ..GeneratorConfig::default()
            },
            GeneratorConfig {
                coordinate_tolerance: f64::NAN,
                ..GeneratorConfig::default()
            },
            GeneratorConfig {
                edge_length_tolerance: f64::NEG_INFINITY,
                ..GeneratorConfig::default()
            },
        ];
        for config in cases {
            let err = config.validate().unwrap_err();
            assert!(
                matches!(err, Error::InvalidParameter { ref reason, .. } if reason == "must be finite"),
                "{:?}",
                err
            );
        }
    }

    #[test]
    fn test_edge_overrides_parse() {
        let config = GeneratorConfig::from_json_str(
            r#"{"edge_overrides": {"wing_b_facade": {"2": "concrete"}}}"#,
        )
        .unwrap();
        assert_eq!(config.edge_overrides["wing_b_facade"][&2], "concrete");
    }

    #[test]
    fn test_elevation_stack() {
        let e = GeneratorConfig::default().elevations();
        assert_eq!(e.upper_ground, 13.0);
        assert_eq!(e.atrium_floor, -2.0);
        assert_eq!(e.triangle_floor, 26.0);
        assert_eq!(e.triangle_top, 40.0);
        assert_eq!(e.atrium_roof, 43.0);
    }

    #[test]
    fn test_json_round_trip() {
        let config = GeneratorConfig::default();
        let json = config.to_json_pretty().unwrap();
        assert_eq!(GeneratorConfig::from_json_str(&json).unwrap(), config);
    }
}
