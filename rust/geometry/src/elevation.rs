// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Height fields for the top and bottom of extruded volumes

use hexmass_core::{Error, Result};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Height of a volume boundary as a function of plan position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Elevation {
    Flat(f64),
    Graded(GradedSurface),
}

/// Piecewise-linear profile along one plan axis, constant across it.
///
/// Stations are `(t, z)` pairs sorted by `t`, where `t` is the projection of
/// a point onto `axis` measured from `origin`. Beyond the first and last
/// station the height is clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedSurface {
    pub origin: Point2<f64>,
    pub axis: Vector2<f64>,
    pub stations: Vec<(f64, f64)>,
}

impl GradedSurface {
    pub fn new(origin: Point2<f64>, axis: Vector2<f64>, stations: Vec<(f64, f64)>) -> Result<Self> {
        let axis = axis
            .try_normalize(1e-12)
            .ok_or_else(|| Error::topology("graded_surface", "axis has zero length"))?;
        if stations.is_empty() {
            return Err(Error::topology("graded_surface", "no stations"));
        }
        if stations.windows(2).any(|w| !(w[1].0 > w[0].0)) {
            return Err(Error::topology(
                "graded_surface",
                "stations must be strictly increasing",
            ));
        }
        Ok(Self {
            origin,
            axis,
            stations,
        })
    }

    pub fn station(&self, p: &Point2<f64>) -> f64 {
        (p - self.origin).dot(&self.axis)
    }

    pub fn at(&self, p: &Point2<f64>) -> f64 {
        let t = self.station(p);
        let first = self.stations[0];
        if t <= first.0 {
            return first.1;
        }
        for w in self.stations.windows(2) {
            let (t0, z0) = w[0];
            let (t1, z1) = w[1];
            if t <= t1 {
                return z0 + (z1 - z0) * (t - t0) / (t1 - t0);
            }
        }
        self.stations[self.stations.len() - 1].1
    }

    /// Steepest segment slope, rise over run.
    pub fn max_grade(&self) -> f64 {
        self.stations
            .windows(2)
            .map(|w| ((w[1].1 - w[0].1) / (w[1].0 - w[0].0)).abs())
            .fold(0.0, f64::max)
    }

    pub fn min_height(&self) -> f64 {
        self.stations.iter().map(|s| s.1).fold(f64::INFINITY, f64::min)
    }

    pub fn max_height(&self) -> f64 {
        self.stations
            .iter()
            .map(|s| s.1)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

impl Elevation {
    #[inline]
    pub fn at(&self, p: &Point2<f64>) -> f64 {
        match self {
            Elevation::Flat(z) => *z,
            Elevation::Graded(surface) => surface.at(p),
        }
    }

    /// The same surface moved vertically by `dz`.
    pub fn offset(&self, dz: f64) -> Self {
        match self {
            Elevation::Flat(z) => Elevation::Flat(z + dz),
            Elevation::Graded(surface) => Elevation::Graded(GradedSurface {
                origin: surface.origin,
                axis: surface.axis,
                stations: surface.stations.iter().map(|&(t, z)| (t, z + dz)).collect(),
            }),
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, Elevation::Flat(_))
    }

    pub fn min_height(&self) -> f64 {
        match self {
            Elevation::Flat(z) => *z,
            Elevation::Graded(surface) => surface.min_height(),
        }
    }

    pub fn max_height(&self) -> f64 {
        match self {
            Elevation::Flat(z) => *z,
            Elevation::Graded(surface) => surface.max_height(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn slope() -> GradedSurface {
        GradedSurface::new(
            Point2::new(0.0, 10.0),
            Vector2::new(0.0, 2.0),
            vec![(0.0, 26.0), (20.0, 13.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_graded_surface_interpolates_and_clamps() {
        let s = slope();
        assert_relative_eq!(s.at(&Point2::new(5.0, 0.0)), 26.0);
        assert_relative_eq!(s.at(&Point2::new(-3.0, 20.0)), 19.5);
        assert_relative_eq!(s.at(&Point2::new(0.0, 100.0)), 13.0);
        assert_relative_eq!(s.max_grade(), 0.65);
    }

    #[test]
    fn test_offset_keeps_shape() {
        let e = Elevation::Graded(slope()).offset(-1.0);
        assert_relative_eq!(e.at(&Point2::new(0.0, 20.0)), 18.5);
        assert_relative_eq!(e.min_height(), 12.0);
        assert_relative_eq!(Elevation::Flat(3.0).offset(2.0).at(&Point2::origin()), 5.0);
    }

    #[test]
    fn test_unsorted_stations_rejected() {
        let err = GradedSurface::new(
            Point2::origin(),
            Vector2::x(),
            vec![(1.0, 0.0), (1.0, 2.0)],
        );
        assert!(err.is_err());
    }
}
