// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Face winding correction
//!
//! Runs last, after shared-edge resolution has moved vertices.

use crate::scene::{Face, NormalRule, Scene, Volume};
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrectionStats {
    pub faces: usize,
    pub flipped: usize,
}

/// Signed agreement between a face normal and the direction away from the
/// solid: positive when the face points out of its volume.
pub fn outward_alignment(volume: &Volume, face: &Face) -> f64 {
    let vertices = volume.vertices();
    let reference = face.anchor.unwrap_or_else(|| volume.centroid());
    let away = face.centroid(vertices) - reference;
    face.normal(vertices).dot(&away)
}

/// Whether the face satisfies its volume's normal rule.
pub fn satisfies_rule(volume: &Volume, face: &Face) -> bool {
    let alignment = outward_alignment(volume, face);
    match volume.normal_rule() {
        NormalRule::Outward => alignment >= 0.0,
        NormalRule::Inward => alignment <= 0.0,
    }
}

/// Flip every face that violates its volume's rule and mark all faces as
/// verified.
pub fn correct_normals(scene: &mut Scene) -> CorrectionStats {
    let stats = scene
        .volumes_mut()
        .par_iter_mut()
        .map(correct_volume)
        .reduce(CorrectionStats::default, |a, b| CorrectionStats {
            faces: a.faces + b.faces,
            flipped: a.flipped + b.flipped,
        });

    tracing::info!(
        faces = stats.faces,
        flipped = stats.flipped,
        "Corrected face winding"
    );
    stats
}

pub fn correct_volume(volume: &mut Volume) -> CorrectionStats {
    let flips: Vec<bool> = volume
        .faces()
        .iter()
        .map(|face| !satisfies_rule(volume, face))
        .collect();

    let mut stats = CorrectionStats {
        faces: flips.len(),
        flipped: 0,
    };
    for (face, flip) in volume.faces_mut().iter_mut().zip(flips) {
        if flip {
            face.reverse();
            stats.flipped += 1;
        }
        face.outward = true;
    }

    if stats.flipped > 0 {
        tracing::debug!(
            volume = %volume.name(),
            flipped = stats.flipped,
            "Flipped faces"
        );
    }
    stats
}
