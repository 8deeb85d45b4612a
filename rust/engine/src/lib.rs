// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # hexmass engine
//!
//! One facade over the pipeline stages, shared by every front end.
//!
//! - [`generate`] runs plan, scene and validation and returns a
//!   [`Generation`]; nothing is written
//! - [`export`] writes the artifacts of a generation, subject to an
//!   [`ExportPolicy`]
//! - [`validate_glb_file`] validates a previously written model without
//!   regenerating it
//!
//! ```rust,no_run
//! use hexmass_core::GeneratorConfig;
//! use hexmass_engine::{export, generate, ExportRequest};
//!
//! let generation = generate(&GeneratorConfig::default()).unwrap();
//! let written = export(&generation, &ExportRequest::new("out")).unwrap();
//! println!("{}", written.glb.display());
//! ```

mod error;

pub use error::{EngineError, Result};

use hexmass_core::{generate_plan, GeneratorConfig, Plan};
use hexmass_export::{write_glb_file, write_svg_file, ExportError, SvgOptions};
use hexmass_geometry::{build_scene, Scene};
use hexmass_validation::{validate, validate_plan, ValidationReport};
use serde::Serialize;
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Outcome of one generation run.
#[derive(Debug, Clone)]
pub struct Generation {
    config: GeneratorConfig,
    plan: Plan,
    scene: Scene,
    report: ValidationReport,
}

impl Generation {
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Scene and plan checks merged
    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    pub fn into_report(self) -> ValidationReport {
        self.report
    }

    /// Fold checks run by a front end into the report gating [`export`].
    pub fn with_checks(mut self, extra: ValidationReport) -> Self {
        self.report = self.report.merge(extra);
        self
    }

    pub fn is_clean(&self) -> bool {
        self.report.is_clean()
    }
}

/// Whether export may proceed while validation reports failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportPolicy {
    /// Refuse to write anything for a failing model.
    #[default]
    Strict,
    /// Write artifacts regardless, for diagnosis.
    AllowViolations,
}

#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub out_dir: PathBuf,
    pub policy: ExportPolicy,
    pub svg: SvgOptions,
}

impl ExportRequest {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            policy: ExportPolicy::default(),
            svg: SvgOptions::default(),
        }
    }

    pub fn with_policy(mut self, policy: ExportPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Paths written by [`export`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPaths {
    pub glb: PathBuf,
    pub svg: PathBuf,
    pub report: PathBuf,
    pub summary: PathBuf,
}

/// Run the whole pipeline for one configuration.
///
/// Fails on invalid parameters or topology errors. Validation failures do
/// not fail the run; they are in [`Generation::report`].
pub fn generate(config: &GeneratorConfig) -> Result<Generation> {
    config.validate()?;
    let plan = generate_plan(config)?;
    let scene = build_scene(&plan, config)?;
    let report = validate(&scene).merge(validate_plan(&plan, config));

    tracing::info!(
        volumes = scene.volumes().len(),
        faces = scene.face_count(),
        failures = report.failures().len(),
        "Generation finished"
    );
    Ok(Generation {
        config: config.clone(),
        plan,
        scene,
        report,
    })
}

/// File stem shared by all artifacts of one configuration, e.g. `s23_d7`.
pub fn artifact_stem(config: &GeneratorConfig) -> String {
    format!("s{}_d{}", config.side_length, config.clearance_distance)
}

/// Write GLB, SVG, report JSON and text summary into `request.out_dir`.
pub fn export(generation: &Generation, request: &ExportRequest) -> Result<ArtifactPaths> {
    if request.policy == ExportPolicy::Strict {
        generation.report.clone().into_result()?;
    } else if !generation.is_clean() {
        tracing::warn!(
            failures = ?generation.report.failures(),
            "Exporting a model that failed validation"
        );
    }

    let dir = &request.out_dir;
    std::fs::create_dir_all(dir).map_err(|source| EngineError::OutputDir {
        path: dir.clone(),
        source,
    })?;

    let stem = artifact_stem(&generation.config);
    let paths = ArtifactPaths {
        glb: dir.join(format!("massing_{}.glb", stem)),
        svg: dir.join(format!("plan_{}.svg", stem)),
        report: dir.join(format!("report_{}.json", stem)),
        summary: dir.join(format!("summary_{}.txt", stem)),
    };

    write_glb_file(&generation.scene, &paths.glb)?;
    write_svg_file(
        &generation.plan,
        Some(&generation.scene),
        &request.svg,
        &paths.svg,
    )?;
    let report = generation.report.to_json().map_err(ExportError::from)?;
    write_text(&paths.report, &report)?;
    write_text(&paths.summary, &summary(generation))?;

    tracing::info!(dir = %dir.display(), stem = %stem, "Exported artifacts");
    Ok(paths)
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).map_err(|e| ExportError::io(path, e))?;
    Ok(())
}

/// Human-readable digest of a generation run.
pub fn summary(generation: &Generation) -> String {
    let config = &generation.config;
    let mut out = String::new();
    let _ = writeln!(out, "hexmass {}", artifact_stem(config));
    let _ = writeln!(
        out,
        "side {} ft, clearance {} ft, courtyard {:?}, gap {} ft",
        config.side_length,
        config.clearance_distance,
        config.effective_courtyard(),
        config.explosion_gap
    );
    let _ = writeln!(
        out,
        "{} volumes, {} faces",
        generation.scene.volumes().len(),
        generation.scene.face_count()
    );
    let _ = writeln!(out);
    let _ = write!(out, "{}", generation.report);
    out
}

/// Read a GLB written by [`export`] and run the scene checks on it.
///
/// Plan-level checks need the plan and are not part of the result.
pub fn validate_glb_file(path: impl AsRef<Path>) -> Result<ValidationReport> {
    let path = path.as_ref();
    let scene = hexmass_export::read_glb_file(path)?;
    let report = validate(&scene);
    tracing::info!(
        path = %path.display(),
        failures = report.failures().len(),
        "Validated model file"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_stem() {
        assert_eq!(artifact_stem(&GeneratorConfig::default()), "s23_d7");
        let config = GeneratorConfig {
            side_length: 30.5,
            clearance_distance: 0.0,
            ..GeneratorConfig::default()
        };
        assert_eq!(artifact_stem(&config), "s30.5_d0");
    }

    #[test]
    fn test_generate_rejects_invalid_parameters() {
        let config = GeneratorConfig {
            side_length: -1.0,
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            generate(&config),
            Err(EngineError::Core(hexmass_core::Error::InvalidParameter { .. }))
        ));
    }

    #[test]
    fn test_default_generation_is_clean() {
        let generation = generate(&GeneratorConfig::default()).unwrap();
        assert!(generation.is_clean(), "{}", generation.report());
        assert!(generation.report().checks.contains_key("plan.hexagon_sides"));
        assert!(generation.report().checks.contains_key("normal_orientation"));
        assert_eq!(generation.config(), &GeneratorConfig::default());
        assert_eq!(generation.plan().wings.len(), 3);
    }

    #[test]
    fn test_summary_lists_checks() {
        let generation = generate(&GeneratorConfig::default()).unwrap();
        let text = summary(&generation);
        assert!(text.starts_with("hexmass s23_d7"));
        assert!(text.contains("0 failing"));
    }
}
