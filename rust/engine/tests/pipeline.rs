// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use hexmass_core::GeneratorConfig;
use hexmass_engine::{export, generate, validate_glb_file, EngineError, ExportPolicy, ExportRequest};
use hexmass_validation::{CheckResult, Offender, ValidationReport};
use std::path::PathBuf;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hexmass-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn test_export_writes_all_artifacts() {
    let dir = scratch_dir("export");
    let generation = generate(&GeneratorConfig::default()).unwrap();
    let paths = export(&generation, &ExportRequest::new(&dir)).unwrap();

    assert_eq!(paths.glb, dir.join("massing_s23_d7.glb"));
    assert_eq!(paths.svg, dir.join("plan_s23_d7.svg"));
    assert_eq!(paths.report, dir.join("report_s23_d7.json"));
    assert_eq!(paths.summary, dir.join("summary_s23_d7.txt"));
    for path in [&paths.glb, &paths.svg, &paths.report, &paths.summary] {
        assert!(std::fs::metadata(path).unwrap().len() > 0, "{}", path.display());
    }

    let report = validate_glb_file(&paths.glb).unwrap();
    assert!(report.is_clean(), "{}", report);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_strict_policy_writes_nothing_for_failing_model() {
    let dir = scratch_dir("strict");
    let mut broken = CheckResult::new(0.0);
    broken.fail(Offender::new(vec!["atrium".to_string()], 1.0, "injected"));
    let mut extra = ValidationReport::default();
    extra.insert("injected", broken);
    let generation = generate(&GeneratorConfig::default()).unwrap().with_checks(extra);
    assert!(!generation.is_clean());

    let err = export(&generation, &ExportRequest::new(&dir)).unwrap_err();
    assert!(err.is_validation_failure());
    assert!(matches!(
        err,
        EngineError::Core(hexmass_core::Error::ValidationFailure { failed: 1, .. })
    ));
    assert!(!dir.exists());

    let request = ExportRequest::new(&dir).with_policy(ExportPolicy::AllowViolations);
    let paths = export(&generation, &request).unwrap();
    let report = std::fs::read_to_string(&paths.report).unwrap();
    assert!(report.contains("injected"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_validate_missing_file() {
    let missing = scratch_dir("missing").join("nothing.glb");
    assert!(matches!(
        validate_glb_file(&missing),
        Err(EngineError::Export(hexmass_export::ExportError::Io { .. }))
    ));
}
