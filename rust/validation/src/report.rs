// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Validation report types

use hexmass_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One entity (or pair of entities) failing a check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offender {
    pub entities: Vec<String>,
    pub measured: f64,
    pub detail: String,
}

impl Offender {
    pub fn new(entities: Vec<String>, measured: f64, detail: impl Into<String>) -> Self {
        Self {
            entities,
            measured,
            detail: detail.into(),
        }
    }
}

/// Outcome of one named check.
///
/// `measured` is the worst value seen over every entity the check looked
/// at, whether or not it failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub passed: bool,
    pub measured: f64,
    pub tolerance: f64,
    pub offenders: Vec<Offender>,
}

impl CheckResult {
    pub fn new(tolerance: f64) -> Self {
        Self {
            passed: true,
            measured: 0.0,
            tolerance,
            offenders: Vec::new(),
        }
    }

    /// Record a deviation; anything above the tolerance (or NaN) fails.
    pub fn measure(&mut self, entities: Vec<String>, measured: f64, detail: impl Into<String>) {
        if measured > self.measured || measured.is_nan() {
            self.measured = measured;
        }
        if !(measured <= self.tolerance) {
            self.fail(Offender::new(entities, measured, detail));
        }
    }

    pub fn fail(&mut self, offender: Offender) {
        self.passed = false;
        self.offenders.push(offender);
    }
}

/// Mapping from check name to result, plus reported areas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub checks: BTreeMap<String, CheckResult>,
    /// Footprint or plan area per named component, square feet
    pub areas: BTreeMap<String, f64>,
}

impl ValidationReport {
    pub fn insert(&mut self, name: impl Into<String>, check: CheckResult) {
        self.checks.insert(name.into(), check);
    }

    /// Combine two reports; entries of `other` win on name clashes.
    pub fn merge(mut self, other: ValidationReport) -> Self {
        self.checks.extend(other.checks);
        self.areas.extend(other.areas);
        self
    }

    /// Names of the failing checks, sorted.
    pub fn failures(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|(_, c)| !c.passed)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.checks.values().all(|c| c.passed)
    }

    /// `Err(ValidationFailure)` when any check failed.
    pub fn into_result(self) -> Result<Self> {
        let failed: Vec<String> = self.failures().into_iter().map(String::from).collect();
        if failed.is_empty() {
            Ok(self)
        } else {
            Err(Error::ValidationFailure {
                failed: failed.len(),
                checks: failed,
            })
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failures = self.failures();
        writeln!(
            f,
            "{} checks, {} failing",
            self.checks.len(),
            failures.len()
        )?;
        for (name, check) in &self.checks {
            let status = if check.passed { "ok  " } else { "FAIL" };
            writeln!(
                f,
                "  [{}] {} (measured {:e}, tolerance {:e})",
                status, name, check.measured, check.tolerance
            )?;
            for offender in &check.offenders {
                writeln!(
                    f,
                    "         {}: {:e} {}",
                    offender.entities.join(", "),
                    offender.measured,
                    offender.detail
                )?;
            }
        }
        if !self.areas.is_empty() {
            writeln!(f, "areas (sq ft):")?;
            for (name, area) in &self.areas {
                writeln!(f, "  {:<24} {:>12.2}", name, area)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_tracks_worst_value() {
        let mut check = CheckResult::new(1e-6);
        check.measure(vec!["a#0".into()], 1e-9, "");
        check.measure(vec!["a#1".into()], 5e-7, "");
        assert!(check.passed);
        assert_eq!(check.measured, 5e-7);

        check.measure(vec!["a#2".into()], 0.5, "length 23.5");
        assert!(!check.passed);
        assert_eq!(check.offenders.len(), 1);
        assert_eq!(check.offenders[0].entities, vec!["a#2".to_string()]);
    }

    #[test]
    fn test_nan_fails() {
        let mut check = CheckResult::new(1.0);
        check.measure(vec!["x".into()], f64::NAN, "");
        assert!(!check.passed);
    }

    #[test]
    fn test_into_result_lists_failures() {
        let mut report = ValidationReport::default();
        report.insert("equal_edges.atrium_sides", CheckResult::new(1e-6));
        let mut bad = CheckResult::new(1e-6);
        bad.measure(vec!["atrium_floor#2".into()], 0.1, "");
        report.insert("shared_boundary.x", bad);

        assert_eq!(report.failures(), vec!["shared_boundary.x"]);
        match report.clone().into_result() {
            Err(Error::ValidationFailure { failed, checks }) => {
                assert_eq!(failed, 1);
                assert_eq!(checks, vec!["shared_boundary.x".to_string()]);
            }
            other => panic!("unexpected {:?}", other.map(|r| r.checks.len())),
        }
        let text = report.to_string();
        assert!(text.contains("2 checks, 1 failing"));
        assert!(text.contains("[FAIL] shared_boundary.x"));
    }

    #[test]
    fn test_merge_and_json() {
        let mut a = ValidationReport::default();
        a.areas.insert("atrium".into(), 1374.3);
        let mut b = ValidationReport::default();
        b.insert("degenerate_faces", CheckResult::new(1e-6));
        let merged = a.merge(b);
        assert!(merged.is_clean());
        let back = ValidationReport::from_json(&merged.to_json().unwrap()).unwrap();
        assert_eq!(back, merged);
    }
}
