// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error taxonomy shared by every stage of the generation pipeline.

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating, resolving or validating a model.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration value is outside its accepted range.
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    /// The configuration document could not be read or contains unknown keys.
    #[error("configuration error: {0}")]
    Config(String),

    /// A polygon or extrusion rule cannot produce valid faces.
    #[error("topology error in `{entity}`: {reason}")]
    Topology { entity: String, reason: String },

    /// Two edges declared as shared cannot be reconciled by snapping.
    #[error(
        "edge mismatch between {a} and {b}: measured {measured:.6} (expected {expected:.6}, tolerance {tolerance:e})"
    )]
    EdgeMismatch {
        a: String,
        b: String,
        measured: f64,
        expected: f64,
        tolerance: f64,
    },

    /// The validation report contains failing checks.
    #[error("validation failed: {failed} failing check(s): {}", checks.join(", "))]
    ValidationFailure { failed: usize, checks: Vec<String> },
}

impl Error {
    pub fn invalid_parameter(
        name: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn topology(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Topology {
            entity: entity.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_mismatch_names_both_sides() {
        let err = Error::EdgeMismatch {
            a: "wing_a#0".to_string(),
            b: "wing_b#2".to_string(),
            measured: 0.5,
            expected: 23.0,
            tolerance: 1e-6,
        };
        let message = err.to_string();
        assert!(message.contains("wing_a#0"));
        assert!(message.contains("wing_b#2"));
        assert!(message.contains("0.500000"));
    }

    #[test]
    fn test_validation_failure_lists_checks() {
        let err = Error::ValidationFailure {
            failed: 2,
            checks: vec!["degenerate_faces".into(), "elevation_stack".into()],
        };
        assert_eq!(
            err.to_string(),
            "validation failed: 2 failing check(s): degenerate_faces, elevation_stack"
        );
    }
}
