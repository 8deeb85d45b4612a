// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] hexmass_core::Error),

    #[error(transparent)]
    Export(#[from] hexmass_export::ExportError),

    #[error("cannot create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    /// True when the run stopped because the model failed validation.
    pub fn is_validation_failure(&self) -> bool {
        matches!(
            self,
            Self::Core(hexmass_core::Error::ValidationFailure { .. })
                | Self::Export(hexmass_export::ExportError::Core(
                    hexmass_core::Error::ValidationFailure { .. }
                ))
        )
    }
}
