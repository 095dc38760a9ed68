// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Bookkeeping for the artifacts CASA leaves on disk.
//!
//! CASA "images" are directories, not files, and a single `tclean` run
//! produces a family of them sharing a base name (`.image`, `.model`,
//! `.psf`, `.residual`, ...). Steps decide whether to run at all by
//! checking for these artifacts, so the naming rules here are part of the
//! pipeline contract: later steps reconstruct earlier steps' output names
//! from the same rules.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// The family of outputs `tclean` (and friends) write for one image base
/// name.
#[derive(Debug, Clone)]
pub(crate) struct ImageSet {
    base: String,
}

impl ImageSet {
    pub(crate) fn new<S: Into<String>>(base: S) -> ImageSet {
        ImageSet { base: base.into() }
    }

    pub(crate) fn base(&self) -> &str {
        &self.base
    }

    /// The restored image, e.g. `x.clean.image`. Its presence is the
    /// idempotency signal for imaging steps.
    pub(crate) fn image(&self) -> PathBuf {
        PathBuf::from(format!("{}.image", self.base))
    }

    /// The model image, needed when forcing the model back into the MS
    /// with `ft`.
    pub(crate) fn model(&self) -> PathBuf {
        PathBuf::from(format!("{}.model", self.base))
    }

    pub(crate) fn exists(&self) -> bool {
        exists(&self.image())
    }

    /// Remove every artifact of this image set (`rm -rf base.*`). Used by
    /// steps that must always regenerate their outputs; `tclean` restarts
    /// from stale products otherwise.
    pub(crate) fn remove_all(&self) -> Result<(), ArtifactError> {
        let pattern = format!("{}.*", glob::Pattern::escape(&self.base));
        for entry in glob::glob(&pattern).expect("glob pattern is valid") {
            let path = entry.map_err(|e| ArtifactError::Glob {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            remove_if_present(&path)?;
        }
        Ok(())
    }
}

/// Does this artifact exist? Covers both plain files and CASA image/table
/// directories.
pub(crate) fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Remove an artifact if it's there, whether it's a file or a directory.
pub(crate) fn remove_if_present(path: &Path) -> Result<(), ArtifactError> {
    match path.symlink_metadata() {
        Err(_) => Ok(()),
        Ok(meta) => {
            log::debug!("Removing existing artifact {}", path.display());
            let result = if meta.is_dir() {
                fs::remove_dir_all(path)
            } else {
                fs::remove_file(path)
            };
            result.map_err(|e| ArtifactError::Remove {
                path: path.to_path_buf(),
                source: e,
            })
        }
    }
}

/// Check that an artifact a previous step should have produced is
/// actually on disk. The usual cause of failure is that the producing
/// step was excluded from this invocation's selection.
pub(crate) fn require_input(path: &Path) -> Result<(), ArtifactError> {
    if exists(path) {
        Ok(())
    } else {
        Err(ArtifactError::MissingInput {
            path: path.to_path_buf(),
        })
    }
}

/// The name of a gain-calibration table for a self-calibration cycle,
/// e.g. `7582_selfcal.ms_cont.ph1.solint_inf.tb`.
pub(crate) fn caltable_name(vis: &str, cycle: &str, solint: &str) -> PathBuf {
    PathBuf::from(format!("{vis}_cont.{cycle}.solint_{solint}.tb"))
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Input artifact {path} does not exist; was the step that produces it excluded from this run?")]
    MissingInput { path: PathBuf },

    #[error("Couldn't remove existing artifact {path}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Error while globbing '{pattern}': {message}")]
    Glob { pattern: String, message: String },

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
