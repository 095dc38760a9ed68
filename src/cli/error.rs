// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all casapipe-related errors. This should be the *only*
//! error enum that is publicly visible.

use std::path::PathBuf;

use thiserror::Error;

use crate::artifacts::ArtifactError;
use crate::casa::CasaError;
use crate::cli::common::CommonArgsError;
use crate::cli::continuum::ContinuumArgsError;
use crate::cli::feather::FeatherArgsError;
use crate::cli::line::LineArgsError;
use crate::cli::quicklook::QuicklookArgsError;
use crate::cli::selfcal::SelfcalArgsError;
use crate::pipeline::PipelineError;
use crate::unit_parsing::UnitParseError;

#[derive(Error, Debug)]
pub enum CasapipeError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Casa(#[from] CasaError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Units(#[from] UnitParseError),

    #[error(transparent)]
    CommonArgs(#[from] CommonArgsError),

    #[error(transparent)]
    SelfcalArgs(#[from] SelfcalArgsError),

    #[error(transparent)]
    ContinuumArgs(#[from] ContinuumArgsError),

    #[error(transparent)]
    LineArgs(#[from] LineArgsError),

    #[error(transparent)]
    FeatherArgs(#[from] FeatherArgsError),

    #[error(transparent)]
    QuicklookArgs(#[from] QuicklookArgsError),

    #[error(transparent)]
    ArgFile(#[from] ArgFileError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

/// Problems with TOML/JSON arguments files.
#[derive(Error, Debug)]
pub enum ArgFileError {
    #[error("Couldn't read arguments file {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Couldn't parse arguments file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Don't know how to read arguments file {path}; supported extensions are: {supported}")]
    UnrecognisedType { path: PathBuf, supported: String },
}
