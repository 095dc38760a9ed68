// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Arguments for continuum imaging: split the target, make a dirty
//! continuum image, make a clean continuum image.

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use clap::Parser;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::common::{
    parse_cell, parse_imsize, parse_threshold, validate_channel_selection, DataColumn,
    StepSelectionArgs, ARG_FILE_HELP, DATA_COLUMN_HELP,
};
use crate::cli::CasapipeError;
use crate::params::ContinuumParams;

pub(super) const DEFAULT_NITER: i64 = 1_000_000;
pub(super) const DEFAULT_ROBUST: f64 = 0.5;
pub(super) const DEFAULT_GRIDDER: &str = "mosaic";
pub(super) const DEFAULT_DECONVOLVER: &str = "hogbom";
pub(super) const DEFAULT_WEIGHTING: &str = "briggs";
pub(super) const DEFAULT_MASKTYPE: &str = "auto-multithresh";

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct ContinuumArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// Path to the measurement set.
    #[clap(short = 'd', long, help_heading = "INPUT DATA")]
    pub(super) vis: Option<String>,

    /// The name of the target field, e.g. PN_Hb_5.
    #[clap(short, long, help_heading = "INPUT DATA")]
    pub(super) field: Option<String>,

    /// The science spectral windows to split out, e.g. 25,27,29,31.
    #[clap(long, help_heading = "INPUT DATA")]
    pub(super) spw: Option<String>,

    #[clap(long, help = DATA_COLUMN_HELP.as_str(), help_heading = "INPUT DATA")]
    pub(super) datacolumn: Option<String>,

    /// The line-free channel selection that defines the continuum,
    /// e.g. '0:226.20~226.26GHz;226.39~226.56GHz,1:230.07~230.19GHz'.
    #[clap(long, help_heading = "IMAGING")]
    pub(super) cont_channels: Option<String>,

    /// The image size in pixels. One value for a square image, two for a
    /// rectangular one.
    #[clap(long, multiple_values(true), max_values(2), help_heading = "IMAGING")]
    pub(super) imsize: Option<Vec<i64>>,

    /// The cell (pixel) size, e.g. 0.22arcsec.
    #[clap(long, help_heading = "IMAGING")]
    pub(super) cell: Option<String>,

    /// The phase centre, e.g. 'ICRS 17:47:56.2008 -029.59.39.588'.
    #[clap(long, help_heading = "IMAGING")]
    pub(super) phasecenter: Option<String>,

    /// The cleaning iteration limit. Set to 0 for a dirty-only run.
    #[clap(long, help_heading = "CLEANING")]
    pub(super) niter: Option<i64>,

    /// The cleaning threshold, e.g. 1.17mJy.
    #[clap(long, help_heading = "CLEANING")]
    pub(super) threshold: Option<String>,

    /// The Briggs robustness parameter.
    #[clap(long, help_heading = "CLEANING")]
    pub(super) robust: Option<f64>,

    /// The tclean gridder (default: mosaic).
    #[clap(long, help_heading = "CLEANING")]
    pub(super) gridder: Option<String>,

    /// The tclean deconvolver (default: hogbom).
    #[clap(long, help_heading = "CLEANING")]
    pub(super) deconvolver: Option<String>,

    /// The masking mode (default: auto-multithresh).
    #[clap(long, help_heading = "CLEANING")]
    pub(super) masktype: Option<String>,

    #[clap(flatten)]
    #[serde(default)]
    pub(super) selection: StepSelectionArgs,
}

impl ContinuumArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was
    /// specified into a single struct. Where applicable, it will prefer
    /// CLI parameters over those in the file.
    pub(super) fn merge(self) -> Result<ContinuumArgs, CasapipeError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Ensure all of the file args are accounted for by pattern
            // matching.
            let ContinuumArgs {
                args_file: _,
                vis,
                field,
                spw,
                datacolumn,
                cont_channels,
                imsize,
                cell,
                phasecenter,
                niter,
                threshold,
                robust,
                gridder,
                deconvolver,
                masktype,
                selection,
            } = unpack_arg_file!(arg_file);

            Ok(ContinuumArgs {
                args_file: None,
                vis: cli_args.vis.or(vis),
                field: cli_args.field.or(field),
                spw: cli_args.spw.or(spw),
                datacolumn: cli_args.datacolumn.or(datacolumn),
                cont_channels: cli_args.cont_channels.or(cont_channels),
                imsize: cli_args.imsize.or(imsize),
                cell: cli_args.cell.or(cell),
                phasecenter: cli_args.phasecenter.or(phasecenter),
                niter: cli_args.niter.or(niter),
                threshold: cli_args.threshold.or(threshold),
                robust: cli_args.robust.or(robust),
                gridder: cli_args.gridder.or(gridder),
                deconvolver: cli_args.deconvolver.or(deconvolver),
                masktype: cli_args.masktype.or(masktype),
                selection: cli_args.selection.merge(selection),
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<ContinuumParams, CasapipeError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            vis,
            field,
            spw,
            datacolumn,
            cont_channels,
            imsize,
            cell,
            phasecenter,
            niter,
            threshold,
            robust,
            gridder,
            deconvolver,
            masktype,
            selection,
        } = self;

        let vis = vis.ok_or(ContinuumArgsError::NoVis)?;
        let field = field.ok_or(ContinuumArgsError::NoField)?;
        let cont_channels = cont_channels.ok_or(ContinuumArgsError::NoContChannels)?;
        validate_channel_selection(&cont_channels)?;
        if let Some(spw) = spw.as_deref() {
            validate_channel_selection(spw)?;
        }

        let cell = parse_cell(cell.ok_or(ContinuumArgsError::NoCell)?)?;
        let threshold = threshold
            .map(parse_threshold)
            .transpose()?
            .unwrap_or_else(|| "0.0mJy".to_string());
        let imsize = parse_imsize(imsize.ok_or(ContinuumArgsError::NoImsize)?, false)?;
        let datacolumn = DataColumn::parse(datacolumn.as_deref())?;

        Ok(ContinuumParams {
            image_base: field.clone(),
            vis,
            field,
            spw,
            datacolumn,
            cont_channels,
            imsize,
            cell,
            phasecenter,
            niter: niter.unwrap_or(DEFAULT_NITER),
            threshold,
            robust: robust.unwrap_or(DEFAULT_ROBUST),
            gridder: gridder.unwrap_or_else(|| DEFAULT_GRIDDER.to_string()),
            deconvolver: deconvolver.unwrap_or_else(|| DEFAULT_DECONVOLVER.to_string()),
            weighting: DEFAULT_WEIGHTING.to_string(),
            masktype: masktype.unwrap_or_else(|| DEFAULT_MASKTYPE.to_string()),
            selection,
        })
    }
}

#[derive(Debug, Error)]
pub enum ContinuumArgsError {
    #[error("No measurement set was supplied (--vis)")]
    NoVis,

    #[error("No target field was supplied (--field)")]
    NoField,

    #[error("No line-free channel selection was supplied (--cont-channels)")]
    NoContChannels,

    #[error("No cell size was supplied (--cell)")]
    NoCell,

    #[error("No image size was supplied (--imsize)")]
    NoImsize,
}
