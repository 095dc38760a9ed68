// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Arguments for spectral-line imaging: split the target, subtract the
//! continuum, make a dirty cube, clean each requested line chunk.


use std::path::PathBuf;

use clap::Parser;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vec1::Vec1;

use super::common::{
    parse_cell, parse_imsize, parse_threshold, validate_channel_selection, DataColumn,
    StepSelectionArgs, ARG_FILE_HELP, DATA_COLUMN_HELP,
};
use crate::cli::CasapipeError;
use crate::params::{LineChunk, LineChunkParseError, LineParams};

pub(super) const DEFAULT_NITER: i64 = 100_000;
pub(super) const DEFAULT_ROBUST: f64 = 0.5;
pub(super) const DEFAULT_LINE_SPW: &str = "0";
pub(super) const DEFAULT_MASKTYPE: &str = "auto-multithresh";

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct LineArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// Path to the measurement set.
    #[clap(short = 'd', long, help_heading = "INPUT DATA")]
    pub(super) vis: Option<String>,

    /// The name of the target field, e.g. NGC7582.
    #[clap(short, long, help_heading = "INPUT DATA")]
    pub(super) field: Option<String>,

    /// The science spectral windows to split out, e.g. 0.
    #[clap(long, help_heading = "INPUT DATA")]
    pub(super) spw: Option<String>,

    /// The spectral window to image, numbered after the split
    /// (default: 0).
    #[clap(long, help_heading = "INPUT DATA")]
    pub(super) line_spw: Option<String>,

    #[clap(long, help = DATA_COLUMN_HELP.as_str(), help_heading = "INPUT DATA")]
    pub(super) datacolumn: Option<String>,

    /// The base name of the output images (default: the field name).
    #[clap(long, help_heading = "IMAGING")]
    pub(super) image_base: Option<String>,

    /// The line-free channel selection used to fit the continuum,
    /// e.g. '0:229.02~229.13GHz;229.57~230.23GHz'.
    #[clap(long, help_heading = "IMAGING")]
    pub(super) cont_channels: Option<String>,

    /// The spectral chunks to clean, each as 'start:width:nchan',
    /// e.g. 186:1:113.
    #[clap(long, multiple_values(true), help_heading = "IMAGING")]
    pub(super) chunks: Option<Vec<String>>,

    /// The image size in pixels. One value for a square image, two for a
    /// rectangular one. Values are rounded up to CASA's optimum size.
    #[clap(long, multiple_values(true), max_values(2), help_heading = "IMAGING")]
    pub(super) imsize: Option<Vec<i64>>,

    /// The cell (pixel) size, e.g. 0.04arcsec.
    #[clap(long, help_heading = "IMAGING")]
    pub(super) cell: Option<String>,

    /// The phase centre, e.g. 'ICRS 23:18:23.60 -42.22.14.00000'.
    #[clap(long, help_heading = "IMAGING")]
    pub(super) phasecenter: Option<String>,

    /// The cleaning iteration limit. Set to 0 for a dirty-only run.
    #[clap(long, help_heading = "CLEANING")]
    pub(super) niter: Option<i64>,

    /// The cleaning threshold, e.g. 2.1mJy.
    #[clap(long, help_heading = "CLEANING")]
    pub(super) threshold: Option<String>,

    /// The Briggs robustness parameter.
    #[clap(long, help_heading = "CLEANING")]
    pub(super) robust: Option<f64>,

    /// The masking mode (default: auto-multithresh).
    #[clap(long, help_heading = "CLEANING")]
    pub(super) masktype: Option<String>,

    #[clap(flatten)]
    #[serde(default)]
    pub(super) selection: StepSelectionArgs,
}

impl LineArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was
    /// specified into a single struct. Where applicable, it will prefer
    /// CLI parameters over those in the file.
    pub(super) fn merge(self) -> Result<LineArgs, CasapipeError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Ensure all of the file args are accounted for by pattern
            // matching.
            let LineArgs {
                args_file: _,
                vis,
                field,
                spw,
                line_spw,
                datacolumn,
                image_base,
                cont_channels,
                chunks,
                imsize,
                cell,
                phasecenter,
                niter,
                threshold,
                robust,
                masktype,
                selection,
            } = unpack_arg_file!(arg_file);

            Ok(LineArgs {
                args_file: None,
                vis: cli_args.vis.or(vis),
                field: cli_args.field.or(field),
                spw: cli_args.spw.or(spw),
                line_spw: cli_args.line_spw.or(line_spw),
                datacolumn: cli_args.datacolumn.or(datacolumn),
                image_base: cli_args.image_base.or(image_base),
                cont_channels: cli_args.cont_channels.or(cont_channels),
                chunks: cli_args.chunks.or(chunks),
                imsize: cli_args.imsize.or(imsize),
                cell: cli_args.cell.or(cell),
                phasecenter: cli_args.phasecenter.or(phasecenter),
                niter: cli_args.niter.or(niter),
                threshold: cli_args.threshold.or(threshold),
                robust: cli_args.robust.or(robust),
                masktype: cli_args.masktype.or(masktype),
                selection: cli_args.selection.merge(selection),
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<LineParams, CasapipeError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            vis,
            field,
            spw,
            line_spw,
            datacolumn,
            image_base,
            cont_channels,
            chunks,
            imsize,
            cell,
            phasecenter,
            niter,
            threshold,
            robust,
            masktype,
            selection,
        } = self;

        let vis = vis.ok_or(LineArgsError::NoVis)?;
        let field = field.ok_or(LineArgsError::NoField)?;
        let cont_channels = cont_channels.ok_or(LineArgsError::NoContChannels)?;
        validate_channel_selection(&cont_channels)?;
        if let Some(spw) = spw.as_deref() {
            validate_channel_selection(spw)?;
        }

        let chunks = chunks
            .unwrap_or_default()
            .iter()
            .map(|c| c.parse::<LineChunk>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(LineArgsError::from)?;
        let chunks = Vec1::try_from_vec(chunks).map_err(|_| LineArgsError::NoChunks)?;

        let cell = parse_cell(cell.ok_or(LineArgsError::NoCell)?)?;
        let threshold = threshold
            .map(parse_threshold)
            .transpose()?
            .unwrap_or_else(|| "0.0mJy".to_string());
        let imsize = parse_imsize(imsize.ok_or(LineArgsError::NoImsize)?, true)?;
        let datacolumn = DataColumn::parse(datacolumn.as_deref())?;

        Ok(LineParams {
            image_base: image_base.unwrap_or_else(|| field.clone()),
            vis,
            field,
            spw,
            line_spw: line_spw.unwrap_or_else(|| DEFAULT_LINE_SPW.to_string()),
            datacolumn,
            cont_channels,
            chunks,
            imsize,
            cell,
            phasecenter,
            niter: niter.unwrap_or(DEFAULT_NITER),
            threshold,
            robust: robust.unwrap_or(DEFAULT_ROBUST),
            masktype: masktype.unwrap_or_else(|| DEFAULT_MASKTYPE.to_string()),
            selection,
        })
    }
}

#[derive(Debug, Error)]
pub enum LineArgsError {
    #[error("No measurement set was supplied (--vis)")]
    NoVis,

    #[error("No target field was supplied (--field)")]
    NoField,

    #[error("No line-free channel selection was supplied (--cont-channels)")]
    NoContChannels,

    #[error("No spectral chunks were supplied (--chunks)")]
    NoChunks,

    #[error(transparent)]
    BadChunk(#[from] LineChunkParseError),

    #[error("No cell size was supplied (--cell)")]
    NoCell,

    #[error("No image size was supplied (--imsize)")]
    NoImsize,
}
