// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Arguments for continuum self-calibration: an initial model, then
//! four rounds of gaincal/applycal/re-image.


use std::path::PathBuf;

use clap::Parser;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::common::{
    parse_cell, parse_imsize, validate_channel_selection, StepSelectionArgs, ARG_FILE_HELP,
};
use crate::cli::CasapipeError;
use crate::constants::{DEFAULT_MIN_SNR, DEFAULT_SOLINT_SWEEP};
use crate::params::SelfcalParams;

pub(super) const DEFAULT_NITER_INITIAL: i64 = 200;
pub(super) const DEFAULT_NITER_FINAL: i64 = 300;
pub(super) const DEFAULT_SCALES: [i64; 4] = [0, 4, 8, 12];

lazy_static::lazy_static! {
    static ref SOLINT_SWEEP_HELP: String = format!(
        "The solution intervals tried by the exploration steps. Default: {}",
        DEFAULT_SOLINT_SWEEP.join(" ")
    );
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct SelfcalArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// Path to the measurement set.
    #[clap(short = 'd', long, help_heading = "INPUT DATA")]
    pub(super) vis: Option<String>,

    /// The name of the target field, e.g. NGC7582.
    #[clap(short, long, help_heading = "INPUT DATA")]
    pub(super) field: Option<String>,

    /// The reference antenna, e.g. DV14.
    #[clap(long, help_heading = "CALIBRATION")]
    pub(super) refant: Option<String>,

    /// The line-free channel selection the gains are solved on,
    /// e.g. '0:166~194;304~475,1:50~172'.
    #[clap(long, help_heading = "CALIBRATION")]
    pub(super) cont_channels: Option<String>,

    /// The spectral windows the solutions are applied to (default: 0 1).
    #[clap(long, multiple_values(true), help_heading = "CALIBRATION")]
    pub(super) apply_spw: Option<Vec<i64>>,

    /// The minimum SNR for a gain solution (default: 3).
    #[clap(long, help_heading = "CALIBRATION")]
    pub(super) min_snr: Option<f64>,

    #[clap(long, multiple_values(true), help = SOLINT_SWEEP_HELP.as_str(), help_heading = "CALIBRATION")]
    pub(super) solint_sweep: Option<Vec<String>>,

    /// The cell (pixel) size, e.g. 0.018arcsec.
    #[clap(long, help_heading = "IMAGING")]
    pub(super) cell: Option<String>,

    /// The image size in pixels. One value for a square image, two for a
    /// rectangular one.
    #[clap(long, multiple_values(true), max_values(2), help_heading = "IMAGING")]
    pub(super) imsize: Option<Vec<i64>>,

    /// A user-drawn clean mask applied to every clean,
    /// e.g. 7582_cont_cleanmask.mask.
    #[clap(long, help_heading = "IMAGING")]
    pub(super) mask: Option<String>,

    /// The iteration limit of the conservative cleans (default: 200).
    #[clap(long, help_heading = "IMAGING")]
    pub(super) niter_initial: Option<i64>,

    /// The iteration limit of the last two cleans (default: 300).
    #[clap(long, help_heading = "IMAGING")]
    pub(super) niter_final: Option<i64>,

    /// The multiscale scales of the final clean, in pixels
    /// (default: 0 4 8 12).
    #[clap(long, multiple_values(true), help_heading = "IMAGING")]
    pub(super) scales: Option<Vec<i64>>,

    /// An imstat region free of source signal, for the rms diagnostic
    /// after each clean, e.g. 'ellipse[[1142pix,632pix],[253pix,708pix],0deg]'.
    #[clap(long, help_heading = "DIAGNOSTICS")]
    pub(super) noise_region: Option<String>,

    /// An imstat region containing the target, for the peak diagnostic
    /// after each clean.
    #[clap(long, help_heading = "DIAGNOSTICS")]
    pub(super) peak_region: Option<String>,

    #[clap(flatten)]
    #[serde(default)]
    pub(super) selection: StepSelectionArgs,
}

impl SelfcalArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was
    /// specified into a single struct. Where applicable, it will prefer
    /// CLI parameters over those in the file.
    pub(super) fn merge(self) -> Result<SelfcalArgs, CasapipeError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Ensure all of the file args are accounted for by pattern
            // matching.
            let SelfcalArgs {
                args_file: _,
                vis,
                field,
                refant,
                cont_channels,
                apply_spw,
                min_snr,
                solint_sweep,
                cell,
                imsize,
                mask,
                niter_initial,
                niter_final,
                scales,
                noise_region,
                peak_region,
                selection,
            } = unpack_arg_file!(arg_file);

            Ok(SelfcalArgs {
                args_file: None,
                vis: cli_args.vis.or(vis),
                field: cli_args.field.or(field),
                refant: cli_args.refant.or(refant),
                cont_channels: cli_args.cont_channels.or(cont_channels),
                apply_spw: cli_args.apply_spw.or(apply_spw),
                min_snr: cli_args.min_snr.or(min_snr),
                solint_sweep: cli_args.solint_sweep.or(solint_sweep),
                cell: cli_args.cell.or(cell),
                imsize: cli_args.imsize.or(imsize),
                mask: cli_args.mask.or(mask),
                niter_initial: cli_args.niter_initial.or(niter_initial),
                niter_final: cli_args.niter_final.or(niter_final),
                scales: cli_args.scales.or(scales),
                noise_region: cli_args.noise_region.or(noise_region),
                peak_region: cli_args.peak_region.or(peak_region),
                selection: cli_args.selection.merge(selection),
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<SelfcalParams, CasapipeError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            vis,
            field,
            refant,
            cont_channels,
            apply_spw,
            min_snr,
            solint_sweep,
            cell,
            imsize,
            mask,
            niter_initial,
            niter_final,
            scales,
            noise_region,
            peak_region,
            selection,
        } = self;

        let vis = vis.ok_or(SelfcalArgsError::NoVis)?;
        let field = field.ok_or(SelfcalArgsError::NoField)?;
        let refant = refant.ok_or(SelfcalArgsError::NoRefant)?;
        let cont_channels = cont_channels.ok_or(SelfcalArgsError::NoContChannels)?;
        validate_channel_selection(&cont_channels)?;

        let cell = parse_cell(cell.ok_or(SelfcalArgsError::NoCell)?)?;
        let imsize = parse_imsize(imsize.ok_or(SelfcalArgsError::NoImsize)?, false)?;

        Ok(SelfcalParams {
            vis,
            field,
            refant,
            cont_channels,
            cell,
            imsize,
            apply_spw: apply_spw.unwrap_or_else(|| vec![0, 1]),
            mask,
            min_snr: min_snr.unwrap_or(DEFAULT_MIN_SNR),
            solint_sweep: solint_sweep.unwrap_or_else(|| {
                DEFAULT_SOLINT_SWEEP.iter().map(|s| s.to_string()).collect()
            }),
            niter_initial: niter_initial.unwrap_or(DEFAULT_NITER_INITIAL),
            niter_final: niter_final.unwrap_or(DEFAULT_NITER_FINAL),
            scales: scales.unwrap_or_else(|| DEFAULT_SCALES.to_vec()),
            noise_region,
            peak_region,
            selection,
        })
    }
}

#[derive(Debug, Error)]
pub enum SelfcalArgsError {
    #[error("No measurement set was supplied (--vis)")]
    NoVis,

    #[error("No target field was supplied (--field)")]
    NoField,

    #[error("No reference antenna was supplied (--refant)")]
    NoRefant,

    #[error("No line-free channel selection was supplied (--cont-channels)")]
    NoContChannels,

    #[error("No cell size was supplied (--cell)")]
    NoCell,

    #[error("No image size was supplied (--imsize)")]
    NoImsize,
}
