// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Arguments for making quicklook products (statistics, a
//! position-velocity slice and moment maps) out of an image cube.

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use clap::Parser;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::common::{StepSelectionArgs, ARG_FILE_HELP};
use crate::cli::CasapipeError;
use crate::params::QuicklookParams;

lazy_static! {
    // A channel or a channel range, e.g. 522 or 420~630. immoments takes
    // these without a leading spw.
    static ref RE_CHANNEL_RANGE: Regex = Regex::new(r"^\d+(\s*~\s*\d+)?$").unwrap();
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct QuicklookArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// The image cube to analyse, e.g. NGC7582_co21.fits.
    #[clap(short, long, help_heading = "INPUT DATA")]
    pub(super) image: Option<String>,

    /// A single channel to report statistics for, on top of the
    /// whole-cube statistics.
    #[clap(short, long, help_heading = "STATISTICS")]
    pub(super) channel: Option<i64>,

    /// The starting pixel of the position-velocity slice, e.g. 148 122.
    #[clap(long, multiple_values(true), help_heading = "POSITION-VELOCITY")]
    pub(super) pv_start: Option<Vec<i64>>,

    /// The ending pixel of the position-velocity slice, e.g. 175 175.
    #[clap(long, multiple_values(true), help_heading = "POSITION-VELOCITY")]
    pub(super) pv_end: Option<Vec<i64>>,

    /// The channel range that the moment maps integrate over, e.g.
    /// 420~630.
    #[clap(long, help_heading = "MOMENT MAPS")]
    pub(super) chans: Option<String>,

    /// Only pixels inside this value range contribute to the moment
    /// maps, e.g. 0.03 100 for 30 mJy/beam to 100 Jy/beam.
    #[clap(long, multiple_values(true), help_heading = "MOMENT MAPS")]
    pub(super) includepix: Option<Vec<f64>>,

    /// A CASA region file restricting the moment maps, e.g. mask.crtf.
    #[clap(long, help_heading = "MOMENT MAPS")]
    pub(super) region: Option<String>,

    #[clap(flatten)]
    #[serde(default)]
    pub(super) selection: StepSelectionArgs,
}

impl QuicklookArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was
    /// specified into a single struct. Where applicable, it will prefer
    /// CLI parameters over those in the file.
    pub(super) fn merge(self) -> Result<QuicklookArgs, CasapipeError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Ensure all of the file args are accounted for by pattern
            // matching.
            let QuicklookArgs {
                args_file: _,
                image,
                channel,
                pv_start,
                pv_end,
                chans,
                includepix,
                region,
                selection,
            } = unpack_arg_file!(arg_file);

            Ok(QuicklookArgs {
                args_file: None,
                image: cli_args.image.or(image),
                channel: cli_args.channel.or(channel),
                pv_start: cli_args.pv_start.or(pv_start),
                pv_end: cli_args.pv_end.or(pv_end),
                chans: cli_args.chans.or(chans),
                includepix: cli_args.includepix.or(includepix),
                region: cli_args.region.or(region),
                selection: cli_args.selection.merge(selection),
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<QuicklookParams, CasapipeError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            image,
            channel,
            pv_start,
            pv_end,
            chans,
            includepix,
            region,
            selection,
        } = self;

        let image = image.ok_or(QuicklookArgsError::NoImage)?;
        let pv_start = parse_pixel(pv_start.ok_or(QuicklookArgsError::NoPvStart)?)?;
        let pv_end = parse_pixel(pv_end.ok_or(QuicklookArgsError::NoPvEnd)?)?;
        if let Some(chans) = chans.as_deref() {
            if !RE_CHANNEL_RANGE.is_match(chans.trim()) {
                return Err(QuicklookArgsError::BadChans(chans.to_string()).into());
            }
        }
        if let Some(includepix) = &includepix {
            if includepix.len() != 2 {
                return Err(QuicklookArgsError::BadIncludePix(includepix.len()).into());
            }
        }

        Ok(QuicklookParams {
            image,
            channel,
            pv_start,
            pv_end,
            chans,
            includepix,
            region,
            selection,
        })
    }
}

fn parse_pixel(pixel: Vec<i64>) -> Result<Vec<i64>, QuicklookArgsError> {
    if pixel.len() == 2 {
        Ok(pixel)
    } else {
        Err(QuicklookArgsError::BadPixel(pixel.len()))
    }
}

#[derive(Debug, Error)]
pub enum QuicklookArgsError {
    #[error("No image cube was supplied (--image)")]
    NoImage,

    #[error("No position-velocity start pixel was supplied (--pv-start)")]
    NoPvStart,

    #[error("No position-velocity end pixel was supplied (--pv-end)")]
    NoPvEnd,

    #[error("A position-velocity pixel needs exactly 2 values; got {0}")]
    BadPixel(usize),

    #[error("--includepix needs exactly 2 values (a lower and an upper limit); got {0}")]
    BadIncludePix(usize),

    #[error("'{0}' doesn't look like a channel or channel range (e.g. 420~630)")]
    BadChans(String),
}
