// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Arguments for feathering a single-dish FITS image with an
//! interferometric CASA image.

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use clap::Parser;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::common::{StepSelectionArgs, Warn, ARG_FILE_HELP};
use crate::cli::CasapipeError;
use crate::constants::CO_2_1_FREQ_HZ;
use crate::params::FeatherParams;
use crate::unit_parsing::parse_angle;

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct FeatherArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// The single-dish FITS image, in Kelvin, e.g. NGC3351.fits.
    #[clap(short, long, help_heading = "INPUT DATA")]
    pub(super) lowres: Option<String>,

    /// The interferometric CASA image, e.g. NGC3351_12m_co21.image.
    #[clap(short = 'i', long, help_heading = "INPUT DATA")]
    pub(super) highres: Option<String>,

    /// The single-dish beam's major axis, e.g. 1.2arcsec (deg and mas
    /// also work).
    #[clap(long, help_heading = "SINGLE-DISH BEAM")]
    pub(super) bmaj: Option<String>,

    /// The single-dish beam's minor axis, e.g. 0.9arcsec.
    #[clap(long, help_heading = "SINGLE-DISH BEAM")]
    pub(super) bmin: Option<String>,

    /// The observing frequency in Hz, used for the Kelvin to Jy/beam
    /// conversion (default: the CO(2-1) rest frequency).
    #[clap(long, help_heading = "SINGLE-DISH BEAM")]
    pub(super) freq_hz: Option<f64>,

    #[clap(flatten)]
    #[serde(default)]
    pub(super) selection: StepSelectionArgs,
}

impl FeatherArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was
    /// specified into a single struct. Where applicable, it will prefer
    /// CLI parameters over those in the file.
    pub(super) fn merge(self) -> Result<FeatherArgs, CasapipeError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Ensure all of the file args are accounted for by pattern
            // matching.
            let FeatherArgs {
                args_file: _,
                lowres,
                highres,
                bmaj,
                bmin,
                freq_hz,
                selection,
            } = unpack_arg_file!(arg_file);

            Ok(FeatherArgs {
                args_file: None,
                lowres: cli_args.lowres.or(lowres),
                highres: cli_args.highres.or(highres),
                bmaj: cli_args.bmaj.or(bmaj),
                bmin: cli_args.bmin.or(bmin),
                freq_hz: cli_args.freq_hz.or(freq_hz),
                selection: cli_args.selection.merge(selection),
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<FeatherParams, CasapipeError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            lowres,
            highres,
            bmaj,
            bmin,
            freq_hz,
            selection,
        } = self;

        let lowres = lowres.ok_or(FeatherArgsError::NoLowres)?;
        let highres = highres.ok_or(FeatherArgsError::NoHighres)?;
        let bmaj_arcsec = parse_beam_axis(&bmaj.ok_or(FeatherArgsError::NoBmaj)?, "bmaj")?;
        let bmin_arcsec = parse_beam_axis(&bmin.ok_or(FeatherArgsError::NoBmin)?, "bmin")?;

        Ok(FeatherParams {
            lowres,
            highres,
            bmaj_arcsec,
            bmin_arcsec,
            freq_hz: freq_hz.unwrap_or(CO_2_1_FREQ_HZ),
            selection,
        })
    }
}

/// Parse a beam axis into arcseconds; a naked number is assumed to
/// already be in arcseconds.
fn parse_beam_axis(s: &str, name: &str) -> Result<f64, CasapipeError> {
    let (quantity, unit) = parse_angle(s)?;
    Ok(match unit {
        Some(unit) => unit.to_arcsec(quantity),
        None => {
            format!("Assuming that {name} '{s}' is in arcseconds").warn();
            quantity
        }
    })
}

#[derive(Debug, Error)]
pub enum FeatherArgsError {
    #[error("No single-dish image was supplied (--lowres)")]
    NoLowres,

    #[error("No interferometric image was supplied (--highres)")]
    NoHighres,

    #[error("No single-dish beam major axis was supplied (--bmaj)")]
    NoBmaj,

    #[error("No single-dish beam minor axis was supplied (--bmin)")]
    NoBmin,
}
