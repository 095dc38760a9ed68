// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The quicklook pipeline: basic analysis products for an image cube.
//! Statistics are written via imstat logfiles, the position-velocity
//! slice and the moment maps come out as both CASA images and FITS
//! exports. All products are cheap, so they are regenerated on every
//! run.

#[cfg(test)]
mod tests;

use std::path::Path;

use super::run_pipeline;
use crate::artifacts::{remove_if_present, require_input};
use crate::casa::{CasaCall, CasaRunner};
use crate::cli::common::StepSelectionArgs;
use crate::cli::CasapipeError;
use crate::pipeline::Step;

/// immoments writes moment 0, 1 and 8 under these suffixes.
const MOMENTS: [i64; 3] = [0, 1, 8];
const MOMENT_SUFFIXES: [&str; 3] = ["integrated", "weighted_coord", "maximum"];

pub(crate) struct QuicklookParams {
    /// The cube to analyse, usually a FITS export of a cleaned image.
    pub(crate) image: String,
    /// A single channel to report statistics for, alongside the full
    /// cube.
    pub(crate) channel: Option<i64>,
    /// Start and end pixel coordinates of the position-velocity slice.
    pub(crate) pv_start: Vec<i64>,
    pub(crate) pv_end: Vec<i64>,
    /// The channel range the moments integrate over, e.g. 420~630.
    pub(crate) chans: Option<String>,
    /// Pixel value limits for the moments, e.g. 0.03 to 100 Jy/beam.
    pub(crate) includepix: Option<Vec<f64>>,
    /// A CASA region file restricting the moments, e.g. region.crtf.
    pub(crate) region: Option<String>,
    pub(crate) selection: StepSelectionArgs,
}

impl QuicklookParams {
    fn base(&self) -> &str {
        self.image
            .strip_suffix(".fits")
            .unwrap_or(self.image.as_str())
    }

    pub(crate) fn pv_image(&self) -> String {
        format!("{}.pv", self.base())
    }

    fn moment_base(&self) -> String {
        format!("{}.moment", self.base())
    }

    pub(crate) fn moment_images(&self) -> [String; 3] {
        MOMENT_SUFFIXES.map(|suffix| format!("{}.{suffix}", self.moment_base()))
    }

    fn step_table(&self) -> Vec<Step<'_>> {
        vec![
            Step::new(0, "Measure image statistics", move |runner| {
                require_input(Path::new(&self.image))?;
                if let Some(channel) = self.channel {
                    let logfile = format!("{}.chan{channel}.stats.txt", self.base());
                    remove_if_present(Path::new(&logfile))?;
                    runner.run(
                        &CasaCall::new("imstat")
                            .arg("imagename", self.image.as_str())
                            .arg("chans", channel.to_string())
                            .arg("logfile", logfile),
                    )?;
                }
                let logfile = format!("{}.stats.txt", self.base());
                remove_if_present(Path::new(&logfile))?;
                runner.run(
                    &CasaCall::new("imstat")
                        .arg("imagename", self.image.as_str())
                        .arg("logfile", logfile),
                )?;
                Ok(())
            }),
            Step::new(
                1,
                "Make a position-velocity slice and export it",
                move |runner| {
                    require_input(Path::new(&self.image))?;
                    let pv = self.pv_image();
                    remove_if_present(Path::new(&pv))?;
                    runner.run(
                        &CasaCall::new("impv")
                            .arg("imagename", self.image.as_str())
                            .arg("outfile", pv.as_str())
                            .arg("mode", "coords")
                            .arg("start", self.pv_start.clone())
                            .arg("end", self.pv_end.clone())
                            .arg("overwrite", true),
                    )?;
                    runner.run(
                        &CasaCall::new("exportfits")
                            .arg("imagename", pv.as_str())
                            .arg("fitsimage", format!("{pv}.fits"))
                            .arg("overwrite", true),
                    )?;
                    Ok(())
                },
            ),
            Step::new(2, "Make moment maps and export them", move |runner| {
                require_input(Path::new(&self.image))?;
                for moment in self.moment_images() {
                    remove_if_present(Path::new(&moment))?;
                }
                let mut call = CasaCall::new("immoments")
                    .arg("imagename", self.image.as_str())
                    .arg("moments", MOMENTS.to_vec());
                if let Some(chans) = self.chans.as_deref() {
                    call = call.arg("chans", chans);
                }
                if let Some(includepix) = self.includepix.clone() {
                    call = call.arg("includepix", includepix);
                }
                if let Some(region) = self.region.as_deref() {
                    call = call.arg("region", region);
                }
                runner.run(&call.arg("outfile", self.moment_base()))?;

                for moment in self.moment_images() {
                    runner.run(
                        &CasaCall::new("exportfits")
                            .arg("imagename", moment.as_str())
                            .arg("fitsimage", format!("{moment}.fits"))
                            .arg("dropdeg", true)
                            .arg("overwrite", true),
                    )?;
                }
                Ok(())
            }),
        ]
    }

    pub(crate) fn run(
        &self,
        runner: &mut dyn CasaRunner,
        dry_run: bool,
    ) -> Result<(), CasapipeError> {
        run_pipeline(self.step_table(), &self.selection, dry_run, runner)
    }
}
