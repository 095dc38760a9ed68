// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The feathering pipeline: combine a single-dish FITS image with an
//! interferometric CASA image. The single-dish image is scaled from
//! Kelvin to Jy/beam, regridded onto the interferometric grid, and the
//! two are feathered in the uv plane. Every product here is cheap
//! relative to imaging, so the steps regenerate their outputs on every
//! run rather than skipping.


use std::path::Path;

use log::info;

use super::run_pipeline;
use crate::artifacts::{remove_if_present, require_input};
use crate::casa::{CasaCall, CasaRunner};
use crate::cli::common::StepSelectionArgs;
use crate::cli::CasapipeError;
use crate::math::jy_per_beam_per_kelvin;
use crate::pipeline::Step;

pub(crate) struct FeatherParams {
    /// The single-dish FITS image, in Kelvin.
    pub(crate) lowres: String,
    /// The interferometric CASA image, with a degenerate Stokes axis.
    pub(crate) highres: String,
    /// The single-dish beam, major and minor axes in arcseconds.
    pub(crate) bmaj_arcsec: f64,
    pub(crate) bmin_arcsec: f64,
    /// The observing frequency of the single-dish image.
    pub(crate) freq_hz: f64,
    pub(crate) selection: StepSelectionArgs,
}

impl FeatherParams {
    fn lowres_stem(&self) -> &str {
        self.lowres
            .strip_suffix(".fits")
            .unwrap_or(self.lowres.as_str())
    }

    pub(crate) fn nostokes_image(&self) -> String {
        let stem = self
            .highres
            .strip_suffix(".image")
            .unwrap_or(self.highres.as_str());
        format!("{stem}_nostokes.image")
    }

    pub(crate) fn jybeam_image(&self) -> String {
        format!("{}_jyperbeam.image", self.lowres_stem())
    }

    pub(crate) fn regrid_image(&self) -> String {
        format!("{}regrid.image", self.lowres_stem())
    }

    pub(crate) fn feather_image(&self) -> String {
        format!("{}_feather.image", self.lowres_stem())
    }

    fn outputs(&self) -> [String; 4] {
        [
            self.nostokes_image(),
            self.jybeam_image(),
            self.regrid_image(),
            self.feather_image(),
        ]
    }

    fn step_table(&self) -> Vec<Step<'_>> {
        vec![
            Step::new(
                0,
                "Check the input images and clear previous outputs",
                move |_runner| {
                    require_input(Path::new(&self.lowres))?;
                    require_input(Path::new(&self.highres))?;
                    for output in self.outputs() {
                        remove_if_present(Path::new(&output))?;
                    }
                    Ok(())
                },
            ),
            Step::new(
                1,
                "Drop the degenerate Stokes axis from the interferometric image",
                move |runner| {
                    require_input(Path::new(&self.highres))?;
                    let outfile = self.nostokes_image();
                    remove_if_present(Path::new(&outfile))?;
                    runner.run(
                        &CasaCall::new("imsubimage")
                            .arg("imagename", self.highres.as_str())
                            .arg("outfile", outfile)
                            .arg("chans", "")
                            .arg("stokes", "I")
                            .arg("dropdeg", true)
                            .arg("overwrite", true),
                    )?;
                    Ok(())
                },
            ),
            Step::new(
                2,
                "Scale the single-dish image from Kelvin to Jy/beam",
                move |runner| {
                    require_input(Path::new(&self.lowres))?;
                    let factor =
                        jy_per_beam_per_kelvin(self.freq_hz, self.bmaj_arcsec, self.bmin_arcsec);
                    info!("Jy/beam per K = {factor}");
                    let outfile = self.jybeam_image();
                    remove_if_present(Path::new(&outfile))?;
                    runner.run(
                        &CasaCall::new("immath")
                            .arg("imagename", self.lowres.as_str())
                            .arg("expr", format!("IM0 * {factor}"))
                            .arg("outfile", outfile.as_str()),
                    )?;
                    runner.run(
                        &CasaCall::new("imhead")
                            .arg("imagename", outfile)
                            .arg("mode", "put")
                            .arg("hdkey", "bunit")
                            .arg("hdvalue", "Jy/beam"),
                    )?;
                    Ok(())
                },
            ),
            Step::new(
                3,
                "Regrid the single-dish image onto the interferometric grid",
                move |runner| {
                    require_input(Path::new(&self.jybeam_image()))?;
                    require_input(Path::new(&self.nostokes_image()))?;
                    let output = self.regrid_image();
                    remove_if_present(Path::new(&output))?;
                    runner.run(
                        &CasaCall::new("imregrid")
                            .arg("imagename", self.jybeam_image())
                            .arg("template", self.highres.as_str())
                            .arg("output", output.as_str())
                            .arg("axes", vec![0_i64, 1, 2])
                            .arg("interpolation", "linear")
                            .arg("overwrite", true),
                    )?;
                    // Both images must agree on the reference pixel of
                    // the spectral axis before feathering.
                    for image in [self.nostokes_image(), output] {
                        runner.run(
                            &CasaCall::new("imhead")
                                .arg("imagename", image)
                                .arg("mode", "put")
                                .arg("hdkey", "crpix3")
                                .arg("hdvalue", 1.0),
                        )?;
                    }
                    Ok(())
                },
            ),
            Step::new(
                4,
                "Feather the single-dish and interferometric images",
                move |runner| {
                    require_input(Path::new(&self.nostokes_image()))?;
                    require_input(Path::new(&self.regrid_image()))?;
                    let imagename = self.feather_image();
                    remove_if_present(Path::new(&imagename))?;
                    runner.run(
                        &CasaCall::new("feather")
                            .arg("imagename", imagename)
                            .arg("highres", self.nostokes_image())
                            .arg("lowres", self.regrid_image()),
                    )?;
                    Ok(())
                },
            ),
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
