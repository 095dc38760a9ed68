// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The continuum imaging pipeline: split the target, dirty image, clean
//! image. Imaging steps skip themselves when their image already exists,
//! so the pipeline can be re-run safely after an interruption.

#[cfg(test)]
mod tests;

use std::path::Path;

use log::info;

use super::{dirty_image_overrides, run_pipeline, split_call};
use crate::artifacts::{exists, require_input, ImageSet};
use crate::casa::{CasaCall, CasaRunner, TaskArgs};
use crate::cli::common::{DataColumn, StepSelectionArgs};
use crate::cli::CasapipeError;
use crate::pipeline::Step;

pub(crate) struct ContinuumParams {
    pub(crate) vis: String,
    pub(crate) field: String,
    /// The base name for image products; defaults to the field name.
    pub(crate) image_base: String,
    pub(crate) spw: Option<String>,
    pub(crate) datacolumn: DataColumn,
    pub(crate) cont_channels: String,
    pub(crate) imsize: Vec<i64>,
    pub(crate) cell: String,
    pub(crate) phasecenter: Option<String>,
    pub(crate) niter: i64,
    pub(crate) threshold: String,
    pub(crate) robust: f64,
    pub(crate) gridder: String,
    pub(crate) deconvolver: String,
    pub(crate) weighting: String,
    pub(crate) masktype: String,
    pub(crate) selection: StepSelectionArgs,
}

impl ContinuumParams {
    /// The split-out target data that the imaging steps read.
    pub(crate) fn split_vis(&self) -> String {
        format!("{}.split.cal.target", self.vis)
    }

    fn continuum_image(&self) -> ImageSet {
        ImageSet::new(format!("{}.continuum", self.image_base))
    }

    fn dirty_image(&self) -> ImageSet {
        ImageSet::new(format!("{}.continuum.dirty", self.image_base))
    }

    /// The full clean-image argument set; the dirty step derives its own
    /// arguments from this by overriding.
    fn tclean_args(&self) -> TaskArgs {
        let mut args = TaskArgs::new();
        args.set("imsize", self.imsize.clone());
        args.set("cell", self.cell.as_str());
        if let Some(phasecenter) = self.phasecenter.as_deref() {
            args.set("phasecenter", phasecenter);
        }
        args.set("gridder", self.gridder.as_str());
        args.set("deconvolver", self.deconvolver.as_str());
        args.set("robust", self.robust);
        args.set("pbcor", true);
        args.set("niter", self.niter);
        args.set("usemask", self.masktype.as_str());
        args.set("interactive", false);
        args.set("specmode", "mfs");
        args.set("spw", self.cont_channels.as_str());
        args.set("threshold", self.threshold.as_str());
        args.set("weighting", self.weighting.as_str());
        args
    }

    fn tclean_call(&self, image: &ImageSet, args: TaskArgs) -> CasaCall {
        CasaCall::with_args("tclean", args)
            .arg("vis", self.split_vis())
            .arg("imagename", image.base())
            .arg("selectdata", true)
            .arg("datacolumn", self.datacolumn.as_casa_str())
    }

    fn step_table(&self) -> Vec<Step<'_>> {
        vec![
            Step::new(
                0,
                "Split out the target field and science spectral windows",
                move |runner| {
                    let split_vis = self.split_vis();
                    if exists(Path::new(&split_vis)) {
                        info!("{split_vis} already exists; not splitting again");
                        return Ok(());
                    }
                    runner.run(&split_call(
                        &self.vis,
                        &split_vis,
                        &self.field,
                        self.spw.as_deref(),
                        self.datacolumn,
                    ))?;
                    Ok(())
                },
            ),
            Step::new(1, "Make dirty continuum image", move |runner| {
                let image = self.dirty_image();
                if image.exists() {
                    info!("{} already exists; skipping", image.image().display());
                    return Ok(());
                }
                require_input(Path::new(&self.split_vis()))?;
                let args = self.tclean_args().with_overrides(&dirty_image_overrides());
                runner.run(&self.tclean_call(&image, args))?;
                Ok(())
            }),
            Step::new(2, "Make clean continuum image", move |runner| {
                let image = self.continuum_image();
                if image.exists() {
                    info!("{} already exists; skipping", image.image().display());
                    return Ok(());
                }
                require_input(Path::new(&self.split_vis()))?;
                runner.run(&self.tclean_call(&image, self.tclean_args()))?;
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
