// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The spectral-line imaging pipeline: split the target, subtract the
//! continuum, make a dirty cube of the full spectral window, then clean
//! each requested line chunk.


use std::path::Path;
use std::str::FromStr;

use log::info;
use thiserror::Error;
use vec1::Vec1;

use super::{dirty_image_overrides, run_pipeline, split_call};
use crate::artifacts::{exists, require_input, ImageSet};
use crate::casa::{CasaCall, CasaRunner, TaskArgs};
use crate::cli::common::{DataColumn, StepSelectionArgs};
use crate::cli::CasapipeError;
use crate::pipeline::Step;

/// One spectral chunk to clean: a start channel, a channel width and a
/// channel count, written on the command line as `start:width:nchan`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LineChunk {
    pub(crate) start: i64,
    pub(crate) width: i64,
    pub(crate) nchan: i64,
}

impl FromStr for LineChunk {
    type Err = LineChunkParseError;

    fn from_str(s: &str) -> Result<LineChunk, LineChunkParseError> {
        let mut fields = s.split(':').map(|f| {
            f.trim()
                .parse::<i64>()
                .map_err(|_| LineChunkParseError(s.to_string()))
        });
        match (fields.next(), fields.next(), fields.next(), fields.next()) {
            (Some(start), Some(width), Some(nchan), None) => Ok(LineChunk {
                start: start?,
                width: width?,
                nchan: nchan?,
            }),
            _ => Err(LineChunkParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("'{0}' is not a valid line chunk; expected 'start:width:nchan', e.g. 186:1:113")]
pub struct LineChunkParseError(String);

pub(crate) struct LineParams {
    pub(crate) vis: String,
    pub(crate) field: String,
    pub(crate) image_base: String,
    /// The science spectral windows to split out of the parent
    /// measurement set.
    pub(crate) spw: Option<String>,
    /// The (renumbered) spectral window to image after splitting.
    pub(crate) line_spw: String,
    pub(crate) datacolumn: DataColumn,
    pub(crate) cont_channels: String,
    pub(crate) chunks: Vec1<LineChunk>,
    pub(crate) imsize: Vec<i64>,
    pub(crate) cell: String,
    pub(crate) phasecenter: Option<String>,
    pub(crate) niter: i64,
    pub(crate) threshold: String,
    pub(crate) robust: f64,
    pub(crate) masktype: String,
    pub(crate) selection: StepSelectionArgs,
}

impl LineParams {
    pub(crate) fn split_vis(&self) -> String {
        format!("{}.split.cal.target", self.vis)
    }

    pub(crate) fn contsub_vis(&self) -> String {
        format!("{}.contsub", self.split_vis())
    }

    fn dirty_cube(&self) -> ImageSet {
        ImageSet::new(format!("{}.spw{}.dirty", self.image_base, self.line_spw))
    }

    fn chunk_cube(&self, chunk_idx: usize) -> ImageSet {
        ImageSet::new(format!(
            "{}.spw{}.chunk{chunk_idx}",
            self.image_base, self.line_spw
        ))
    }

    /// The full cube-cleaning argument set; the dirty cube and the
    /// per-chunk cleans derive their own arguments from this by
    /// overriding.
    fn tclean_args(&self) -> TaskArgs {
        let mut args = TaskArgs::new();
        args.set("imsize", self.imsize.clone());
        args.set("cell", self.cell.as_str());
        if let Some(phasecenter) = self.phasecenter.as_deref() {
            args.set("phasecenter", phasecenter);
        }
        args.set("gridder", "mosaic");
        args.set("deconvolver", "multiscale");
        args.set("robust", self.robust);
        args.set("pbcor", true);
        args.set("niter", self.niter);
        args.set("usemask", self.masktype.as_str());
        args.set("interactive", false);
        args.set("specmode", "cube");
        args.set("spw", self.line_spw.as_str());
        args.set("threshold", self.threshold.as_str());
        args.set("weighting", "briggsbwtaper");
        args.set("restoringbeam", "common");
        args.set("minbeamfrac", 0.3);
        args.set("noisethreshold", 5.0);
        args
    }

    fn tclean_call(&self, image: &ImageSet, args: TaskArgs) -> CasaCall {
        CasaCall::with_args("tclean", args)
            .arg("vis", self.contsub_vis())
            .arg("imagename", image.base())
            .arg("selectdata", true)
            .arg("datacolumn", "data")
    }

    fn step_table(&self) -> Vec<Step<'_>> {
        let mut steps = vec![
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
            Step::new(1, "Subtract the continuum in the uv plane", move |runner| {
                let contsub_vis = self.contsub_vis();
                if exists(Path::new(&contsub_vis)) {
                    info!("{contsub_vis} already exists; not subtracting again");
                    return Ok(());
                }
                require_input(Path::new(&self.split_vis()))?;
                runner.run(
                    &CasaCall::new("uvcontsub")
                        .arg("vis", self.split_vis())
                        .arg("outputvis", contsub_vis)
                        .arg("fitspec", self.cont_channels.as_str())
                        .arg("fitorder", 0_i64)
                        .arg("datacolumn", "data"),
                )?;
                Ok(())
            }),
            Step::new(
                2,
                "Make dirty cube of the full spectral window",
                move |runner| {
                    let image = self.dirty_cube();
                    if image.exists() {
                        info!("{} already exists; skipping", image.image().display());
                        return Ok(());
                    }
                    require_input(Path::new(&self.contsub_vis()))?;
                    let args = self.tclean_args().with_overrides(&dirty_image_overrides());
                    runner.run(&self.tclean_call(&image, args))?;
                    Ok(())
                },
            ),
        ];

        for (chunk_idx, chunk) in self.chunks.iter().copied().enumerate() {
            steps.push(Step::new(
                3 + chunk_idx,
                format!("Make clean line cube for chunk {chunk_idx}"),
                move |runner| {
                    let image = self.chunk_cube(chunk_idx);
                    if image.exists() {
                        info!("{} already exists; skipping", image.image().display());
                        return Ok(());
                    }
                    require_input(Path::new(&self.contsub_vis()))?;
                    let mut chunk_args = TaskArgs::new();
                    chunk_args.set("start", chunk.start);
                    chunk_args.set("width", chunk.width);
                    chunk_args.set("nchan", chunk.nchan);
                    let args = self.tclean_args().with_overrides(&chunk_args);
                    runner.run(&self.tclean_call(&image, args))?;
                    Ok(())
                },
            ));
        }

        steps
    }

    pub(crate) fn run(
        &self,
        runner: &mut dyn CasaRunner,
        dry_run: bool,
    ) -> Result<(), CasapipeError> {
        run_pipeline(self.step_table(), &self.selection, dry_run, runner)
    }
}
