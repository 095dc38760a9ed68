// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parameters that are ready to be used directly.
//!
//! The code here is kind of "mirroring" the code within the `cli` module;
//! the idea is that `cli` is unparsed, user-facing code, whereas
//! parameters have been parsed and know how to build and run their step
//! tables.

mod continuum;
mod feather;
mod line;
mod quicklook;
mod selfcal;

pub(crate) use continuum::ContinuumParams;
pub(crate) use feather::FeatherParams;
pub(crate) use line::{LineChunk, LineChunkParseError, LineParams};
pub(crate) use quicklook::QuicklookParams;
pub(crate) use selfcal::SelfcalParams;

use log::info;

use crate::casa::{CasaCall, CasaRunner, TaskArgs, Value};
use crate::cli::common::{display_warnings, DataColumn, StepSelectionArgs};
use crate::cli::CasapipeError;
use crate::pipeline::{Pipeline, Step};

/// The override set that turns clean-image arguments into dirty-image
/// arguments.
pub(super) fn dirty_image_overrides() -> TaskArgs {
    let mut overrides = TaskArgs::new();
    overrides.set("niter", 0_i64);
    overrides.set("usemask", Value::None);
    overrides.set("threshold", Value::None);
    overrides.set("interactive", false);
    overrides
}

/// A `split` call that copies the target field's science data out of the
/// parent measurement set.
pub(super) fn split_call(
    vis: &str,
    outputvis: &str,
    field: &str,
    spw: Option<&str>,
    datacolumn: DataColumn,
) -> CasaCall {
    let mut call = CasaCall::new("split")
        .arg("vis", vis)
        .arg("outputvis", outputvis)
        .arg("field", field);
    if let Some(spw) = spw {
        call = call.arg("spw", spw);
    }
    call.arg("datacolumn", datacolumn.as_casa_str())
        .arg("keepflags", true)
}

/// Build the pipeline, apply the selection, and either describe or run
/// it. Common tail for every subcommand's params.
pub(super) fn run_pipeline(
    steps: Vec<Step>,
    selection: &StepSelectionArgs,
    dry_run: bool,
    runner: &mut dyn CasaRunner,
) -> Result<(), CasapipeError> {
    let mut pipeline = Pipeline::new(steps)?;
    pipeline.select(&selection.steps)?;
    if selection.list_steps || dry_run {
        pipeline.describe();
        if dry_run {
            info!("Dry run: no steps were executed");
        }
        return Ok(());
    }
    pipeline.run(runner)?;
    display_warnings();
    Ok(())
}
