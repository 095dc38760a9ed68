// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Step-gated imaging and self-calibration pipelines for CASA/ALMA data.

Each subcommand drives the `casa` executable through a fixed sequence of
numbered steps. Steps can be selected individually and re-run safely;
expensive images are skipped when their products already exist, and
cheap diagnostics are deleted and regenerated.
 */

mod artifacts;
mod casa;
mod cli;
mod constants;
mod math;
mod params;
mod pipeline;
mod unit_parsing;

pub use cli::{Casapipe, CasapipeError};
