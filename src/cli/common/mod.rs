// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Common arguments for command-line interfaces. Every pipeline
//! subcommand takes a step selection and may be driven from an arguments
//! file, so those pieces live here.

mod printers;

pub(crate) use printers::{display_warnings, Warn};

use clap::Parser;
use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};
use thiserror::Error;

use crate::math::optimum_image_size;
use crate::unit_parsing::{parse_angle, parse_flux_density, UnitParseError};

lazy_static::lazy_static! {
    pub(super) static ref ARG_FILE_TYPES_COMMA_SEPARATED: String = ArgFileTypes::iter().join(", ");

    pub(super) static ref ARG_FILE_HELP: String =
        format!("All arguments may be specified in a file. Any CLI arguments override arguments set in the file. Supported formats: {}", *ARG_FILE_TYPES_COMMA_SEPARATED);

    pub(super) static ref DATA_COLUMNS_COMMA_SEPARATED: String = DataColumn::iter().join(", ");

    pub(super) static ref DATA_COLUMN_HELP: String =
        format!("The measurement-set column to take visibilities from. Use 'data' if the set carries no CORRECTED_DATA column. Valid columns: {}. Default: corrected", *DATA_COLUMNS_COMMA_SEPARATED);

    // Channel/frequency selections look like "0:166~194;304~475,1:50~172"
    // or "0:229.029GHz~229.138GHz". CASA's own parser is the authority;
    // this only rejects obvious garbage before a long job is queued.
    static ref RE_CHANNEL_SELECTION: Regex =
        Regex::new(r"^\d+\s*(:\s*[\d.~;\s]+([kMG]?Hz)?(\s*;\s*[\d.~\s]+([kMG]?Hz)?)*)?(\s*,\s*\d+\s*(:\s*[\d.~;\s]+([kMG]?Hz)?(\s*;\s*[\d.~\s]+([kMG]?Hz)?)*)?)*$").unwrap();
}

#[derive(Debug, Display, EnumIter, EnumString)]
pub(super) enum ArgFileTypes {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

/// Read an arguments file into the same struct the command line parses
/// into. Invoke as `unpack_arg_file!(path)` inside a `merge` method.
macro_rules! unpack_arg_file {
    ($arg_file:expr) => {{
        use std::{fs::File, io::Read, str::FromStr};

        use crate::cli::common::{ArgFileTypes, ARG_FILE_TYPES_COMMA_SEPARATED};
        use crate::cli::ArgFileError;

        debug!("Attempting to parse argument file {}", $arg_file.display());

        let mut contents = String::new();
        let arg_file_type = $arg_file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .and_then(|e| ArgFileTypes::from_str(&e).ok());

        match arg_file_type {
            Some(ArgFileTypes::Toml) => {
                debug!("Parsing toml file...");
                let mut fh = File::open(&$arg_file).map_err(|e| ArgFileError::Read {
                    path: $arg_file.clone(),
                    message: e.to_string(),
                })?;
                fh.read_to_string(&mut contents)
                    .map_err(|e| ArgFileError::Read {
                        path: $arg_file.clone(),
                        message: e.to_string(),
                    })?;
                toml::from_str(&contents).map_err(|e| ArgFileError::Parse {
                    path: $arg_file.clone(),
                    message: e.to_string(),
                })?
            }
            Some(ArgFileTypes::Json) => {
                debug!("Parsing json file...");
                let fh = File::open(&$arg_file).map_err(|e| ArgFileError::Read {
                    path: $arg_file.clone(),
                    message: e.to_string(),
                })?;
                serde_json::from_reader(fh).map_err(|e| ArgFileError::Parse {
                    path: $arg_file.clone(),
                    message: e.to_string(),
                })?
            }
            None => {
                return Err(ArgFileError::UnrecognisedType {
                    path: $arg_file.clone(),
                    supported: ARG_FILE_TYPES_COMMA_SEPARATED.clone(),
                }
                .into())
            }
        }
    }};
}

/// Which steps of a pipeline should run in this invocation.
#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct StepSelectionArgs {
    /// The steps to run. Steps always execute in their declared order, no
    /// matter the order given here; an empty selection runs everything.
    #[clap(
        long,
        multiple_values(true),
        use_value_delimiter = true,
        help_heading = "STEP SELECTION"
    )]
    #[serde(default)]
    pub(crate) steps: Vec<usize>,

    /// Print the pipeline's step table and exit without running anything.
    #[clap(long, help_heading = "STEP SELECTION")]
    #[serde(default)]
    pub(crate) list_steps: bool,
}

impl StepSelectionArgs {
    pub(crate) fn merge(self, other: StepSelectionArgs) -> StepSelectionArgs {
        StepSelectionArgs {
            steps: if self.steps.is_empty() {
                other.steps
            } else {
                self.steps
            },
            list_steps: self.list_steps || other.list_steps,
        }
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, IntoStaticStr)]
pub(crate) enum DataColumn {
    #[strum(serialize = "data")]
    Data,

    #[strum(serialize = "corrected")]
    Corrected,
}

impl DataColumn {
    /// Parse an optional user string; `None` means the usual default of
    /// the corrected column.
    pub(crate) fn parse(s: Option<&str>) -> Result<DataColumn, CommonArgsError> {
        match s {
            None => Ok(DataColumn::Corrected),
            Some(s) => s
                .parse()
                .map_err(|_| CommonArgsError::UnknownDataColumn { input: s.to_string() }),
        }
    }

    pub(crate) fn as_casa_str(self) -> &'static str {
        self.into()
    }
}

/// Sanity-check a channel/frequency selection string before handing it to
/// CASA.
pub(crate) fn validate_channel_selection(s: &str) -> Result<(), CommonArgsError> {
    if RE_CHANNEL_SELECTION.is_match(s.trim()) {
        Ok(())
    } else {
        Err(CommonArgsError::BadChannelSelection {
            input: s.to_string(),
        })
    }
}

/// Validate a cell size string. A naked number is assumed to be
/// arcseconds, like the tutorials' values.
pub(crate) fn parse_cell(cell: String) -> Result<String, UnitParseError> {
    match parse_angle(&cell)? {
        (q, None) => {
            format!("Cell size '{cell}' has no unit; assuming arcsec").warn();
            Ok(format!("{q}arcsec"))
        }
        _ => Ok(cell),
    }
}

/// Validate a cleaning threshold string. A naked number is read by CASA
/// as Jy; let it through with a warning.
pub(crate) fn parse_threshold(threshold: String) -> Result<String, UnitParseError> {
    match parse_flux_density(&threshold)? {
        (_, None) => {
            format!("Threshold '{threshold}' has no unit; CASA will read it as Jy").warn();
            Ok(threshold)
        }
        _ => Ok(threshold),
    }
}

/// Expand one-or-two image dimensions, optionally snapping them up to an
/// FFT-friendly size.
pub(crate) fn parse_imsize(imsize: Vec<i64>, optimise: bool) -> Result<Vec<i64>, CommonArgsError> {
    let dims = match *imsize.as_slice() {
        [n] => vec![n, n],
        [x, y] => vec![x, y],
        _ => {
            return Err(CommonArgsError::BadImsize {
                num_values: imsize.len(),
            })
        }
    };
    if !optimise {
        return Ok(dims);
    }
    Ok(dims
        .into_iter()
        .map(|n| {
            let best = optimum_image_size(n.max(1) as usize) as i64;
            if best != n {
                format!("Image size {n} is not FFT-friendly; using {best}").warn();
            }
            best
        })
        .collect())
}

#[derive(Debug, Error)]
pub enum CommonArgsError {
    #[error("'{input}' doesn't look like a channel selection (e.g. '0:166~194;304~475,1:50~172')")]
    BadChannelSelection { input: String },

    #[error("'{input}' is not a data column; expected one of: {}", *DATA_COLUMNS_COMMA_SEPARATED)]
    UnknownDataColumn { input: String },

    #[error("--imsize takes one or two values, got {num_values}")]
    BadImsize { num_values: usize },
}
