// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Command-line interface code. More specific options for `casapipe`
//! subcommands are contained in modules.
//!
//! All booleans must have `#[serde(default)]` annotated, and anything that
//! isn't a boolean must be optional. This allows all arguments to be optional
//! *and* usable in an arguments file.
//!
//! Only 3 things should be public in this module: `Casapipe`,
//! `Casapipe::run`, and `CasapipeError`.

#[macro_use]
pub(crate) mod common;
mod continuum;
mod error;
mod feather;
mod line;
mod quicklook;
mod selfcal;

pub use error::{ArgFileError, CasapipeError};

use std::path::PathBuf;

use clap::{AppSettings, Args, Parser, Subcommand};
use log::info;

use crate::casa::CasaProcess;

// Add build-time information from the "built" crate.
include!(concat!(env!("OUT_DIR"), "/built.rs"));

#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    about = r#"Step-gated imaging and self-calibration pipelines for CASA/ALMA data.
Each subcommand drives the casa executable through a fixed sequence of
numbered steps; use --list-steps to see them and --steps to run a subset."#
)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_subcommands = true)]
#[clap(propagate_version = true)]
#[clap(infer_long_args = true)]
pub struct Casapipe {
    #[clap(flatten)]
    global_opts: GlobalArgs,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// The CASA executable to drive.
    #[clap(long, default_value = "casa")]
    #[clap(global = true)]
    casa: PathBuf,

    /// The verbosity of the program. Increase by specifying multiple times
    /// (e.g. -vv). The default is to print only high-level information.
    #[clap(short, long, parse(from_occurrences))]
    #[clap(global = true)]
    verbosity: u8,

    /// Don't run any CASA tasks; just verify the arguments and print the
    /// steps that would run.
    #[clap(long)]
    #[clap(global = true)]
    dry_run: bool,

    /// Save the input arguments into a new TOML file that can be used to
    /// reproduce this run.
    #[clap(long)]
    #[clap(global = true)]
    save_toml: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
#[clap(arg_required_else_help = true)]
enum Command {
    #[clap(about = "Self-calibrate a continuum field through phase and \
                    amplitude gain cycles.")]
    Selfcal(selfcal::SelfcalArgs),

    #[clap(alias = "continuum")]
    #[clap(about = "Split out a target field and clean a continuum image.")]
    ImageCont(continuum::ContinuumArgs),

    #[clap(alias = "line")]
    #[clap(about = "Subtract the continuum and clean spectral-line cubes.")]
    ImageLine(line::LineArgs),

    #[clap(about = "Feather a single-dish image with an interferometric \
                    image.")]
    Feather(feather::FeatherArgs),

    #[clap(about = "Make statistics, a position-velocity slice and moment \
                    maps from an image cube.")]
    Quicklook(quicklook::QuicklookArgs),
}

impl Casapipe {
    pub fn run(self) -> Result<(), CasapipeError> {
        // Set up logging.
        let GlobalArgs {
            casa,
            verbosity,
            dry_run,
            save_toml,
        } = self.global_opts;
        setup_logging(verbosity).expect("Failed to initialise logging.");

        // Print the version of casapipe and its build-time information.
        let sub_command = match &self.command {
            Command::Selfcal(_) => "selfcal",
            Command::ImageCont(_) => "image-cont",
            Command::ImageLine(_) => "image-line",
            Command::Feather(_) => "feather",
            Command::Quicklook(_) => "quicklook",
        };
        info!("casapipe {} {}", sub_command, env!("CARGO_PKG_VERSION"));
        display_build_info();

        let mut runner = CasaProcess::new(casa);

        macro_rules! merge_save_run {
            ($args:expr) => {{
                let args = $args.merge()?;
                if let Some(toml) = &save_toml {
                    use std::{
                        fs::File,
                        io::{BufWriter, Write},
                    };

                    let mut f = BufWriter::new(File::create(toml)?);
                    let toml_str = toml::to_string(&args).expect("toml serialisation error");
                    f.write_all(toml_str.as_bytes())?;
                }
                args.parse()?.run(&mut runner, dry_run)?;
            }};
        }

        match self.command {
            Command::Selfcal(args) => {
                merge_save_run!(args)
            }

            Command::ImageCont(args) => {
                merge_save_run!(args)
            }

            Command::ImageLine(args) => {
                merge_save_run!(args)
            }

            Command::Feather(args) => {
                merge_save_run!(args)
            }

            Command::Quicklook(args) => {
                merge_save_run!(args)
            }
        }

        info!("casapipe {} complete.", sub_command);
        Ok(())
    }
}

/// Activate a logger. All log messages are put onto `stdout`. `env_logger`
/// automatically only uses colours and fancy symbols if we're on a tty (e.g. a
/// terminal); piped output will be formatted sensibly. Source code lines are
/// displayed in log messages when verbosity >= 3.
fn setup_logging(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.init();

    Ok(())
}

/// Write many info-level log lines of how this executable was compiled.
fn display_build_info() {
    let dirty = match GIT_DIRTY {
        Some(true) => " (dirty)",
        _ => "",
    };
    match GIT_COMMIT_HASH_SHORT {
        Some(hash) => {
            info!("Compiled on git commit hash: {hash}{dirty}");
        }
        None => info!("Compiled on git commit hash: <no git info>"),
    }
    if let Some(hr) = GIT_HEAD_REF {
        info!("            git head ref: {}", hr);
    }
    info!("            {}", BUILT_TIME_UTC);
    info!("         with compiler {}", RUSTC_VERSION);
    info!("");
}
