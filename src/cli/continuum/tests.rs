// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests against continuum-imaging arguments and their conversion to
//! parameters.

use std::{fs::File, io::Write};

use approx::assert_abs_diff_eq;
use clap::Parser;
use tempfile::tempdir;

use super::*;
use crate::cli::common::DataColumn;

fn minimal_args() -> ContinuumArgs {
    ContinuumArgs {
        vis: Some("uid___A002_X1003af4_Xa540.ms".to_string()),
        field: Some("PN_Hb_5".to_string()),
        spw: Some("25,27,29,31".to_string()),
        cont_channels: Some("0:226.20~226.26GHz;226.39~226.56GHz".to_string()),
        imsize: Some(vec![320]),
        cell: Some("0.22arcsec".to_string()),
        threshold: Some("1.17mJy".to_string()),
        ..Default::default()
    }
}

#[test]
fn test_parse_defaults() {
    let params = minimal_args().parse().unwrap();
    assert_eq!(params.vis, "uid___A002_X1003af4_Xa540.ms");
    assert_eq!(params.field, "PN_Hb_5");
    assert_eq!(params.image_base, "PN_Hb_5");
    // A single imsize value means a square image.
    assert_eq!(params.imsize, vec![320, 320]);
    assert_eq!(params.niter, DEFAULT_NITER);
    assert_abs_diff_eq!(params.robust, DEFAULT_ROBUST);
    assert_eq!(params.gridder, DEFAULT_GRIDDER);
    assert_eq!(params.deconvolver, DEFAULT_DECONVOLVER);
    assert_eq!(params.weighting, DEFAULT_WEIGHTING);
    assert_eq!(params.masktype, DEFAULT_MASKTYPE);
    assert_eq!(params.datacolumn, DataColumn::Corrected);
}

#[test]
fn test_parse_naked_cell_assumes_arcsec() {
    let mut args = minimal_args();
    args.cell = Some("0.22".to_string());
    let params = args.parse().unwrap();
    assert_eq!(params.cell, "0.22arcsec");
}

#[test]
fn test_parse_rejects_missing_required_args() {
    let mut args = minimal_args();
    args.vis = None;
    assert!(matches!(
        args.parse(),
        Err(CasapipeError::ContinuumArgs(ContinuumArgsError::NoVis))
    ));

    let mut args = minimal_args();
    args.cont_channels = None;
    assert!(matches!(
        args.parse(),
        Err(CasapipeError::ContinuumArgs(
            ContinuumArgsError::NoContChannels
        ))
    ));

    let mut args = minimal_args();
    args.cell = None;
    assert!(matches!(
        args.parse(),
        Err(CasapipeError::ContinuumArgs(ContinuumArgsError::NoCell))
    ));

    let mut args = minimal_args();
    args.imsize = None;
    assert!(matches!(
        args.parse(),
        Err(CasapipeError::ContinuumArgs(ContinuumArgsError::NoImsize))
    ));
}

#[test]
fn test_parse_rejects_bad_channel_selection() {
    let mut args = minimal_args();
    args.cont_channels = Some("spw=0".to_string());
    assert!(args.parse().is_err());
}

#[test]
fn test_arg_file_round_trip() {
    let args = minimal_args();
    let temp_dir = tempdir().expect("Couldn't make tempdir");
    for filename in ["continuum.toml", "continuum.json"] {
        let arg_file = temp_dir.path().join(filename);
        let mut f = File::create(&arg_file).expect("couldn't make file");
        let ser = match filename.split('.').last() {
            Some("toml") => {
                toml::to_string_pretty(&args).expect("couldn't serialise ContinuumArgs as toml")
            }
            Some("json") => serde_json::to_string_pretty(&args)
                .expect("couldn't serialise ContinuumArgs as json"),
            _ => unreachable!(),
        };
        write!(&mut f, "{ser}").unwrap();

        let merged = ContinuumArgs::parse_from(["image-cont", &arg_file.display().to_string()])
            .merge()
            .unwrap();
        assert_eq!(merged.vis.as_deref(), Some("uid___A002_X1003af4_Xa540.ms"));
        assert_eq!(merged.cell.as_deref(), Some("0.22arcsec"));
    }
}

#[test]
fn test_cli_args_override_the_arg_file() {
    let args = minimal_args();
    let temp_dir = tempdir().expect("Couldn't make tempdir");
    let arg_file = temp_dir.path().join("continuum.toml");
    let ser = toml::to_string_pretty(&args).expect("couldn't serialise ContinuumArgs as toml");
    std::fs::write(&arg_file, ser).unwrap();

    let merged = ContinuumArgs::parse_from([
        "image-cont",
        &arg_file.display().to_string(),
        "--field",
        "Sgr_A_star",
        "--steps",
        "0,2",
    ])
    .merge()
    .unwrap();
    // CLI values win; everything else falls through from the file.
    assert_eq!(merged.field.as_deref(), Some("Sgr_A_star"));
    assert_eq!(merged.vis.as_deref(), Some("uid___A002_X1003af4_Xa540.ms"));
    assert_eq!(merged.selection.steps, vec![0, 2]);
}

#[test]
fn test_hand_written_arg_file() {
    // The field names in an arguments file are the snake_case struct
    // fields; keep this in sync with what the docs show users.
    let contents = indoc::indoc! {r#"
        vis = "uid___A002_X1003af4_Xa540.ms"
        field = "PN_Hb_5"
        spw = "25,27,29,31"
        cont_channels = "0:226.20~226.26GHz;226.39~226.56GHz"
        imsize = [320]
        cell = "0.22arcsec"
        threshold = "1.17mJy"

        [selection]
        steps = [1]
    "#};
    let temp_dir = tempdir().expect("Couldn't make tempdir");
    let arg_file = temp_dir.path().join("continuum.toml");
    std::fs::write(&arg_file, contents).unwrap();

    let merged = ContinuumArgs::parse_from(["image-cont", &arg_file.display().to_string()])
        .merge()
        .unwrap();
    assert_eq!(merged.field.as_deref(), Some("PN_Hb_5"));
    assert_eq!(merged.selection.steps, vec![1]);
    assert!(merged.parse().is_ok());
}
