// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use clap::Parser;
use tempfile::tempdir;

use super::*;

fn minimal_args() -> FeatherArgs {
    FeatherArgs {
        lowres: Some("NGC3351.fits".to_string()),
        highres: Some("NGC3351_12m_co21.image".to_string()),
        bmaj: Some("1.2arcsec".to_string()),
        bmin: Some("0.9arcsec".to_string()),
        ..Default::default()
    }
}

#[test]
fn test_parse_defaults_to_co21() {
    let params = minimal_args().parse().unwrap();
    assert_abs_diff_eq!(params.freq_hz, CO_2_1_FREQ_HZ);
    assert_abs_diff_eq!(params.bmaj_arcsec, 1.2);
    assert_abs_diff_eq!(params.bmin_arcsec, 0.9);
}

#[test]
fn test_beam_axes_convert_to_arcseconds() {
    let mut args = minimal_args();
    args.bmaj = Some("0.001deg".to_string());
    args.bmin = Some("900mas".to_string());
    let params = args.parse().unwrap();
    assert_abs_diff_eq!(params.bmaj_arcsec, 3.6, epsilon = 1e-12);
    assert_abs_diff_eq!(params.bmin_arcsec, 0.9, epsilon = 1e-12);

    // Naked numbers are assumed to be arcseconds already.
    let mut args = minimal_args();
    args.bmaj = Some("1.2".to_string());
    assert_abs_diff_eq!(args.parse().unwrap().bmaj_arcsec, 1.2);
}

#[test]
fn test_parse_rejects_missing_beam() {
    let mut args = minimal_args();
    args.bmin = None;
    assert!(matches!(
        args.parse(),
        Err(CasapipeError::FeatherArgs(FeatherArgsError::NoBmin))
    ));

    let mut args = minimal_args();
    args.bmaj = Some("1.2parsec".to_string());
    assert!(matches!(args.parse(), Err(CasapipeError::Units(_))));
}

#[test]
fn test_arg_file_round_trip() {
    let args = minimal_args();
    let temp_dir = tempdir().expect("Couldn't make tempdir");
    let arg_file = temp_dir.path().join("feather.toml");
    let ser = toml::to_string_pretty(&args).expect("couldn't serialise FeatherArgs as toml");
    std::fs::write(&arg_file, ser).unwrap();

    let merged = FeatherArgs::parse_from([
        "feather",
        &arg_file.display().to_string(),
        "--freq-hz",
        "1.15e11",
    ])
    .merge()
    .unwrap();
    assert_eq!(merged.lowres.as_deref(), Some("NGC3351.fits"));
    assert_abs_diff_eq!(merged.freq_hz.unwrap(), 1.15e11);
}
