// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::Parser;
use tempfile::tempdir;

use super::*;

fn minimal_args() -> QuicklookArgs {
    QuicklookArgs {
        image: Some("NGC7582_co21.fits".to_string()),
        pv_start: Some(vec![148, 122]),
        pv_end: Some(vec![175, 175]),
        ..Default::default()
    }
}

#[test]
fn test_parse_defaults() {
    let params = minimal_args().parse().unwrap();
    assert_eq!(params.image, "NGC7582_co21.fits");
    assert_eq!(params.channel, None);
    assert_eq!(params.pv_start, vec![148, 122]);
    assert_eq!(params.pv_end, vec![175, 175]);
    assert_eq!(params.chans, None);
    assert_eq!(params.includepix, None);
    assert_eq!(params.region, None);
}

#[test]
fn test_parse_rejects_missing_args() {
    let mut args = minimal_args();
    args.image = None;
    assert!(matches!(
        args.parse(),
        Err(CasapipeError::QuicklookArgs(QuicklookArgsError::NoImage))
    ));

    let mut args = minimal_args();
    args.pv_start = None;
    assert!(matches!(
        args.parse(),
        Err(CasapipeError::QuicklookArgs(QuicklookArgsError::NoPvStart))
    ));
}

#[test]
fn test_parse_rejects_malformed_pixels_and_limits() {
    let mut args = minimal_args();
    args.pv_end = Some(vec![175]);
    assert!(matches!(
        args.parse(),
        Err(CasapipeError::QuicklookArgs(QuicklookArgsError::BadPixel(1)))
    ));

    let mut args = minimal_args();
    args.includepix = Some(vec![0.03]);
    assert!(matches!(
        args.parse(),
        Err(CasapipeError::QuicklookArgs(
            QuicklookArgsError::BadIncludePix(1)
        ))
    ));
}

#[test]
fn test_parse_rejects_bad_channel_ranges() {
    let mut args = minimal_args();
    args.chans = Some("420~630".to_string());
    assert!(args.parse().is_ok());

    let mut args = minimal_args();
    args.chans = Some("chans=420~630".to_string());
    assert!(matches!(
        args.parse(),
        Err(CasapipeError::QuicklookArgs(QuicklookArgsError::BadChans(_)))
    ));
}

#[test]
fn test_arg_file_round_trip() {
    let args = QuicklookArgs {
        channel: Some(522),
        chans: Some("420~630".to_string()),
        includepix: Some(vec![0.03, 100.0]),
        ..minimal_args()
    };
    let temp_dir = tempdir().expect("Couldn't make tempdir");
    let arg_file = temp_dir.path().join("quicklook.toml");
    let ser = toml::to_string_pretty(&args).expect("couldn't serialise QuicklookArgs as toml");
    std::fs::write(&arg_file, ser).unwrap();

    let merged = QuicklookArgs::parse_from([
        "quicklook",
        &arg_file.display().to_string(),
        "--channel",
        "600",
    ])
    .merge()
    .unwrap();
    assert_eq!(merged.channel, Some(600));
    assert_eq!(merged.includepix, Some(vec![0.03, 100.0]));
    let params = merged.parse().unwrap();
    assert_eq!(params.channel, Some(600));
}
