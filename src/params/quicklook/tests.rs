// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::*;

use std::fs;

use tempfile::TempDir;

use crate::casa::{mock::MockRunner, Value};

fn params(dir: &TempDir) -> QuicklookParams {
    let root = dir.path().display();
    QuicklookParams {
        image: format!("{root}/NGC7582_co21.fits"),
        channel: Some(522),
        pv_start: vec![148, 122],
        pv_end: vec![175, 175],
        chans: Some("420~630".to_string()),
        includepix: Some(vec![0.03, 100.0]),
        region: None,
        selection: StepSelectionArgs::default(),
    }
}

#[test]
fn test_full_run_task_sequence() {
    let dir = TempDir::new().unwrap();
    let params = params(&dir);
    fs::write(&params.image, b"").unwrap();

    let mut runner = MockRunner::recording();
    params.run(&mut runner, false).unwrap();
    assert_eq!(
        runner.tasks_run(),
        vec![
            "imstat",
            "imstat",
            "impv",
            "exportfits",
            "immoments",
            "exportfits",
            "exportfits",
            "exportfits"
        ]
    );

    // The first imstat reports the requested channel only, the second
    // covers the whole cube.
    assert_eq!(
        runner.calls[0].args.get("chans"),
        Some(&Value::Str("522".to_string()))
    );
    assert_eq!(runner.calls[1].args.get("chans"), None);

    let impv = &runner.calls[2];
    assert_eq!(impv.args.get("mode"), Some(&Value::Str("coords".to_string())));
    assert_eq!(impv.args.get("start"), Some(&Value::IntList(vec![148, 122])));
    assert_eq!(impv.args.get("end"), Some(&Value::IntList(vec![175, 175])));

    let immoments = &runner.calls[4];
    assert_eq!(
        immoments.args.get("moments"),
        Some(&Value::IntList(vec![0, 1, 8]))
    );
    assert_eq!(
        immoments.args.get("includepix"),
        Some(&Value::FloatList(vec![0.03, 100.0]))
    );
    assert_eq!(
        immoments.args.get("chans"),
        Some(&Value::Str("420~630".to_string()))
    );
    assert_eq!(immoments.args.get("region"), None);
}

#[test]
fn test_product_names_follow_the_cube_name() {
    let dir = TempDir::new().unwrap();
    let params = params(&dir);
    let root = dir.path().display();
    assert_eq!(params.pv_image(), format!("{root}/NGC7582_co21.pv"));
    assert_eq!(
        params.moment_images(),
        [
            format!("{root}/NGC7582_co21.moment.integrated"),
            format!("{root}/NGC7582_co21.moment.weighted_coord"),
            format!("{root}/NGC7582_co21.moment.maximum"),
        ]
    );
}

#[test]
fn test_no_channel_means_one_imstat() {
    let dir = TempDir::new().unwrap();
    let mut params = params(&dir);
    params.channel = None;
    params.selection.steps = vec![0];
    fs::write(&params.image, b"").unwrap();

    let mut runner = MockRunner::recording();
    params.run(&mut runner, false).unwrap();
    assert_eq!(runner.tasks_run(), vec!["imstat"]);
}

#[test]
fn test_missing_cube_aborts_immediately() {
    let dir = TempDir::new().unwrap();
    let params = params(&dir);

    let mut runner = MockRunner::recording();
    let err = params.run(&mut runner, false).unwrap_err();
    assert!(err.to_string().contains("NGC7582_co21.fits"));
    assert!(runner.calls.is_empty());
}
