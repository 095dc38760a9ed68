// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::*;

use tempfile::TempDir;

use crate::artifacts::ArtifactError;
use crate::casa::{mock::MockRunner, Value};
use crate::pipeline::{PipelineError, StepError};

fn params(dir: &TempDir) -> ContinuumParams {
    let root = dir.path().display();
    ContinuumParams {
        vis: format!("{root}/uid___A002_X1003af4_Xa540.ms"),
        field: "PN_Hb_5".to_string(),
        image_base: format!("{root}/PN_Hb_5"),
        spw: Some("25,27,29,31".to_string()),
        datacolumn: crate::cli::common::DataColumn::Corrected,
        cont_channels: "0:226.20~226.26GHz;226.39~226.56GHz".to_string(),
        imsize: vec![320, 300],
        cell: "0.22arcsec".to_string(),
        phasecenter: Some("ICRS 17:47:56.2008 -029.59.39.588".to_string()),
        niter: 1_000_000,
        threshold: "1.17mJy".to_string(),
        robust: 0.5,
        gridder: "mosaic".to_string(),
        deconvolver: "hogbom".to_string(),
        weighting: "briggs".to_string(),
        masktype: "auto-multithresh".to_string(),
        selection: StepSelectionArgs::default(),
    }
}

#[test]
fn test_full_run_then_idempotent_rerun() {
    let dir = TempDir::new().unwrap();
    let params = params(&dir);

    let mut runner = MockRunner::recording();
    params.run(&mut runner, false).unwrap();
    assert_eq!(runner.tasks_run(), vec!["split", "tclean", "tclean"]);

    // Everything now exists, so a re-run performs no work at all.
    let mut second = MockRunner {
        forbidden_tasks: vec!["split".to_string(), "tclean".to_string()],
        create_outputs: true,
        ..MockRunner::default()
    };
    params.run(&mut second, false).unwrap();
    assert!(second.calls.is_empty());
}

#[test]
fn test_dirty_image_arguments_are_derived_not_shared() {
    let dir = TempDir::new().unwrap();
    let params = params(&dir);

    let mut runner = MockRunner::recording();
    params.run(&mut runner, false).unwrap();

    let dirty = &runner.calls[1];
    assert_eq!(dirty.args.get("niter"), Some(&Value::Int(0)));
    assert_eq!(dirty.args.get("usemask"), Some(&Value::None));
    assert_eq!(dirty.args.get("threshold"), Some(&Value::None));
    assert_eq!(dirty.args.get("interactive"), Some(&Value::Bool(false)));

    // The clean call's arguments were not contaminated by the overrides.
    let clean = &runner.calls[2];
    assert_eq!(clean.args.get("niter"), Some(&Value::Int(1_000_000)));
    assert_eq!(
        clean.args.get("usemask"),
        Some(&Value::Str("auto-multithresh".to_string()))
    );
    assert_eq!(
        clean.args.get("threshold"),
        Some(&Value::Str("1.17mJy".to_string()))
    );
}

#[test]
fn test_imaging_without_split_data_is_a_missing_input() {
    let dir = TempDir::new().unwrap();
    let mut params = params(&dir);
    params.selection.steps = vec![1];

    let mut runner = MockRunner::recording();
    let err = params.run(&mut runner, false).unwrap_err();
    match err {
        CasapipeError::Pipeline(PipelineError::Step { id: 1, source, .. }) => {
            assert!(matches!(
                source,
                StepError::Artifact(ArtifactError::MissingInput { .. })
            ))
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(runner.calls.is_empty());
}

#[test]
fn test_dry_run_executes_nothing() {
    let dir = TempDir::new().unwrap();
    let params = params(&dir);
    let mut runner = MockRunner {
        forbidden_tasks: vec!["split".to_string(), "tclean".to_string()],
        ..MockRunner::default()
    };
    params.run(&mut runner, true).unwrap();
    assert!(runner.calls.is_empty());
}
