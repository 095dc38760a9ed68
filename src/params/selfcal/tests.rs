// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::*;

use tempfile::TempDir;

use crate::casa::{mock::MockRunner, Value};
use crate::constants::DEFAULT_SOLINT_SWEEP;

fn params(dir: &TempDir) -> SelfcalParams {
    SelfcalParams {
        vis: dir.path().join("7582_selfcal.ms").display().to_string(),
        field: "NGC7582".to_string(),
        refant: "DV14".to_string(),
        cont_channels: "0:166~194;304~475,1:50~172;216~356;428~436".to_string(),
        cell: "0.018arcsec".to_string(),
        imsize: vec![2304, 2304],
        apply_spw: vec![0, 1],
        mask: Some("7582_cont_cleanmask.mask".to_string()),
        min_snr: 3.0,
        solint_sweep: DEFAULT_SOLINT_SWEEP.iter().map(|s| s.to_string()).collect(),
        niter_initial: 200,
        niter_final: 300,
        scales: vec![0, 4, 8, 12],
        noise_region: None,
        peak_region: None,
        selection: StepSelectionArgs::default(),
    }
}

fn str_list(value: &Value) -> Vec<String> {
    match value {
        Value::StrList(v) => v.clone(),
        other => panic!("expected a string list, got {other}"),
    }
}

#[test]
fn test_full_run_task_counts() {
    let dir = TempDir::new().unwrap();
    let params = params(&dir);

    let mut runner = MockRunner::recording();
    params.run(&mut runner, false).unwrap();

    let count = |task: &str| runner.calls.iter().filter(|c| c.task == task).count();
    // Steps 1, 2, 8, 13, 16 and 19 image; 3, 8, 13, 16 and 19 push the
    // model back; 4, 11, 14 and 17 solve, plus two sweeps over the
    // solution intervals.
    assert_eq!(count("tclean"), 6);
    assert_eq!(count("ft"), 5);
    assert_eq!(count("gaincal"), 4 + 2 * DEFAULT_SOLINT_SWEEP.len());
    assert_eq!(count("applycal"), 4);
    assert_eq!(count("listobs"), 1);
    assert_eq!(count("plotants"), 2);
}

#[test]
fn test_caltable_chaining() {
    let dir = TempDir::new().unwrap();
    let params = params(&dir);

    let mut runner = MockRunner::recording();
    params.run(&mut runner, false).unwrap();

    let ph1 = caltable_name(&params.vis, "ph1", "inf").display().to_string();
    let ph2 = caltable_name(&params.vis, "ph2", "60s").display().to_string();
    let ap1 = caltable_name(&params.vis, "ap1", "120s").display().to_string();
    let ap2 = caltable_name(&params.vis, "ap2", "60s").display().to_string();

    // The last gaincal solves ap2 on top of the three earlier tables.
    let ap2_solve = runner
        .calls
        .iter()
        .filter(|c| c.task == "gaincal")
        .find(|c| c.args.get("caltable") == Some(&Value::Str(ap2.clone())))
        .expect("no gaincal call for the ap2 cycle");
    assert_eq!(
        str_list(ap2_solve.args.get("gaintable").unwrap()),
        vec![ph1.clone(), ph2.clone(), ap1.clone()]
    );
    assert_eq!(ap2_solve.args.get("calmode"), Some(&Value::Str("ap".into())));
    assert_eq!(ap2_solve.args.get("gaintype"), Some(&Value::Str("T".into())));
    assert_eq!(
        ap2_solve.args.get("spwmap"),
        Some(&Value::IntListList(vec![
            vec![0, 1],
            vec![0, 1],
            vec![0, 1]
        ]))
    );

    // The final applycal applies all four tables with calflag.
    let last_apply = runner
        .calls
        .iter()
        .filter(|c| c.task == "applycal")
        .last()
        .unwrap();
    assert_eq!(
        str_list(last_apply.args.get("gaintable").unwrap()),
        vec![ph1, ph2, ap1, ap2]
    );
    assert_eq!(
        last_apply.args.get("applymode"),
        Some(&Value::Str("calflag".into()))
    );
}

#[test]
fn test_rerun_skips_the_imaging() {
    let dir = TempDir::new().unwrap();
    let mut params = params(&dir);
    params.selection.steps = vec![1, 2];

    params.run(&mut MockRunner::recording(), false).unwrap();

    let mut second = MockRunner {
        forbidden_tasks: vec!["tclean".to_string()],
        ..MockRunner::default()
    };
    params.run(&mut second, false).unwrap();
    assert!(second.calls.is_empty());
}

#[test]
fn test_applycal_without_its_table_is_a_missing_input() {
    let dir = TempDir::new().unwrap();
    let mut params = params(&dir);
    params.selection.steps = vec![7];

    let mut runner = MockRunner::recording();
    let err = params.run(&mut runner, false).unwrap_err();
    assert!(err
        .to_string()
        .contains(&caltable_name(&params.vis, "ph1", "inf").display().to_string()));
    assert!(runner.calls.is_empty());
}

#[test]
fn test_snr_step_without_the_sweep_is_advisory() {
    let dir = TempDir::new().unwrap();
    let mut params = params(&dir);
    // The SNR step can't find the swept tables, but the run carries on
    // to the applycal step, which does have its input.
    params.selection.steps = vec![4, 6, 7];

    let mut runner = MockRunner::recording();
    params.run(&mut runner, false).unwrap();
    assert_eq!(runner.tasks_run(), vec!["gaincal", "plotms", "applycal"]);
}
