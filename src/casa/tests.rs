// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::*;

#[test]
fn test_value_python_rendering() {
    assert_eq!(Value::None.to_string(), "None");
    assert_eq!(Value::Bool(true).to_string(), "True");
    assert_eq!(Value::Bool(false).to_string(), "False");
    assert_eq!(Value::Int(0).to_string(), "0");
    assert_eq!(Value::Float(0.5).to_string(), "0.5");
    assert_eq!(Value::Str("7582_selfcal.ms".into()).to_string(), "'7582_selfcal.ms'");
    assert_eq!(Value::IntList(vec![0, 4, 8, 12]).to_string(), "[0, 4, 8, 12]");
    assert_eq!(
        Value::FloatList(vec![0.03, 100.0]).to_string(),
        "[0.03, 100.0]"
    );
    assert_eq!(
        Value::StrList(vec!["a.tb".into(), "b.tb".into()]).to_string(),
        "['a.tb', 'b.tb']"
    );
    assert_eq!(
        Value::IntListList(vec![vec![0, 1], vec![0, 1]]).to_string(),
        "[[0, 1], [0, 1]]"
    );
}

#[test]
fn test_string_values_are_escaped() {
    assert_eq!(Value::Str("it's".into()).to_string(), r"'it\'s'");
}

#[test]
fn test_call_rendering_keeps_argument_order() {
    let call = CasaCall::new("tclean")
        .arg("vis", "x.ms")
        .arg("imagename", "x.dirty")
        .arg("niter", 0_i64)
        .arg("interactive", false)
        .arg("usemask", Value::None);
    assert_eq!(
        call.to_string(),
        "tclean(vis='x.ms', imagename='x.dirty', niter=0, interactive=False, usemask=None)"
    );
}

#[test]
fn test_script_wraps_the_call() {
    let script = CasaCall::new("listobs").arg("vis", "x.ms").to_script();
    assert!(script.contains("listobs(vis='x.ms')"));
    assert!(script.contains("sys.exit(1)"));
}

#[test]
fn test_with_overrides_is_a_pure_copy() {
    // The canonical derivation: dirty-image arguments from clean
    // arguments.
    let mut base = TaskArgs::new();
    base.set("niter", 1000_i64);
    base.set("mask", "auto");

    let mut overrides = TaskArgs::new();
    overrides.set("niter", 0_i64);
    overrides.set("mask", Value::None);

    let composed = base.with_overrides(&overrides);
    assert_eq!(composed.get("niter"), Some(&Value::Int(0)));
    assert_eq!(composed.get("mask"), Some(&Value::None));

    // The base is unchanged after the call.
    assert_eq!(base.get("niter"), Some(&Value::Int(1000)));
    assert_eq!(base.get("mask"), Some(&Value::Str("auto".into())));
}

#[test]
fn test_composed_results_are_independent() {
    let mut base = TaskArgs::new();
    base.set("niter", 1000_i64);

    let mut dirty = TaskArgs::new();
    dirty.set("niter", 0_i64);
    let mut deep = TaskArgs::new();
    deep.set("niter", 100000_i64);

    let mut a = base.with_overrides(&dirty);
    let b = base.with_overrides(&deep);
    a.set("niter", 42_i64);
    assert_eq!(b.get("niter"), Some(&Value::Int(100000)));
    assert_eq!(base.get("niter"), Some(&Value::Int(1000)));
}

#[test]
fn test_overrides_can_add_new_keys() {
    let mut base = TaskArgs::new();
    base.set("specmode", "cube");

    let mut chunk = TaskArgs::new();
    chunk.set("start", 186_i64);
    chunk.set("width", 1_i64);
    chunk.set("nchan", 113_i64);

    let composed = base.with_overrides(&chunk);
    assert_eq!(composed.get("specmode"), Some(&Value::Str("cube".into())));
    assert_eq!(composed.get("start"), Some(&Value::Int(186)));
    assert_eq!(composed.get("nchan"), Some(&Value::Int(113)));
}
