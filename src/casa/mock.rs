// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A scripted stand-in for CASA used by pipeline tests.

use std::fs;
use std::path::PathBuf;

use super::{CasaCall, CasaError, CasaRunner, Value};

/// Keyword arguments that name a task's main output. When
/// `create_outputs` is on, the mock touches these paths so that
/// downstream existence checks behave as if CASA had really run.
const OUTPUT_KEYS: [&str; 7] = [
    "caltable",
    "outputvis",
    "outfile",
    "output",
    "fitsimage",
    "listfile",
    "plotfile",
];

#[derive(Default)]
pub(crate) struct MockRunner {
    /// Every call made, in order.
    pub(crate) calls: Vec<CasaCall>,
    /// If set, fail (once per call) whenever this task is invoked.
    pub(crate) fail_task: Option<String>,
    /// Tasks that must not be invoked at all; reaching one is a test
    /// failure.
    pub(crate) forbidden_tasks: Vec<String>,
    /// Fabricate the artifacts a real CASA run would leave behind.
    pub(crate) create_outputs: bool,
}

impl MockRunner {
    pub(crate) fn recording() -> MockRunner {
        MockRunner {
            create_outputs: true,
            ..MockRunner::default()
        }
    }

    pub(crate) fn tasks_run(&self) -> Vec<&str> {
        self.calls.iter().map(|c| c.task.as_str()).collect()
    }

    fn fabricate_outputs(&self, call: &CasaCall) {
        // `tclean` and friends write a family of directories under the
        // image base name; one `.image` directory is enough for the
        // existence guards.
        if let Some(Value::Str(base)) = call.args.get("imagename") {
            if call.task == "tclean" {
                fs::create_dir_all(format!("{base}.image")).unwrap();
                fs::create_dir_all(format!("{base}.model")).unwrap();
            }
        }
        for key in OUTPUT_KEYS {
            if let Some(Value::Str(path)) = call.args.get(key) {
                let path = PathBuf::from(path);
                match path.extension().and_then(|e| e.to_str()) {
                    // Plain-file outputs.
                    Some("txt" | "png" | "fits") => {
                        fs::write(&path, b"").unwrap();
                    }
                    // Measurement sets, caltables and CASA images are
                    // directories.
                    _ => {
                        fs::create_dir_all(&path).unwrap();
                    }
                }
            }
        }
    }
}

impl CasaRunner for MockRunner {
    fn run(&mut self, call: &CasaCall) -> Result<(), CasaError> {
        assert!(
            !self.forbidden_tasks.iter().any(|t| *t == call.task),
            "task '{}' was invoked but its output already existed: {call}",
            call.task
        );
        self.calls.push(call.clone());
        if self.fail_task.as_deref() == Some(call.task.as_str()) {
            return Err(CasaError::TaskFailed {
                task: call.task.clone(),
                details: "scripted failure".to_string(),
            });
        }
        if self.create_outputs {
            self.fabricate_outputs(call);
        }
        Ok(())
    }
}
