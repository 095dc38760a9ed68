// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The boundary to CASA. Everything computational in these pipelines --
//! gridding, deconvolution, gain solving, continuum subtraction,
//! regridding, feathering, moments -- happens on the other side of this
//! module.
//!
//! A [CasaCall] is a task name plus an ordered keyword-argument payload;
//! we only ever treat the payload structurally (copy and override), its
//! meaning is CASA's business. A [CasaRunner] executes calls, blocking
//! until CASA is done. The production runner spawns a `casa` process per
//! call; tests substitute a scripted mock.

#[cfg(test)]
pub(crate) mod mock;
#[cfg(test)]
mod tests;

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use indexmap::IndexMap;
use log::{debug, info};
use thiserror::Error;

/// A value in a CASA task's keyword arguments, rendered as the equivalent
/// Python literal.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    IntList(Vec<i64>),
    FloatList(Vec<f64>),
    StrList(Vec<String>),
    /// Nested integer lists, as used by `spwmap` when several gain tables
    /// are applied at once.
    IntListList(Vec<Vec<i64>>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn write_int_list(f: &mut fmt::Formatter, list: &[i64]) -> fmt::Result {
            write!(f, "[")?;
            for (i, v) in list.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{v}")?;
            }
            write!(f, "]")
        }

        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "'{}'", s.replace('\\', r"\\").replace('\'', r"\'")),
            Value::IntList(list) => write_int_list(f, list),
            Value::FloatList(list) => {
                write!(f, "[")?;
                for (i, x) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{x:?}")?;
                }
                write!(f, "]")
            }
            Value::StrList(list) => {
                write!(f, "[")?;
                for (i, s) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", Value::Str(s.clone()))?;
                }
                write!(f, "]")
            }
            Value::IntListList(lists) => {
                write!(f, "[")?;
                for (i, list) in lists.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_int_list(f, list)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Value {
        Value::Int(i)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Value {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Value {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Str(s)
    }
}

impl From<&Path> for Value {
    fn from(p: &Path) -> Value {
        Value::Str(p.display().to_string())
    }
}

impl From<&PathBuf> for Value {
    fn from(p: &PathBuf) -> Value {
        Value::Str(p.display().to_string())
    }
}

impl From<Vec<i64>> for Value {
    fn from(list: Vec<i64>) -> Value {
        Value::IntList(list)
    }
}

impl From<Vec<f64>> for Value {
    fn from(list: Vec<f64>) -> Value {
        Value::FloatList(list)
    }
}

impl From<Vec<Vec<i64>>> for Value {
    fn from(lists: Vec<Vec<i64>>) -> Value {
        Value::IntListList(lists)
    }
}

impl From<Vec<String>> for Value {
    fn from(list: Vec<String>) -> Value {
        Value::StrList(list)
    }
}

/// An ordered keyword-argument payload for a CASA task.
///
/// Composition is shallow and pure: [TaskArgs::with_overrides] returns an
/// independent copy, so deriving (say) dirty-image arguments from clean
/// ones can never contaminate the base set used by a later step.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct TaskArgs(IndexMap<String, Value>);

impl TaskArgs {
    pub(crate) fn new() -> TaskArgs {
        TaskArgs(IndexMap::new())
    }

    pub(crate) fn set<V: Into<Value>>(&mut self, key: &str, value: V) {
        self.0.insert(key.to_string(), value.into());
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// A copy of these arguments with each key in `overrides` replaced (or
    /// added). `self` is untouched.
    pub(crate) fn with_overrides(&self, overrides: &TaskArgs) -> TaskArgs {
        let mut composed = self.clone();
        for (key, value) in &overrides.0 {
            composed.0.insert(key.clone(), value.clone());
        }
        composed
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// One CASA task invocation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CasaCall {
    pub(crate) task: String,
    pub(crate) args: TaskArgs,
}

impl CasaCall {
    pub(crate) fn new(task: &str) -> CasaCall {
        CasaCall {
            task: task.to_string(),
            args: TaskArgs::new(),
        }
    }

    pub(crate) fn with_args(task: &str, args: TaskArgs) -> CasaCall {
        CasaCall {
            task: task.to_string(),
            args,
        }
    }

    pub(crate) fn arg<V: Into<Value>>(mut self, key: &str, value: V) -> CasaCall {
        self.args.set(key, value);
        self
    }

    /// The Python script handed to `casa -c`. Tasks don't reliably reflect
    /// their failures in CASA's exit status, so the call is wrapped to
    /// force a non-zero exit.
    fn to_script(&self) -> String {
        format!(
            "import sys\n\
             try:\n    {self}\n\
             except Exception as e:\n    print('casapipe: task failed:', e); sys.exit(1)"
        )
    }
}

impl fmt::Display for CasaCall {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}(", self.task)?;
        for (i, (key, value)) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        write!(f, ")")
    }
}

/// Executes CASA calls, blocking until each one completes.
pub(crate) trait CasaRunner {
    fn run(&mut self, call: &CasaCall) -> Result<(), CasaError>;
}

/// The production runner: one `casa` child process per call.
pub(crate) struct CasaProcess {
    executable: PathBuf,
}

impl CasaProcess {
    pub(crate) fn new(executable: PathBuf) -> CasaProcess {
        CasaProcess { executable }
    }
}

impl CasaRunner for CasaProcess {
    fn run(&mut self, call: &CasaCall) -> Result<(), CasaError> {
        info!("casa: {call}");
        let script = call.to_script();
        debug!("Script handed to CASA:\n{script}");

        let output = Command::new(&self.executable)
            .args(["--nologger", "--nogui", "--agg", "-c"])
            .arg(&script)
            .output()
            .map_err(|e| CasaError::Spawn {
                executable: self.executable.display().to_string(),
                source: e,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            // Keep CASA's own message intact; the tail of the combined
            // output is where tclean/gaincal put their complaints.
            let mut details = String::from_utf8_lossy(&output.stdout).into_owned();
            details.push_str(&String::from_utf8_lossy(&output.stderr));
            let tail: Vec<&str> = details.lines().rev().take(20).collect();
            Err(CasaError::TaskFailed {
                task: call.task.clone(),
                details: tail.into_iter().rev().collect::<Vec<_>>().join("\n"),
            })
        }
    }
}

#[derive(Debug, Error)]
pub enum CasaError {
    #[error("Couldn't launch CASA as '{executable}': {source}. Is CASA installed and on your PATH?")]
    Spawn {
        executable: String,
        source: std::io::Error,
    },

    #[error("CASA task '{task}' failed:\n{details}")]
    TaskFailed { task: String, details: String },
}
