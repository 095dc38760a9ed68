// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The step-gated pipeline mechanism shared by every subcommand.
//!
//! A pipeline is a fixed table of numbered steps, declared once in
//! ascending order. A run may select a subset of the table; the subset is
//! always executed in declared order, whatever order the user typed it
//! in. Each step's action owns its idempotency: expensive products are
//! skipped when their artifact already exists, diagnostics are removed
//! and regenerated. Steps marked advisory may fail without stopping the
//! run; anything else fails the run on the spot.
//!
//! Steps run strictly sequentially, and the existence-check guards assume
//! a single invocation owning the working directory at a time. Running
//! two pipelines concurrently against the same artifacts is on the
//! operator.


use std::borrow::Cow;

use log::{info, warn};
use thiserror::Error;

use crate::artifacts::ArtifactError;
use crate::casa::{CasaError, CasaRunner};

/// What a step's action can fail with.
#[derive(Debug, Error)]
pub enum StepError {
    /// A needed artifact from an earlier step isn't on disk.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// The delegated CASA operation failed. Never retried.
    #[error(transparent)]
    Casa(#[from] CasaError),
}

type Action<'p> = Box<dyn Fn(&mut dyn CasaRunner) -> Result<(), StepError> + 'p>;

/// One numbered entry in a pipeline's step table.
pub(crate) struct Step<'p> {
    pub(crate) id: usize,
    pub(crate) title: Cow<'static, str>,
    advisory: bool,
    action: Action<'p>,
}

impl<'p> Step<'p> {
    pub(crate) fn new<T, A>(id: usize, title: T, action: A) -> Step<'p>
    where
        T: Into<Cow<'static, str>>,
        A: Fn(&mut dyn CasaRunner) -> Result<(), StepError> + 'p,
    {
        Step {
            id,
            title: title.into(),
            advisory: false,
            action: Box::new(action),
        }
    }

    /// Mark this step as a diagnostic whose failure shouldn't stop the
    /// run.
    pub(crate) fn advisory(mut self) -> Step<'p> {
        self.advisory = true;
        self
    }
}

pub(crate) struct Pipeline<'p> {
    steps: Vec<Step<'p>>,
    /// Ids to run, a subset of the declared ids, in declared order.
    selection: Vec<usize>,
}

impl<'p> Pipeline<'p> {
    /// Declare the step table. Ids must be unique and ascending; the
    /// default selection is every step.
    pub(crate) fn new(steps: Vec<Step<'p>>) -> Result<Pipeline<'p>, PipelineError> {
        for pair in steps.windows(2) {
            if pair[1].id <= pair[0].id {
                return Err(PipelineError::MisorderedSteps {
                    prev: pair[0].id,
                    id: pair[1].id,
                });
            }
        }
        let selection = steps.iter().map(|s| s.id).collect();
        Ok(Pipeline { steps, selection })
    }

    /// Record which steps to run. An empty selection means "all steps".
    /// The declared order always wins over the caller-supplied order, and
    /// duplicates are ignored.
    pub(crate) fn select(&mut self, requested: &[usize]) -> Result<(), PipelineError> {
        if let Some(&id) = requested
            .iter()
            .find(|id| !self.steps.iter().any(|s| s.id == **id))
        {
            return Err(PipelineError::UnknownStep { id });
        }
        self.selection = if requested.is_empty() {
            self.steps.iter().map(|s| s.id).collect()
        } else {
            self.steps
                .iter()
                .map(|s| s.id)
                .filter(|id| requested.contains(id))
                .collect()
        };
        Ok(())
    }

    /// The steps that would run, in order.
    pub(crate) fn selected(&self) -> impl Iterator<Item = &Step<'p>> {
        self.steps
            .iter()
            .filter(|s| self.selection.contains(&s.id))
    }

    pub(crate) fn describe(&self) {
        for step in self.selected() {
            let tag = if step.advisory { " [advisory]" } else { "" };
            info!("Step {:2}: {}{}", step.id, step.title, tag);
        }
    }

    /// Run the selected steps in declared order. The first failure of a
    /// non-advisory step aborts the run; nothing already done is rolled
    /// back, and partially-written artifacts are left for the operator to
    /// inspect and delete.
    pub(crate) fn run(&self, runner: &mut dyn CasaRunner) -> Result<(), PipelineError> {
        for step in self.selected() {
            info!("Step {} - {}", step.id, step.title);
            match (step.action)(runner) {
                Ok(()) => (),
                Err(e) if step.advisory => {
                    warn!("Advisory step {} ({}) failed: {e}", step.id, step.title);
                    warn!("Continuing with the remaining steps");
                }
                Err(source) => {
                    return Err(PipelineError::Step {
                        id: step.id,
                        title: step.title.to_string(),
                        source,
                    })
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Malformed step table: step {id} is declared after step {prev}; ids must be unique and ascending")]
    MisorderedSteps { prev: usize, id: usize },

    #[error("Step {id} was selected, but the pipeline declares no such step")]
    UnknownStep { id: usize },

    #[error("Step {id} ({title}) failed: {source}")]
    Step {
        id: usize,
        title: String,
        #[source]
        source: StepError,
    },
}
