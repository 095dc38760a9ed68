// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The continuum self-calibration pipeline: an initial model, then four
//! rounds of gaincal/applycal/re-image, finishing with a multiscale
//! clean. Round N's gaincal applies rounds 1..N-1's tables on the fly,
//! and each applycal applies every table solved so far, so the caltable
//! names chain from step to step.
//!
//! The solution-interval sweeps and their SNR distributions (steps 5, 6,
//! 9 and 10) are advisory: they inform the choice of solution interval
//! but produce nothing later steps need, so their failure doesn't stop
//! the run.

#[cfg(test)]
mod tests;

use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::info;

use super::run_pipeline;
use crate::artifacts::{caltable_name, remove_if_present, require_input, ArtifactError, ImageSet};
use crate::casa::{CasaCall, CasaRunner, TaskArgs};
use crate::cli::common::StepSelectionArgs;
use crate::cli::CasapipeError;
use crate::pipeline::{Step, StepError};

/// One self-calibration cycle's gaincal settings. The cycles are fixed;
/// what varies between datasets is everything else.
struct SelfcalCycle {
    name: &'static str,
    solint: &'static str,
    calmode: &'static str,
    gaintype: &'static str,
}

const CYCLES: [SelfcalCycle; 4] = [
    SelfcalCycle {
        name: "ph1",
        solint: "inf",
        calmode: "p",
        gaintype: "G",
    },
    SelfcalCycle {
        name: "ph2",
        solint: "60s",
        calmode: "p",
        gaintype: "G",
    },
    SelfcalCycle {
        name: "ap1",
        solint: "120s",
        calmode: "ap",
        gaintype: "G",
    },
    SelfcalCycle {
        name: "ap2",
        solint: "60s",
        calmode: "ap",
        gaintype: "T",
    },
];

/// Antennas are plotted eight per page; three pages covers an ALMA
/// configuration's worth.
const ANTENNA_TRIPLETS: usize = 3;

pub(crate) struct SelfcalParams {
    pub(crate) vis: String,
    pub(crate) field: String,
    pub(crate) refant: String,
    pub(crate) cont_channels: String,
    pub(crate) cell: String,
    pub(crate) imsize: Vec<i64>,
    /// The spectral windows the solutions are applied to.
    pub(crate) apply_spw: Vec<i64>,
    /// A user-drawn clean mask; without one, tclean is left unmasked.
    pub(crate) mask: Option<String>,
    pub(crate) min_snr: f64,
    /// The solution intervals tried by the exploration steps.
    pub(crate) solint_sweep: Vec<String>,
    pub(crate) niter_initial: i64,
    pub(crate) niter_final: i64,
    pub(crate) scales: Vec<i64>,
    /// imstat regions for the rms and peak diagnostics after each clean.
    pub(crate) noise_region: Option<String>,
    pub(crate) peak_region: Option<String>,
    pub(crate) selection: StepSelectionArgs,
}

impl SelfcalParams {
    fn caltable(&self, cycle: &SelfcalCycle) -> PathBuf {
        caltable_name(&self.vis, cycle.name, cycle.solint)
    }

    /// The tables solved by cycles `0..n`, in solve order.
    fn caltables_through(&self, n: usize) -> Vec<PathBuf> {
        CYCLES[..n].iter().map(|c| self.caltable(c)).collect()
    }

    fn spwmap_for(&self, num_tables: usize) -> Vec<Vec<i64>> {
        (0..num_tables).map(|_| self.apply_spw.clone()).collect()
    }

    fn apply_spw_string(&self) -> String {
        self.apply_spw.iter().join(",")
    }

    fn dirty_image(&self) -> ImageSet {
        ImageSet::new(format!("{}_cont.dirty", self.vis))
    }

    fn initial_clean_image(&self) -> ImageSet {
        ImageSet::new(format!("{}_cont0.init.clean", self.vis))
    }

    fn cycle_clean_image(&self, cycle: &SelfcalCycle) -> ImageSet {
        ImageSet::new(format!("{}_cont.{}.clean", self.vis, cycle.name))
    }

    fn sweep_tag(&self, cycle: &SelfcalCycle) -> String {
        format!("{}_checks", cycle.name)
    }

    /// The folder a cycle's sweep outputs are collected into, next to
    /// the measurement set.
    fn checks_dir(&self, cycle: &SelfcalCycle) -> PathBuf {
        let parent = Path::new(&self.vis).parent().unwrap_or_else(|| Path::new(""));
        parent.join(self.sweep_tag(cycle))
    }

    /// Where a sweep table is solved, before the move into the checks
    /// folder.
    fn sweep_caltable(&self, cycle: &SelfcalCycle, solint: &str) -> String {
        format!("{}.{}.solint_{solint}.tb", self.vis, self.sweep_tag(cycle))
    }

    fn tclean_call(&self, image: &ImageSet, niter: i64) -> CasaCall {
        let mut call = CasaCall::new("tclean")
            .arg("vis", self.vis.as_str())
            .arg("imagename", image.base())
            .arg("field", self.field.as_str())
            .arg("spw", self.cont_channels.as_str())
            .arg("specmode", "mfs")
            .arg("cell", self.cell.as_str())
            .arg("imsize", self.imsize.clone())
            .arg("niter", niter)
            .arg("interactive", false);
        if let Some(mask) = self.mask.as_deref() {
            call = call.arg("usemask", "user").arg("mask", mask);
        }
        call
    }

    fn gaincal_args(&self) -> TaskArgs {
        let mut args = TaskArgs::new();
        args.set("vis", self.vis.as_str());
        args.set("field", self.field.as_str());
        args.set("refant", self.refant.as_str());
        args.set("spw", self.cont_channels.as_str());
        args.set("minsnr", self.min_snr);
        args
    }

    fn gaincal_call(&self, cycle_idx: usize) -> CasaCall {
        let cycle = &CYCLES[cycle_idx];
        let mut args = self.gaincal_args();
        args.set("caltable", self.caltable(cycle).as_path());
        if cycle_idx > 0 {
            let prior = self.caltables_through(cycle_idx);
            args.set("spwmap", self.spwmap_for(prior.len()));
            args.set(
                "gaintable",
                prior
                    .iter()
                    .map(|t| t.display().to_string())
                    .collect::<Vec<_>>(),
            );
        }
        args.set("calmode", cycle.calmode);
        args.set("solint", cycle.solint);
        args.set("gaintype", cycle.gaintype);
        CasaCall::with_args("gaincal", args)
    }

    fn applycal_call(&self, through_cycle: usize, applymode: &str) -> CasaCall {
        let tables = self.caltables_through(through_cycle);
        CasaCall::new("applycal")
            .arg("vis", self.vis.as_str())
            .arg("field", self.field.as_str())
            .arg("spw", self.apply_spw_string())
            .arg("spwmap", self.spwmap_for(tables.len()))
            .arg(
                "gaintable",
                tables
                    .iter()
                    .map(|t| t.display().to_string())
                    .collect::<Vec<_>>(),
            )
            .arg("calwt", false)
            .arg("applymode", applymode)
            .arg("flagbackup", false)
    }

    /// A per-antenna plot of a gain table, a fresh png each time.
    fn caltable_plot(&self, caltable: &str) -> Result<CasaCall, StepError> {
        let plotfile = format!("{caltable}.png");
        remove_if_present(Path::new(&plotfile))?;
        Ok(CasaCall::new("plotms")
            .arg("vis", caltable)
            .arg("xaxis", "time")
            .arg("yaxis", "phase")
            .arg("iteraxis", "antenna")
            .arg("gridrows", 3_i64)
            .arg("gridcols", 3_i64)
            .arg("coloraxis", "spw")
            .arg("highres", true)
            .arg("showgui", false)
            .arg("plotfile", plotfile))
    }

    /// rms and peak statistics of a cleaned image, written via imstat
    /// logfiles. Regenerated on every run.
    fn image_stats(
        &self,
        image: &ImageSet,
        runner: &mut dyn CasaRunner,
    ) -> Result<(), StepError> {
        let regions = [
            ("rms", self.noise_region.as_deref()),
            ("peak", self.peak_region.as_deref()),
        ];
        for (kind, region) in regions {
            let Some(region) = region else { continue };
            let logfile = format!("{}.stats_{kind}.txt", image.image().display());
            remove_if_present(Path::new(&logfile))?;
            runner.run(
                &CasaCall::new("imstat")
                    .arg("imagename", image.image().as_path())
                    .arg("region", region)
                    .arg("logfile", logfile),
            )?;
        }
        Ok(())
    }

    /// Clean, record image statistics, then push the model back into the
    /// measurement set with ft so the next gaincal can use it.
    fn clean_and_save_model(
        &self,
        image: &ImageSet,
        niter: i64,
        extra: Option<TaskArgs>,
        runner: &mut dyn CasaRunner,
    ) -> Result<(), StepError> {
        if image.exists() {
            info!("{} already exists; skipping", image.image().display());
            return Ok(());
        }
        let mut call = self.tclean_call(image, niter);
        if let Some(extra) = extra {
            call.args = call.args.with_overrides(&extra);
        }
        runner.run(&call)?;
        self.image_stats(image, runner)?;
        runner.run(
            &CasaCall::new("ft")
                .arg("vis", self.vis.as_str())
                .arg("model", image.model().as_path())
                .arg("usescratch", true),
        )?;
        Ok(())
    }

    /// Solve the sweep of solution intervals for one cycle, plot each
    /// table per antenna triplet, and collect everything into a fresh
    /// per-cycle folder.
    fn explore_solints(
        &self,
        cycle_idx: usize,
        runner: &mut dyn CasaRunner,
    ) -> Result<(), StepError> {
        let cycle = &CYCLES[cycle_idx];
        for solint in &self.solint_sweep {
            info!("Solving with solint {solint}");
            let caltable = self.sweep_caltable(cycle, solint);
            remove_if_present(Path::new(&caltable))?;
            let mut args = self.gaincal_args();
            args.set("caltable", caltable.as_str());
            if cycle_idx > 0 {
                let prior = self.caltables_through(cycle_idx);
                args.set("spwmap", self.spwmap_for(prior.len()));
                args.set(
                    "gaintable",
                    prior
                        .iter()
                        .map(|t| t.display().to_string())
                        .collect::<Vec<_>>(),
                );
            }
            args.set("calmode", cycle.calmode);
            args.set("solint", solint.as_str());
            args.set("gaintype", cycle.gaintype);
            runner.run(&CasaCall::with_args("gaincal", args))?;

            for triplet in 0..ANTENNA_TRIPLETS {
                let first = triplet * 8;
                let last = first + 7;
                runner.run(
                    &CasaCall::new("plotms")
                        .arg("vis", caltable.as_str())
                        .arg("xaxis", "time")
                        .arg("yaxis", "phase")
                        .arg("iteraxis", "antenna")
                        .arg("gridrows", 4_i64)
                        .arg("gridcols", 2_i64)
                        .arg("coloraxis", "spw")
                        .arg("xaxisfont", 7_i64)
                        .arg("yaxisfont", 7_i64)
                        .arg("highres", true)
                        .arg("antenna", format!("{first}~{last}"))
                        .arg("showgui", false)
                        .arg("plotfile", format!("{caltable}_ant{first}-{last}.png")),
                )?;
            }
        }

        // Collect the sweep's tables and plots into a fresh folder.
        let folder = self.checks_dir(cycle);
        remove_if_present(&folder)?;
        fs::create_dir_all(&folder).map_err(ArtifactError::from)?;
        let pattern = format!(
            "{}.{}.*",
            glob::Pattern::escape(&self.vis),
            self.sweep_tag(cycle)
        );
        for entry in glob::glob(&pattern).map_err(|e| ArtifactError::Glob {
            pattern: pattern.clone(),
            message: e.to_string(),
        })? {
            let path = entry.map_err(|e| ArtifactError::Glob {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            let target = folder.join(path.file_name().unwrap_or_default());
            fs::rename(&path, &target).map_err(ArtifactError::from)?;
        }
        info!("Check the output of this step in {}", folder.display());
        Ok(())
    }

    /// Plot the SNR distribution of each swept gain table. Depends on
    /// the sweep step having run in this or an earlier invocation.
    fn solint_snr_distributions(
        &self,
        cycle_idx: usize,
        runner: &mut dyn CasaRunner,
    ) -> Result<(), StepError> {
        let cycle = &CYCLES[cycle_idx];
        let folder = self.checks_dir(cycle);
        for solint in &self.solint_sweep {
            let solved = self.sweep_caltable(cycle, solint);
            let file_name = Path::new(&solved).file_name().unwrap_or_default();
            let caltable = folder.join(file_name);
            require_input(&caltable)?;
            let plotfile =
                folder.join(format!("{}_SNR_solint_{solint}.png", self.sweep_tag(cycle)));
            remove_if_present(&plotfile)?;
            runner.run(
                &CasaCall::new("plotms")
                    .arg("vis", caltable.as_path())
                    .arg("xaxis", "time")
                    .arg("yaxis", "snr")
                    .arg("coloraxis", "spw")
                    .arg("highres", true)
                    .arg("showgui", false)
                    .arg("plotfile", plotfile.as_path()),
            )?;
        }
        info!("Check the output of this step in {}", folder.display());
        Ok(())
    }

    fn step_table(&self) -> Vec<Step<'_>> {
        vec![
            Step::new(
                0,
                "List the data set and plot antennas and visibility spectrum",
                move |runner| {
                    let listing = format!("{}_listobs.txt", self.vis);
                    remove_if_present(Path::new(&listing))?;
                    runner.run(
                        &CasaCall::new("listobs")
                            .arg("vis", self.vis.as_str())
                            .arg("listfile", listing)
                            .arg("verbose", true),
                    )?;

                    for (suffix, logpos) in [("", false), ("_log", true)] {
                        let figfile = format!("{}_plotants{suffix}.png", self.vis);
                        remove_if_present(Path::new(&figfile))?;
                        let mut call =
                            CasaCall::new("plotants").arg("vis", self.vis.as_str());
                        if logpos {
                            call = call.arg("logpos", true);
                        }
                        runner.run(&call.arg("figfile", figfile))?;
                    }

                    for spw in &self.apply_spw {
                        let plotfile = format!("{}_spw{spw}_vis-spectrum.png", self.vis);
                        remove_if_present(Path::new(&plotfile))?;
                        runner.run(
                            &CasaCall::new("plotms")
                                .arg("vis", self.vis.as_str())
                                .arg("xaxis", "frequency")
                                .arg("yaxis", "amp")
                                .arg("selectdata", true)
                                .arg("spw", spw.to_string())
                                .arg("avgtime", "1e8")
                                .arg("avgscan", true)
                                .arg("avgbaseline", true)
                                .arg("coloraxis", "baseline")
                                .arg("highres", true)
                                .arg("showgui", false)
                                .arg("plotfile", plotfile),
                        )?;
                    }
                    Ok(())
                },
            ),
            Step::new(1, "Make dirty image of continuum", move |runner| {
                let image = self.dirty_image();
                if image.exists() {
                    info!("{} already exists; skipping", image.image().display());
                    return Ok(());
                }
                runner.run(&self.tclean_call(&image, 0))?;
                Ok(())
            }),
            Step::new(2, "Make an initial, conservative cleaning", move |runner| {
                let image = self.initial_clean_image();
                if image.exists() {
                    info!("{} already exists; skipping", image.image().display());
                    return Ok(());
                }
                runner.run(&self.tclean_call(&image, self.niter_initial))?;
                self.image_stats(&image, runner)?;
                Ok(())
            }),
            Step::new(3, "Check and save model", move |runner| {
                let image = self.initial_clean_image();
                require_input(&image.model())?;
                let model = image.model().display().to_string();

                let model_plot = |plotfile: String| {
                    CasaCall::new("plotms")
                        .arg("vis", self.vis.as_str())
                        .arg("xaxis", "UVwave")
                        .arg("yaxis", "amp")
                        .arg("ydatacolumn", "model")
                        .arg("showgui", false)
                        .arg("plotfile", plotfile)
                };

                // Check the model before ft, force it to save, then
                // check again after.
                remove_if_present(Path::new(&format!("{model}.png")))?;
                runner.run(&model_plot(format!("{model}.png")))?;
                runner.run(
                    &CasaCall::new("ft")
                        .arg("vis", self.vis.as_str())
                        .arg("model", model.as_str())
                        .arg("usescratch", true),
                )?;
                remove_if_present(Path::new(&format!("{model}_ft.png")))?;
                runner.run(&model_plot(format!("{model}_ft.png")))?;
                Ok(())
            }),
            Step::new(
                4,
                "Calculate gain solution table - phase-only, solution interval = scan length",
                move |runner| {
                    let caltable = self.caltable(&CYCLES[0]);
                    remove_if_present(&caltable)?;
                    runner.run(&self.gaincal_call(0))?;
                    runner.run(&self.caltable_plot(&caltable.display().to_string())?)?;
                    Ok(())
                },
            ),
            Step::new(5, "Explore different solution intervals", move |runner| {
                self.explore_solints(0, runner)
            })
            .advisory(),
            Step::new(
                6,
                "Calculate SNR of the different solution intervals",
                move |runner| self.solint_snr_distributions(0, runner),
            )
            .advisory(),
            Step::new(7, "Apply calibration table", move |runner| {
                for table in self.caltables_through(1) {
                    require_input(&table)?;
                }
                runner.run(&self.applycal_call(1, "calonly"))?;
                Ok(())
            }),
            Step::new(
                8,
                "Make second, conservative cleaning and save model",
                move |runner| {
                    self.clean_and_save_model(
                        &self.cycle_clean_image(&CYCLES[0]),
                        self.niter_initial,
                        None,
                        runner,
                    )
                },
            ),
            Step::new(9, "Explore different solution intervals", move |runner| {
                self.explore_solints(1, runner)
            })
            .advisory(),
            Step::new(
                10,
                "Calculate SNR of the different solution intervals",
                move |runner| self.solint_snr_distributions(1, runner),
            )
            .advisory(),
            Step::new(
                11,
                "Calculate gain solution table - phase-only, solution interval = 60s, applying round 1 on the fly",
                move |runner| {
                    for table in self.caltables_through(1) {
                        require_input(&table)?;
                    }
                    let caltable = self.caltable(&CYCLES[1]);
                    remove_if_present(&caltable)?;
                    runner.run(&self.gaincal_call(1))?;
                    runner.run(&self.caltable_plot(&caltable.display().to_string())?)?;
                    Ok(())
                },
            ),
            Step::new(12, "Apply calibration tables", move |runner| {
                for table in self.caltables_through(2) {
                    require_input(&table)?;
                }
                runner.run(&self.applycal_call(2, "calonly"))?;
                Ok(())
            }),
            Step::new(13, "Make image of continuum and save model", move |runner| {
                self.clean_and_save_model(
                    &self.cycle_clean_image(&CYCLES[1]),
                    self.niter_initial,
                    None,
                    runner,
                )
            }),
            Step::new(
                14,
                "Calculate gain solution table - amplitude and phase, long solution interval",
                move |runner| {
                    for table in self.caltables_through(2) {
                        require_input(&table)?;
                    }
                    let caltable = self.caltable(&CYCLES[2]);
                    remove_if_present(&caltable)?;
                    runner.run(&self.gaincal_call(2))?;
                    runner.run(&self.caltable_plot(&caltable.display().to_string())?)?;
                    Ok(())
                },
            ),
            Step::new(15, "Apply calibration tables", move |runner| {
                for table in self.caltables_through(3) {
                    require_input(&table)?;
                }
                runner.run(&self.applycal_call(3, "calonly"))?;
                Ok(())
            }),
            Step::new(16, "Make image of continuum and save model", move |runner| {
                self.clean_and_save_model(
                    &self.cycle_clean_image(&CYCLES[2]),
                    self.niter_final,
                    None,
                    runner,
                )
            }),
            Step::new(
                17,
                "Calculate gain solution table - amplitude and phase, short solution interval",
                move |runner| {
                    for table in self.caltables_through(3) {
                        require_input(&table)?;
                    }
                    let caltable = self.caltable(&CYCLES[3]);
                    remove_if_present(&caltable)?;
                    runner.run(&self.gaincal_call(3))?;
                    runner.run(&self.caltable_plot(&caltable.display().to_string())?)?;
                    Ok(())
                },
            ),
            Step::new(18, "Apply calibration tables", move |runner| {
                for table in self.caltables_through(4) {
                    require_input(&table)?;
                }
                runner.run(&self.applycal_call(4, "calflag"))?;
                Ok(())
            }),
            Step::new(
                19,
                "Make final image of continuum and save model",
                move |runner| {
                    let mut extra = TaskArgs::new();
                    extra.set("deconvolver", "multiscale");
                    extra.set("scales", self.scales.clone());
                    self.clean_and_save_model(
                        &self.cycle_clean_image(&CYCLES[3]),
                        self.niter_final,
                        Some(extra),
                        runner,
                    )
                },
            ),
        ]
    }

    pub(crate) fn run(
        &self,
        runner: &mut dyn CasaRunner,
        dry_run: bool,
    ) -> Result<(), CasapipeError> {
        run_pipeline(self.step_table(), &self.selection, dry_run, runner)
    }
}
