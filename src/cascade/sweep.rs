//! Cascade sweep driver
//!
//! Runs the simulator over thresholds × iterations × subgroups. Every run
//! draws its own permutation, writes its own CSV immediately, and holds
//! nothing else in memory. Aggregation reloads the whole directory
//! afterwards.

use super::simulator::{simulate_extinctions, CascadeRun};
use crate::graph::{FoodWeb, Subgroup};
use crate::utils::records::{f64_column, load_records, string_column, write_csv, BatchReport};
use crate::utils::seeding::{unit_rng, CASCADE_STREAM};
use crate::utils::stats::RunningStats;
use anyhow::{Context, Result};
use petgraph::graph::NodeIndex;
use polars::prelude::*;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Residency label for undivided groups after reload
pub const UNDIVIDED_LABEL: &str = "Normal";

/// One unit of work in the grid
#[derive(Debug, Clone, Copy)]
struct RunSpec {
    threshold_idx: usize,
    threshold: f64,
    iteration: usize,
    subgroup_idx: usize,
}

/// File name for a run: `<subgroup>_t<threshold>_i<iteration>.csv`
pub fn run_file_name(subgroup: Subgroup, threshold: f64, iteration: usize) -> String {
    format!("{}_t{:.2}_i{:04}.csv", subgroup.file_stem(), threshold, iteration)
}

pub struct CascadeSweep<'a> {
    web: &'a FoodWeb,
    out_dir: PathBuf,
    pools: Vec<(Subgroup, Vec<NodeIndex>)>,
}

impl<'a> CascadeSweep<'a> {
    /// Resolve each subgroup's node indices once; empty subgroups are dropped
    pub fn new(web: &'a FoodWeb, out_dir: impl Into<PathBuf>) -> Self {
        let pools = Subgroup::ALL
            .iter()
            .filter_map(|&subgroup| {
                let members = web.subgroup_indices(subgroup);
                if members.is_empty() {
                    tracing::warn!("Subgroup {:?} has no members; skipping", subgroup);
                    None
                } else {
                    tracing::debug!("Subgroup {:?}: {} species", subgroup, members.len());
                    Some((subgroup, members))
                }
            })
            .collect();

        Self { web, out_dir: out_dir.into(), pools }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Run the whole grid in parallel
    ///
    /// A failing run is logged and counted; it does not stop the sweep.
    /// With `resume`, runs whose file already exists are skipped.
    pub fn run(&self, thresholds: &[f64], iterations: usize, seed: u64, resume: bool) -> Result<BatchReport> {
        std::fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("Failed to create {:?}", self.out_dir))?;

        let specs: Vec<RunSpec> = thresholds
            .iter()
            .enumerate()
            .flat_map(|(threshold_idx, &threshold)| {
                (0..iterations).flat_map(move |iteration| {
                    (0..self.pools.len()).map(move |subgroup_idx| RunSpec {
                        threshold_idx,
                        threshold,
                        iteration,
                        subgroup_idx,
                    })
                })
            })
            .collect();

        tracing::info!(
            "Cascade sweep: {} thresholds × {} iterations × {} subgroups = {} runs",
            thresholds.len(),
            iterations,
            self.pools.len(),
            specs.len()
        );

        let outcomes: Vec<UnitOutcome> = specs
            .par_iter()
            .map(|spec| self.run_one(spec, seed, resume))
            .collect();

        let mut report = BatchReport::default();
        for outcome in outcomes {
            match outcome {
                UnitOutcome::Completed => report.completed += 1,
                UnitOutcome::Skipped => report.skipped += 1,
                UnitOutcome::Failed => report.failed += 1,
            }
        }

        tracing::info!(
            "Cascade sweep done: {} completed, {} skipped, {} failed",
            report.completed,
            report.skipped,
            report.failed
        );

        Ok(report)
    }

    fn run_one(&self, spec: &RunSpec, seed: u64, resume: bool) -> UnitOutcome {
        let (subgroup, members) = &self.pools[spec.subgroup_idx];
        let path = self.out_dir.join(run_file_name(*subgroup, spec.threshold, spec.iteration));

        if resume && path.exists() {
            return UnitOutcome::Skipped;
        }

        let mut rng = unit_rng(
            seed,
            &[
                CASCADE_STREAM,
                spec.threshold_idx as u64,
                spec.iteration as u64,
                spec.subgroup_idx as u64,
            ],
        );
        let mut order = members.clone();
        order.shuffle(&mut rng);

        let result = simulate_extinctions(self.web, &order, spec.threshold)
            .map_err(anyhow::Error::from)
            .and_then(|steps| {
                let run = CascadeRun {
                    subgroup: *subgroup,
                    threshold: spec.threshold,
                    iteration: spec.iteration,
                    steps,
                };
                let mut df = run.to_frame()?;
                write_csv(&mut df, &path)
            });

        match result {
            Ok(()) => UnitOutcome::Completed,
            Err(e) => {
                tracing::warn!("Cascade run {:?} failed: {:#}", path, e);
                UnitOutcome::Failed
            }
        }
    }
}

enum UnitOutcome {
    Completed,
    Skipped,
    Failed,
}

/// Mean ± SE of accumulated secondary extinctions for one series point
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeSummaryRow {
    pub class: String,
    pub residency: String,
    pub threshold: f64,
    pub step: i64,
    pub mean_secondary: f64,
    /// `None` when fewer than two iterations reached this step
    pub se_secondary: Option<f64>,
    pub n: usize,
}

/// Reload the runs in `dir` and aggregate per (class, residency, threshold, step)
///
/// Only rows from the given grid (`thresholds` × `0..iterations`) count;
/// records left by an earlier, larger sweep in the same directory are
/// ignored. Records without a `residency` column are labelled `"Normal"`.
pub fn aggregate_runs(dir: &Path, thresholds: &[f64], iterations: usize) -> Result<Vec<CascadeSummaryRow>> {
    let Some(df) = load_records(dir)? else {
        tracing::warn!("No cascade records found in {:?}", dir);
        return Ok(Vec::new());
    };
    let context = format!("cascade records {:?}", dir);

    let classes = string_column(&df, "class", &context)?;
    let iteration = f64_column(&df, "iteration", &context)?;
    let wanted: Vec<i64> = thresholds.iter().map(|t| threshold_key(*t)).collect();
    let thresholds = f64_column(&df, "threshold", &context)?;
    let steps = f64_column(&df, "step", &context)?;
    let secondary = f64_column(&df, "secondary", &context)?;
    let residency = if df.column("residency").is_ok() {
        string_column(&df, "residency", &context)?
    } else {
        vec![None; df.height()]
    };

    // Threshold keyed in thousandths so it can order and hash
    let mut groups: BTreeMap<(String, String, i64, i64), RunningStats> = BTreeMap::new();
    let mut stale = 0usize;
    for i in 0..df.height() {
        let (Some(class), Some(threshold), Some(step), Some(value), Some(iteration)) =
            (&classes[i], thresholds[i], steps[i], secondary[i], iteration[i])
        else {
            continue;
        };
        let threshold_milli = threshold_key(threshold);
        if !wanted.contains(&threshold_milli) || iteration < 0.0 || iteration as usize >= iterations {
            stale += 1;
            continue;
        }
        let residency = residency[i].clone().unwrap_or_else(|| UNDIVIDED_LABEL.to_string());
        let key = (class.clone(), residency, threshold_milli, step as i64);
        groups.entry(key).or_default().push(value);
    }
    if stale > 0 {
        tracing::info!("Ignored {} cascade rows outside the configured grid", stale);
    }

    Ok(groups
        .into_iter()
        .filter_map(|((class, residency, threshold_milli, step), stats)| {
            Some(CascadeSummaryRow {
                class,
                residency,
                threshold: threshold_milli as f64 / 1000.0,
                step,
                mean_secondary: stats.mean()?,
                se_secondary: stats.standard_error(),
                n: stats.count(),
            })
        })
        .collect())
}

fn threshold_key(threshold: f64) -> i64 {
    (threshold * 1000.0).round() as i64
}

pub fn summary_frame(rows: &[CascadeSummaryRow]) -> Result<DataFrame> {
    let df = df![
        "class" => rows.iter().map(|r| r.class.as_str()).collect::<Vec<_>>(),
        "residency" => rows.iter().map(|r| r.residency.as_str()).collect::<Vec<_>>(),
        "threshold" => rows.iter().map(|r| r.threshold).collect::<Vec<_>>(),
        "step" => rows.iter().map(|r| r.step).collect::<Vec<_>>(),
        "mean_secondary" => rows.iter().map(|r| r.mean_secondary).collect::<Vec<_>>(),
        "se_secondary" => rows.iter().map(|r| r.se_secondary).collect::<Vec<_>>(),
        "n" => rows.iter().map(|r| r.n as i64).collect::<Vec<_>>(),
    ]?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Residency, Species, Taxon};
    use crate::utils::records::list_records;
    use approx::assert_relative_eq;

    fn small_web() -> FoodWeb {
        let mut web = FoodWeb::new();
        web.add_species(Species::new("Plants", Taxon::Other)).unwrap();
        web.add_species(Species::new("Vole", Taxon::Mammal)).unwrap();
        web.add_species(Species::new("Mouse", Taxon::Mammal)).unwrap();
        web.add_species(Species::new("Robin", Taxon::Bird).with_residency(Residency::Resident)).unwrap();
        web.add_species(Species::new("Owl", Taxon::Bird)).unwrap();
        web.add_interaction("Plants", "Vole", 1.0).unwrap();
        web.add_interaction("Plants", "Mouse", 1.0).unwrap();
        web.add_interaction("Plants", "Robin", 1.0).unwrap();
        web.add_interaction("Vole", "Owl", 1.0).unwrap();
        web.add_interaction("Mouse", "Owl", 1.0).unwrap();
        web
    }

    #[test]
    fn test_sweep_writes_one_file_per_run() {
        let web = small_web();
        let dir = tempfile::tempdir().unwrap();
        let sweep = CascadeSweep::new(&web, dir.path());

        // No reptiles: 4 populated subgroups
        let report = sweep.run(&[0.5, 0.9], 3, 11, false).unwrap();
        assert_eq!(report, BatchReport { completed: 24, skipped: 0, failed: 0 });
        assert_eq!(list_records(dir.path()).unwrap().len(), 24);

        let report = sweep.run(&[0.5, 0.9], 3, 11, true).unwrap();
        assert_eq!(report.skipped, 24);
        assert_eq!(report.completed, 0);
    }

    #[test]
    fn test_invalid_threshold_fails_units_without_aborting() {
        let web = small_web();
        let dir = tempfile::tempdir().unwrap();
        let sweep = CascadeSweep::new(&web, dir.path());

        let report = sweep.run(&[1.5, 0.5], 1, 3, false).unwrap();
        assert_eq!(report.failed, 4);
        assert_eq!(report.completed, 4);
    }

    #[test]
    fn test_aggregate_labels_undivided_groups() {
        let web = small_web();
        let dir = tempfile::tempdir().unwrap();
        CascadeSweep::new(&web, dir.path()).run(&[0.5], 4, 5, false).unwrap();

        let rows = aggregate_runs(dir.path(), &[0.5], 4).unwrap();
        let labels: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.class.as_str(), r.residency.as_str()))
            .collect();
        assert!(labels.contains(&("Bird", "Normal")));
        assert!(labels.contains(&("Bird", "Resident")));
        assert!(labels.contains(&("Bird", "NonResident")));
        assert!(labels.contains(&("Mammal", "Normal")));

        // Removing both mammals always starves the owl by step 2
        let mammal_step2 = rows
            .iter()
            .find(|r| r.class == "Mammal" && r.step == 2)
            .unwrap();
        assert_eq!(mammal_step2.n, 4);
        assert_relative_eq!(mammal_step2.mean_secondary, 1.0);
        assert_relative_eq!(mammal_step2.se_secondary.unwrap(), 0.0);

        let df = summary_frame(&rows).unwrap();
        assert_eq!(df.height(), rows.len());
    }

    #[test]
    fn test_smaller_rerun_ignores_earlier_records() {
        let web = small_web();
        let dir = tempfile::tempdir().unwrap();
        let sweep = CascadeSweep::new(&web, dir.path());
        sweep.run(&[0.6, 0.7], 10, 5, false).unwrap();
        sweep.run(&[0.6], 3, 5, false).unwrap();

        let rows = aggregate_runs(dir.path(), &[0.6], 3).unwrap();
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|r| (r.threshold - 0.6).abs() < 1e-9));
        assert!(rows.iter().all(|r| r.n <= 3));
    }

    #[test]
    fn test_run_file_name() {
        assert_eq!(run_file_name(Subgroup::ResidentBirds, 0.6, 7), "resident_birds_t0.60_i0007.csv");
    }
}
