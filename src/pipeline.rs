//! Analysis stages wired end to end
//!
//! Output layout under `output_dir`:
//! - `cascade/`, `cascade_summary.csv`
//! - `homophily.json`
//! - `shared_prey/`, `chain/`, `significance_shared_prey.csv`, `significance_chain.csv`

use crate::cascade::{aggregate_runs, summary_frame, CascadeSweep};
use crate::config::RunConfig;
use crate::data::FoodWebData;
use crate::homophily::{homophily_index, HomophilyReport};
use crate::motifs::{
    aggregate_chains, count_shared_prey, enumerate_chains, run_chain_trials, run_shared_prey_trials, SharedPreyCategory,
};
use crate::significance::{records_frame, score_chains, score_shared_prey, ZScoreRecord};
use crate::utils::records::{write_csv, BatchReport};
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;

pub const CASCADE_DIR: &str = "cascade";
pub const CASCADE_SUMMARY_FILE: &str = "cascade_summary.csv";
pub const HOMOPHILY_FILE: &str = "homophily.json";
pub const SHARED_PREY_DIR: &str = "shared_prey";
pub const CHAIN_DIR: &str = "chain";
pub const SHARED_PREY_SIGNIFICANCE_FILE: &str = "significance_shared_prey.csv";
pub const CHAIN_SIGNIFICANCE_FILE: &str = "significance_chain.csv";

#[derive(Debug, Clone)]
pub struct CascadeStageReport {
    pub runs: BatchReport,
    pub summary_rows: usize,
}

#[derive(Debug, Clone)]
pub struct MotifStageReport {
    pub shared_prey_trials: BatchReport,
    pub chain_trials: BatchReport,
    pub shared_prey: Vec<ZScoreRecord>,
    pub chain: Vec<ZScoreRecord>,
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub seed: u64,
    pub cascade: CascadeStageReport,
    pub homophily: HomophilyReport,
    pub motifs: MotifStageReport,
}

/// Sweep the cascade grid on the weighted web and write the summary table
pub fn run_cascade_stage(data: &FoodWebData, config: &RunConfig, seed: u64) -> Result<CascadeStageReport> {
    let start = Instant::now();
    let sweep = CascadeSweep::new(&data.food_web, config.output_dir.join(CASCADE_DIR));
    let runs = sweep.run(&config.thresholds, config.cascade_iterations, seed, config.resume)?;

    let rows = aggregate_runs(sweep.out_dir(), &config.thresholds, config.cascade_iterations)?;
    let mut df = summary_frame(&rows)?;
    write_csv(&mut df, &config.output_dir.join(CASCADE_SUMMARY_FILE))?;

    tracing::info!(
        "Cascade stage: {} runs, {} summary rows in {:.1}s",
        runs.total(),
        rows.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(CascadeStageReport { runs, summary_rows: rows.len() })
}

/// Homophily of the trophic web, written as JSON
pub fn run_homophily_stage(data: &FoodWebData, output_dir: &Path) -> Result<HomophilyReport> {
    let report = homophily_index(&data.trophic_web);
    match report.index {
        Some(r) => tracing::info!("Homophily index: {:.4}", r),
        None => tracing::warn!("Homophily index undefined ({} edges)", report.edges),
    }

    std::fs::create_dir_all(output_dir).with_context(|| format!("Failed to create {:?}", output_dir))?;
    let path = output_dir.join(HOMOPHILY_FILE);
    std::fs::write(&path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("Failed to write {:?}", path))?;

    Ok(report)
}

/// Observed motif counts, null-model trials, and z-scores for both motifs
///
/// Shared-prey motifs are counted on the weighted web and chains on the
/// trophic web.
pub fn run_motif_stage(data: &FoodWebData, config: &RunConfig, seed: u64) -> Result<MotifStageReport> {
    let start = Instant::now();
    let out = &config.output_dir;

    let observed_shared = count_shared_prey(&data.food_web);
    tracing::info!("Shared prey (observed): {} raw matches", observed_shared.total_raw());
    for category in SharedPreyCategory::ALL {
        if let Some(weight) = observed_shared.mean_weight(category) {
            tracing::info!("  {}: mean edge weight {:.3}", category.column_name(), weight);
        }
    }
    let shared_dir = out.join(SHARED_PREY_DIR);
    let shared_prey_trials =
        run_shared_prey_trials(&data.food_web, &shared_dir, config.shared_prey_trials, seed, config.resume)?;
    let shared_prey = score_shared_prey(&observed_shared, &shared_dir, 0..config.shared_prey_trials)?;
    let mut df = records_frame(&shared_prey)?;
    write_csv(&mut df, &out.join(SHARED_PREY_SIGNIFICANCE_FILE))?;

    let observed_chains = aggregate_chains(&enumerate_chains(&data.trophic_web));
    tracing::info!("Chains (observed): {} role/taxon groups", observed_chains.len());
    let chain_dir = out.join(CHAIN_DIR);
    let chain_trials = run_chain_trials(
        &data.trophic_web,
        &chain_dir,
        config.chain_trial_start..config.chain_trials,
        seed,
        config.resume,
    )?;
    let chain = score_chains(&observed_chains, &chain_dir, 0..config.chain_trials)?;
    let mut df = records_frame(&chain)?;
    write_csv(&mut df, &out.join(CHAIN_SIGNIFICANCE_FILE))?;

    tracing::info!(
        "Motif stage: {} shared-prey and {} chain categories scored in {:.1}s",
        shared_prey.len(),
        chain.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(MotifStageReport { shared_prey_trials, chain_trials, shared_prey, chain })
}

/// Load inputs and run every stage
pub fn run_all(config: &RunConfig) -> Result<AnalysisReport> {
    config.validate()?;
    let seed = config.resolve_seed()?;
    tracing::info!("Base seed: {}", seed);

    let data = FoodWebData::load(config)?;
    let cascade = run_cascade_stage(&data, config, seed)?;
    let homophily = run_homophily_stage(&data, &config.output_dir)?;
    let motifs = run_motif_stage(&data, config, seed)?;

    Ok(AnalysisReport { seed, cascade, homophily, motifs })
}
