//! Motif stage only: observed counts, null-model trials, significance.
//!
//! With `RESUME=true` (or `CHAIN_TRIAL_START`), trials already on disk are
//! not recomputed.

use food_web_cascades::pipeline::{run_homophily_stage, run_motif_stage};
use food_web_cascades::{FoodWebData, RunConfig};
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    food_web_cascades::init_tracing();

    println!("\n{}", "=".repeat(80));
    println!("MOTIF NULL-MODEL TRIALS");
    println!("{}", "=".repeat(80));

    let start = Instant::now();
    let config = RunConfig::from_env()?;
    let seed = config.resolve_seed()?;
    println!(
        "\nShared prey: {} trials | chain: trials {}..{} | seed {}",
        config.shared_prey_trials, config.chain_trial_start, config.chain_trials, seed
    );

    let data = FoodWebData::load(&config)?;
    run_homophily_stage(&data, &config.output_dir)?;
    let report = run_motif_stage(&data, &config, seed)?;

    println!(
        "\n✓ Shared prey: {} trials written, {} categories scored",
        report.shared_prey_trials.completed,
        report.shared_prey.len()
    );
    println!(
        "✓ Chain: {} trials written, {} categories scored",
        report.chain_trials.completed,
        report.chain.len()
    );

    let significant: Vec<_> = report
        .shared_prey
        .iter()
        .chain(report.chain.iter())
        .filter(|r| r.p_value < 0.05)
        .collect();
    println!("\n{} categories with p < 0.05:", significant.len());
    for r in significant {
        println!("  {:<28} z = {:>7.2}  p = {:.4}", r.category, r.z_score, r.p_value);
    }

    println!("\nTotal time: {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}
