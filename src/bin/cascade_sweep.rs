//! Cascade stage only: sweep thresholds × iterations × subgroups and
//! write `cascade_summary.csv`.

use food_web_cascades::pipeline::{run_cascade_stage, CASCADE_SUMMARY_FILE};
use food_web_cascades::{FoodWebData, RunConfig};
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    food_web_cascades::init_tracing();

    println!("\n{}", "=".repeat(80));
    println!("EXTINCTION CASCADE SWEEP");
    println!("{}", "=".repeat(80));

    let start = Instant::now();
    let config = RunConfig::from_env()?;
    let seed = config.resolve_seed()?;
    println!(
        "\nThresholds {:?}, {} iterations, seed {}",
        config.thresholds, config.cascade_iterations, seed
    );

    let data = FoodWebData::load(&config)?;
    let report = run_cascade_stage(&data, &config, seed)?;

    println!(
        "\n✓ {} runs completed, {} skipped, {} failed",
        report.runs.completed, report.runs.skipped, report.runs.failed
    );
    println!("✓ Saved: {}", config.output_dir.join(CASCADE_SUMMARY_FILE).display());
    println!("\nTotal time: {:.1}s", start.elapsed().as_secs_f64());

    if report.runs.failed > 0 {
        anyhow::bail!("{} cascade runs failed; rerun with RESUME=true", report.runs.failed);
    }
    Ok(())
}
