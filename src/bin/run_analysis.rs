//! Full analysis: cascade sweep, homophily, motif trials, significance
//!
//! Configuration comes from `FOOD_WEB_CONFIG` plus environment overrides
//! (`DATA_DIR`, `OUTPUT_DIR`, `SEED`, ...). See `RunConfig`.

use food_web_cascades::pipeline::{self, AnalysisReport};
use food_web_cascades::RunConfig;
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    food_web_cascades::init_tracing();

    println!("\n{}", "=".repeat(80));
    println!("FOOD WEB CASCADE AND MOTIF ANALYSIS");
    println!("{}", "=".repeat(80));

    let total_start = Instant::now();
    let config = RunConfig::from_env()?;
    println!("\nData:   {}", config.data_dir.display());
    println!("Output: {}", config.output_dir.display());

    let report = pipeline::run_all(&config)?;
    print_summary(&report);

    println!("\nTotal time: {:.1}s", total_start.elapsed().as_secs_f64());
    Ok(())
}

fn print_summary(report: &AnalysisReport) {
    println!("\n{}", "=".repeat(80));
    println!("SUMMARY (seed {})", report.seed);
    println!("{}", "=".repeat(80));

    let runs = &report.cascade.runs;
    println!(
        "\nCascade runs: {} completed, {} skipped, {} failed ({} summary rows)",
        runs.completed, runs.skipped, runs.failed, report.cascade.summary_rows
    );

    match report.homophily.index {
        Some(r) => println!("Homophily index: {:.4}", r),
        None => println!("Homophily index: undefined"),
    }

    println!("\n{}", "-".repeat(70));
    println!("{:<28} {:>10} {:>10} {:>9} {:>10}", "Shared prey", "observed", "null mean", "z", "p");
    println!("{}", "-".repeat(70));
    for r in &report.motifs.shared_prey {
        println!(
            "{:<28} {:>10.1} {:>10.2} {:>9.2} {:>10.4}",
            r.category, r.observed, r.null_mean, r.z_score, r.p_value
        );
    }

    println!("\n{}", "-".repeat(70));
    println!("{:<28} {:>10} {:>10} {:>9} {:>10}", "Chain role", "observed", "null mean", "z", "p");
    println!("{}", "-".repeat(70));
    for r in &report.motifs.chain {
        println!(
            "{:<28} {:>10.1} {:>10.2} {:>9.2} {:>10.4}",
            r.category, r.observed, r.null_mean, r.z_score, r.p_value
        );
    }
}
