//! Extinction cascades: the simulator and the parameter sweep around it.

pub mod simulator;
pub mod sweep;

pub use simulator::{simulate_extinctions, CascadeRun, CascadeStep};
pub use sweep::{aggregate_runs, run_file_name, summary_frame, CascadeSummaryRow, CascadeSweep};
