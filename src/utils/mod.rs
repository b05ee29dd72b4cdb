//! Utility modules shared across the analysis stages:
//! - Records: CSV persistence and reload with column validation
//! - Stats: means, standard errors, normal tails
//! - Seeding: reproducible per-unit RNG streams

pub mod records;
pub mod seeding;
pub mod stats;

// Re-export commonly used items
pub use records::{load_records, read_csv, write_csv, BatchReport};
pub use seeding::{derive_seed, unit_rng};
pub use stats::{mean, normal_cdf, sample_sd, standard_error, tail_p_value, RunningStats};
