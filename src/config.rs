//! Run configuration
//!
//! Defaults reproduce the reference analysis (4 thresholds × 100 iterations,
//! 500 shared-prey trials, 200 chain trials). Values can come from a JSON
//! file named by `FOOD_WEB_CONFIG`, then individual environment variables
//! override them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Base seed of the run, kept in `output_dir` so resumed runs draw the same streams
pub const SEED_FILE: &str = "run_seed.txt";

/// Input file names, relative to `data_dir`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputFiles {
    pub adjacency_matrix: String,
    pub species_order: String,
    pub vertex_attributes: String,
    pub resident_codes: String,
    pub trophic_nodes: String,
    pub trophic_edges: String,
}

impl Default for InputFiles {
    fn default() -> Self {
        Self {
            adjacency_matrix: "adjacency_matrix.csv".to_string(),
            species_order: "species_order.csv".to_string(),
            vertex_attributes: "vertex_attributes.csv".to_string(),
            resident_codes: "resident_codes.csv".to_string(),
            trophic_nodes: "trophic_nodes.csv".to_string(),
            trophic_edges: "trophic_edges.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub inputs: InputFiles,

    /// Interaction strength thresholds swept by the cascade driver
    pub thresholds: Vec<f64>,
    pub cascade_iterations: usize,

    pub shared_prey_trials: usize,
    pub chain_trials: usize,
    /// First chain trial index to run (earlier indices are assumed done)
    pub chain_trial_start: usize,

    /// Base seed; `None` reuses the seed saved in `output_dir` when resuming,
    /// otherwise draws one at startup
    pub seed: Option<u64>,
    /// Skip units whose output file already exists
    pub resume: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            inputs: InputFiles::default(),
            thresholds: vec![0.6, 0.7, 0.8, 0.9],
            cascade_iterations: 100,
            shared_prey_trials: 500,
            chain_trials: 200,
            chain_trial_start: 0,
            seed: None,
            resume: false,
        }
    }
}

impl RunConfig {
    /// Load from `FOOD_WEB_CONFIG` (if set) and apply environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("FOOD_WEB_CONFIG") {
            Ok(path) => Self::load(Path::new(&path))?,
            Err(_) => Self::default(),
        };

        if let Ok(dir) = std::env::var("DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(seed) = env_parse::<u64>("SEED")? {
            config.seed = Some(seed);
        }
        if let Some(n) = env_parse::<usize>("CASCADE_ITERATIONS")? {
            config.cascade_iterations = n;
        }
        if let Some(n) = env_parse::<usize>("SHARED_PREY_TRIALS")? {
            config.shared_prey_trials = n;
        }
        if let Some(n) = env_parse::<usize>("CHAIN_TRIALS")? {
            config.chain_trials = n;
        }
        if let Some(n) = env_parse::<usize>("CHAIN_TRIAL_START")? {
            config.chain_trial_start = n;
        }
        if let Some(resume) = env_parse::<bool>("RESUME")? {
            config.resume = resume;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config JSON: {:?}", path))
    }

    pub fn validate(&self) -> Result<()> {
        if self.thresholds.is_empty() {
            anyhow::bail!("At least one interaction strength threshold is required");
        }
        for &t in &self.thresholds {
            if !(t > 0.0 && t <= 1.0) {
                anyhow::bail!("Threshold {} outside (0, 1]", t);
            }
        }
        if self.cascade_iterations == 0 {
            anyhow::bail!("cascade_iterations must be positive");
        }
        if self.chain_trial_start > self.chain_trials {
            anyhow::bail!(
                "chain_trial_start ({}) exceeds chain_trials ({})",
                self.chain_trial_start,
                self.chain_trials
            );
        }
        Ok(())
    }

    pub fn input_path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }

    /// Base seed for this run, recorded in `output_dir/run_seed.txt`
    ///
    /// An explicit `seed` wins. Otherwise a resumed run (`resume`, or a
    /// nonzero `chain_trial_start`) reuses the recorded seed, and a fresh run
    /// draws a new one.
    pub fn resolve_seed(&self) -> Result<u64> {
        let path = self.output_dir.join(SEED_FILE);
        let resuming = self.resume || self.chain_trial_start > 0;
        let recorded = if resuming && path.exists() {
            let raw = fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
            let seed = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("Invalid seed in {:?}: '{}'", path, raw.trim()))?;
            Some(seed)
        } else {
            None
        };

        let seed = match (self.seed, recorded) {
            (Some(seed), Some(previous)) if seed != previous => {
                tracing::warn!(
                    "SEED={} differs from the seed {} recorded in {:?}; existing records were drawn with {}",
                    seed,
                    previous,
                    path,
                    previous
                );
                seed
            }
            (Some(seed), _) => seed,
            (None, Some(previous)) => {
                tracing::info!("Reusing seed {} from {:?}", previous, path);
                previous
            }
            (None, _) => {
                if resuming {
                    tracing::warn!("Resuming without a recorded seed; drawing a new one");
                }
                rand::random()
            }
        };

        fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("Failed to create {:?}", self.output_dir))?;
        fs::write(&path, seed.to_string()).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(seed)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Invalid {}='{}': {}", key, raw, e)),
        Err(_) => Ok(None),
    }
}
