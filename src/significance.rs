//! Motif significance against the null-model distribution
//!
//! Null counts are reloaded from the per-trial CSVs one file at a time, so
//! scoring never holds more than one trial's table in memory.

use crate::motifs::{ChainRoleCount, SharedPreyCategory, SharedPreyTally};
use crate::utils::records::{f64_column, list_records, read_csv, string_column};
use crate::utils::stats::{mean, sample_sd, tail_p_value};
use anyhow::Result;
use polars::prelude::*;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::ops::Range;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct ZScoreRecord {
    pub category: String,
    pub observed: f64,
    pub null_mean: f64,
    pub null_sd: f64,
    pub z_score: f64,
    pub p_value: f64,
    pub trials: usize,
}

/// Score one category; `None` when the null sample cannot support a z-score
pub fn score_category(category: &str, observed: f64, null: &[f64]) -> Option<ZScoreRecord> {
    let null_mean = mean(null)?;
    let null_sd = sample_sd(null)?;
    if !null_sd.is_finite() || null_sd == 0.0 {
        return None;
    }

    let z_score = (observed - null_mean) / null_sd;
    Some(ZScoreRecord {
        category: category.to_string(),
        observed,
        null_mean,
        null_sd,
        z_score,
        p_value: tail_p_value(z_score),
        trials: null.len(),
    })
}

/// Index of a `trial_<i>.csv` record
fn trial_index(path: &Path) -> Option<usize> {
    path.file_stem()?.to_str()?.strip_prefix("trial_")?.parse().ok()
}

/// Trial records in `dir` whose index lies in `trials`
fn trial_records(dir: &Path, trials: &Range<usize>) -> Result<Vec<PathBuf>> {
    let all = list_records(dir)?;
    let total = all.len();
    let kept: Vec<PathBuf> = all
        .into_iter()
        .filter(|p| trial_index(p).map_or(false, |i| trials.contains(&i)))
        .collect();
    if kept.len() < total {
        tracing::info!("Ignored {} records in {:?} outside trials {:?}", total - kept.len(), dir, trials);
    }
    Ok(kept)
}

/// Shared-prey categories: corrected observed counts vs. trial columns
pub fn score_shared_prey(
    observed: &SharedPreyTally,
    trial_dir: &Path,
    trials: Range<usize>,
) -> Result<Vec<ZScoreRecord>> {
    let mut null: FxHashMap<SharedPreyCategory, Vec<f64>> = FxHashMap::default();

    for path in trial_records(trial_dir, &trials)? {
        let df = read_csv(&path)?;
        let context = path.display().to_string();
        for category in SharedPreyCategory::ALL {
            let values = f64_column(&df, category.column_name(), &context)?;
            null.entry(category)
                .or_default()
                .extend(values.into_iter().map(|v| v.unwrap_or(0.0)));
        }
    }

    let mut records = Vec::new();
    for category in SharedPreyCategory::ALL {
        let sample = null.get(&category).map(Vec::as_slice).unwrap_or(&[]);
        match score_category(category.column_name(), observed.corrected(category), sample) {
            Some(record) => records.push(record),
            None => tracing::debug!("Shared prey {}: null sample too small or constant", category.column_name()),
        }
    }

    Ok(records)
}

/// Chain categories keyed `apex_filter/role/taxon`
///
/// A key absent from a trial (or from the real graph) counts as zero.
pub fn score_chains(
    observed: &[ChainRoleCount],
    trial_dir: &Path,
    trial_range: Range<usize>,
) -> Result<Vec<ZScoreRecord>> {
    let mut trials: Vec<FxHashMap<String, f64>> = Vec::new();

    for path in trial_records(trial_dir, &trial_range)? {
        let df = read_csv(&path)?;
        let context = path.display().to_string();
        let filters = string_column(&df, "apex_filter", &context)?;
        let roles = string_column(&df, "trophic_role", &context)?;
        let taxa = string_column(&df, "taxon", &context)?;
        let totals = f64_column(&df, "total", &context)?;

        let mut counts = FxHashMap::default();
        for (((filter, role), taxon), total) in filters.into_iter().zip(roles).zip(taxa).zip(totals) {
            if let (Some(filter), Some(role), Some(taxon)) = (filter, role, taxon) {
                *counts.entry(format!("{}/{}/{}", filter, role, taxon)).or_insert(0.0) += total.unwrap_or(0.0);
            }
        }
        trials.push(counts);
    }

    let observed: FxHashMap<String, f64> = observed.iter().map(|c| (c.key(), c.total as f64)).collect();
    let keys: BTreeSet<&String> = observed.keys().chain(trials.iter().flat_map(|t| t.keys())).collect();

    let mut records = Vec::new();
    for key in keys {
        let sample: Vec<f64> = trials.iter().map(|t| t.get(key).copied().unwrap_or(0.0)).collect();
        let value = observed.get(key).copied().unwrap_or(0.0);
        if let Some(record) = score_category(key, value, &sample) {
            records.push(record);
        }
    }

    Ok(records)
}

pub fn records_frame(records: &[ZScoreRecord]) -> Result<DataFrame> {
    let df = df![
        "category" => records.iter().map(|r| r.category.as_str()).collect::<Vec<_>>(),
        "observed" => records.iter().map(|r| r.observed).collect::<Vec<_>>(),
        "null_mean" => records.iter().map(|r| r.null_mean).collect::<Vec<_>>(),
        "null_sd" => records.iter().map(|r| r.null_sd).collect::<Vec<_>>(),
        "z_score" => records.iter().map(|r| r.z_score).collect::<Vec<_>>(),
        "p_value" => records.iter().map(|r| r.p_value).collect::<Vec<_>>(),
        "trials" => records.iter().map(|r| r.trials as i64).collect::<Vec<_>>(),
    ]?;
    Ok(df)
}
