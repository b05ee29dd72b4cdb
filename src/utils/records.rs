//! CSV record helpers with column validation
//!
//! Every simulation unit (one cascade run, one motif trial) persists its
//! own CSV. These helpers write those files atomically, read input tables,
//! and reload a directory of records into one `DataFrame`.

use crate::error::FoodWebError;
use anyhow::{Context, Result};
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Outcome counts for a batch of independent units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.completed + self.skipped + self.failed
    }
}

/// Read a CSV with header, scanning every row for schema inference
///
/// A missing file is reported as `FoodWebError::MissingInput` so the
/// message names the resource.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(FoodWebError::MissingInput(path.to_path_buf()).into());
    }

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.into()))
        .with_context(|| format!("Failed to create CSV reader: {:?}", path))?
        .finish()
        .with_context(|| format!("Failed to load CSV: {:?}", path))
}

/// Write a DataFrame to CSV via a temporary file and rename
///
/// A crashed unit never leaves a truncated `.csv` behind, so resuming can
/// trust that any existing record is complete.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    let tmp_path = path.with_extension("csv.tmp");
    {
        let mut file = File::create(&tmp_path)
            .with_context(|| format!("Failed to create file: {:?}", tmp_path))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(df)
            .with_context(|| format!("Failed to write CSV: {:?}", tmp_path))?;
    }

    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to move {:?} into place", tmp_path))
}

/// Validate that all required columns are present
///
/// # Errors
/// `FoodWebError::MissingColumn` naming the first absent column.
pub fn require_columns(df: &DataFrame, columns: &[&str], context: &str) -> Result<()> {
    let actual: HashSet<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    for &expected in columns {
        if !actual.contains(expected) {
            return Err(FoodWebError::MissingColumn {
                context: context.to_string(),
                column: expected.to_string(),
            }
            .into());
        }
    }

    Ok(())
}

/// Column values as owned strings (nulls preserved)
pub fn string_column(df: &DataFrame, name: &str, context: &str) -> Result<Vec<Option<String>>> {
    require_columns(df, &[name], context)?;
    let column = df
        .column(name)?
        .cast(&DataType::String)
        .with_context(|| format!("{}: column '{}' is not convertible to text", context, name))?;

    Ok(column
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.trim().to_string()))
        .collect())
}

/// Column values as f64 (nulls preserved)
pub fn f64_column(df: &DataFrame, name: &str, context: &str) -> Result<Vec<Option<f64>>> {
    require_columns(df, &[name], context)?;
    let column = df
        .column(name)?
        .cast(&DataType::Float64)
        .with_context(|| format!("{}: column '{}' is not numeric", context, name))?;

    Ok(column.f64()?.into_iter().collect())
}

/// All `.csv` files in a directory, sorted by name
pub fn list_records(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to list directory: {:?}", dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map_or(false, |ext| ext == "csv"))
        .collect();
    paths.sort();

    Ok(paths)
}

/// Reload every record in a directory and concatenate diagonally
///
/// Records may have different column sets; absent columns are filled with
/// nulls. Returns `None` when the directory holds no records.
pub fn load_records(dir: &Path) -> Result<Option<DataFrame>> {
    let paths = list_records(dir)?;
    if paths.is_empty() {
        return Ok(None);
    }

    let frames = paths
        .iter()
        .map(|p| read_csv(p).map(|df| df.lazy()))
        .collect::<Result<Vec<LazyFrame>>>()?;

    let combined = concat_lf_diagonal(frames, UnionArgs::default())
        .with_context(|| format!("Failed to concatenate records in {:?}", dir))?
        .collect()
        .with_context(|| format!("Failed to materialize records in {:?}", dir))?;

    Ok(Some(combined))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_columns_missing() {
        let df = df![
            "name" => &["a"],
        ]
        .unwrap();

        assert!(require_columns(&df, &["name"], "test").is_ok());

        let err = require_columns(&df, &["taxon"], "test").unwrap_err();
        assert!(err.to_string().contains("taxon"));
    }

    #[test]
    fn test_write_and_reload_heterogeneous_records() {
        let dir = tempfile::tempdir().unwrap();

        let mut plain = df![
            "step" => &[1i64, 2],
            "secondary" => &[0i64, 1],
        ]
        .unwrap();
        let mut tagged = df![
            "step" => &[1i64],
            "secondary" => &[3i64],
            "residency" => &["Resident"],
        ]
        .unwrap();

        write_csv(&mut plain, &dir.path().join("a.csv")).unwrap();
        write_csv(&mut tagged, &dir.path().join("b.csv")).unwrap();

        let combined = load_records(dir.path()).unwrap().unwrap();
        assert_eq!(combined.height(), 3);

        let residency = string_column(&combined, "residency", "test").unwrap();
        assert_eq!(residency, vec![None, None, Some("Resident".to_string())]);

        let secondary = f64_column(&combined, "secondary", "test").unwrap();
        assert_eq!(secondary, vec![Some(0.0), Some(1.0), Some(3.0)]);
    }

    #[test]
    fn test_empty_or_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_records(dir.path()).unwrap().is_none());
        assert!(load_records(&dir.path().join("absent")).unwrap().is_none());
    }

    #[test]
    fn test_read_missing_file_names_resource() {
        let err = read_csv(Path::new("no/such/table.csv")).unwrap_err();
        assert!(err.to_string().contains("table.csv"));
    }
}
