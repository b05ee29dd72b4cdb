//! Error types for food web loading and analysis.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FoodWebError {
    #[error("Input file not found: {0}")]
    MissingInput(PathBuf),

    #[error("{context}: missing column '{column}'")]
    MissingColumn { context: String, column: String },

    #[error("{context}: malformed value: {detail}")]
    Malformed { context: String, detail: String },

    #[error("Negative interaction weight {weight} on edge {from} -> {to}")]
    NegativeWeight { from: String, to: String, weight: f64 },

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("No attribute row for node '{0}'")]
    MissingAttributes(String),

    #[error("Interaction strength threshold must be in (0, 1], got {0}")]
    InvalidThreshold(f64),
}
