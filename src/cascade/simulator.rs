//! Extinction cascade simulation
//!
//! Removes species in a given order and propagates secondary extinctions
//! through prey → consumer links. A consumer dies once the weighted
//! in-strength it still receives from living prey, relative to its
//! original in-strength, falls to `1 − threshold` or below.
//!
//! Basal species (no incoming weight) never go secondarily extinct.

use crate::error::FoodWebError;
use crate::graph::{FoodWeb, Subgroup};
use anyhow::Result;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use polars::prelude::*;
use std::collections::VecDeque;

/// Absorbs rounding when a remaining fraction lands on the boundary
const BOUNDARY_EPSILON: f64 = 1e-9;

/// State after one primary removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeStep {
    /// Primary extinctions applied so far (1-based position in the order)
    pub step: usize,
    /// Accumulated secondary extinctions
    pub secondary: usize,
}

/// Simulate a removal sequence
///
/// Returns one `CascadeStep` per entry of `order`. Entries that are already
/// gone (removed or secondarily extinct) leave the count unchanged.
///
/// # Errors
/// - `InvalidThreshold` unless `0 < threshold <= 1`
/// - `UnknownNode` for an index outside the graph
pub fn simulate_extinctions(
    web: &FoodWeb,
    order: &[NodeIndex],
    threshold: f64,
) -> Result<Vec<CascadeStep>, FoodWebError> {
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(FoodWebError::InvalidThreshold(threshold));
    }

    let graph = web.graph();
    let n = graph.node_count();

    if let Some(bad) = order.iter().find(|idx| idx.index() >= n) {
        return Err(FoodWebError::UnknownNode(format!("index {}", bad.index())));
    }

    let original: Vec<f64> = graph.node_indices().map(|idx| web.in_strength(idx)).collect();
    let retain_limit = 1.0 - threshold;

    let mut alive = vec![true; n];
    let mut secondary = 0usize;
    let mut steps = Vec::with_capacity(order.len());
    let mut worklist: VecDeque<NodeIndex> = VecDeque::new();

    for (position, &primary) in order.iter().enumerate() {
        if alive[primary.index()] {
            alive[primary.index()] = false;
            worklist.extend(graph.neighbors_directed(primary, Direction::Outgoing));

            while let Some(consumer) = worklist.pop_front() {
                let c = consumer.index();
                if !alive[c] || original[c] <= 0.0 {
                    continue;
                }

                let remaining: f64 = graph
                    .edges_directed(consumer, Direction::Incoming)
                    .filter(|e| alive[e.source().index()])
                    .map(|e| *e.weight())
                    .sum();

                if remaining / original[c] <= retain_limit + BOUNDARY_EPSILON {
                    alive[c] = false;
                    secondary += 1;
                    worklist.extend(graph.neighbors_directed(consumer, Direction::Outgoing));
                }
            }
        }

        steps.push(CascadeStep { step: position + 1, secondary });
    }

    Ok(steps)
}

/// One simulation call with its sweep coordinates
#[derive(Debug, Clone)]
pub struct CascadeRun {
    pub subgroup: Subgroup,
    pub threshold: f64,
    pub iteration: usize,
    pub steps: Vec<CascadeStep>,
}

impl CascadeRun {
    /// Persistable frame: `step,secondary,class,threshold,iteration`, plus
    /// `residency` for residency splits only
    pub fn to_frame(&self) -> Result<DataFrame> {
        let n = self.steps.len();
        let steps: Vec<i64> = self.steps.iter().map(|s| s.step as i64).collect();
        let secondary: Vec<i64> = self.steps.iter().map(|s| s.secondary as i64).collect();

        let mut df = df![
            "step" => steps,
            "secondary" => secondary,
            "class" => vec![self.subgroup.taxon().label(); n],
            "threshold" => vec![self.threshold; n],
            "iteration" => vec![self.iteration as i64; n],
        ]?;

        if let Some(residency) = self.subgroup.residency() {
            df.with_column(Series::new("residency".into(), vec![residency.label(); n]))?;
        }

        Ok(df)
    }
}
