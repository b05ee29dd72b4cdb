//! Taxonomic homophily
//!
//! Newman's nominal assortativity over the unweighted trophic web,
//! partitioned by taxon. The trophic edge list is stored predator → prey;
//! the index is computed on prey → predator links.

use crate::graph::{FoodWeb, Taxon};
use petgraph::visit::EdgeRef;
use serde::Serialize;

const K: usize = Taxon::ALL.len();

#[derive(Debug, Clone, Serialize)]
pub struct HomophilyReport {
    /// `None` when the index is undefined (no edges, or a single taxon)
    pub index: Option<f64>,
    pub nodes: usize,
    pub edges: usize,
}

/// Homophily index of the trophic web (edges reversed to prey → predator)
pub fn homophily_index(trophic_web: &FoodWeb) -> HomophilyReport {
    let energy_flow = trophic_web.reversed();
    HomophilyReport {
        index: nominal_assortativity(&energy_flow),
        nodes: energy_flow.node_count(),
        edges: energy_flow.edge_count(),
    }
}

/// r = (Σ e_ii − Σ a_i b_i) / (1 − Σ a_i b_i)
///
/// `e_ij` is the fraction of edges from taxon i to taxon j; `a` and `b` are
/// its row and column sums.
pub fn nominal_assortativity(web: &FoodWeb) -> Option<f64> {
    let graph = web.graph();
    let m = graph.edge_count();
    if m == 0 {
        return None;
    }

    let mut e = [[0.0f64; K]; K];
    for edge in graph.edge_references() {
        let i = graph[edge.source()].taxon.index();
        let j = graph[edge.target()].taxon.index();
        e[i][j] += 1.0;
    }
    for row in e.iter_mut() {
        for cell in row.iter_mut() {
            *cell /= m as f64;
        }
    }

    let trace: f64 = (0..K).map(|i| e[i][i]).sum();
    let expected: f64 = (0..K)
        .map(|i| {
            let a: f64 = e[i].iter().sum();
            let b: f64 = (0..K).map(|r| e[r][i]).sum();
            a * b
        })
        .sum();

    let denominator = 1.0 - expected;
    if denominator.abs() < 1e-12 {
        return None;
    }

    Some((trace - expected) / denominator)
}
