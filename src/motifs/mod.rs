//! Three-node motif enumeration
//!
//! Occurrences are non-induced: a triple matches when the pattern's edges
//! are present, whatever other edges join the same nodes. Each mapping
//! lists target nodes in pattern order. Classifiers then inspect the
//! induced edges among the matched nodes.
//!
//! - `shared_prey`: two sources → one sink ("apparent competition")
//! - `chain`: apex → meso → prey ("tri-trophic cascade")
//! - `null_model`: G(n, m) random graphs carrying the reference attributes

pub mod chain;
pub mod null_model;
pub mod shared_prey;

pub use chain::{
    aggregate_chains, chain_trial_frame, classify_chain, enumerate_chains, run_chain_trials,
    ApexFilter, ChainOccurrence, ChainRole, ChainRoleCount,
};
pub use null_model::null_model;
pub use shared_prey::{
    count_shared_prey, run_shared_prey_trials, shared_prey_trial_frame, SharedPreyCategory,
    SharedPreyTally,
};

use crate::graph::FoodWeb;
use petgraph::graph::NodeIndex;
use petgraph::Direction;
use smallvec::SmallVec;

/// Target nodes of one match, in pattern order
pub type Mapping = SmallVec<[NodeIndex; 3]>;

/// Edge inside a matched node set: (position of source, position of target, weight)
pub type InducedEdge = (usize, usize, f64);

/// Distinct neighbours of `node` in one direction, self-loops excluded
fn distinct_neighbors(web: &FoodWeb, node: NodeIndex, direction: Direction) -> SmallVec<[NodeIndex; 8]> {
    let mut neighbors: SmallVec<[NodeIndex; 8]> = web
        .graph()
        .neighbors_directed(node, direction)
        .filter(|&n| n != node)
        .collect();
    neighbors.sort_unstable();
    neighbors.dedup();
    neighbors
}

/// Every `(s1, s2, t)` with `s1 → t`, `s2 → t` and `s1 ≠ s2`
///
/// Both orderings of the sources are visited.
pub fn for_each_shared_sink<F>(web: &FoodWeb, mut visit: F)
where
    F: FnMut(&Mapping),
{
    for sink in web.node_indices() {
        let sources = distinct_neighbors(web, sink, Direction::Incoming);
        for &a in &sources {
            for &b in &sources {
                if a != b {
                    let nodes: Mapping = SmallVec::from_buf([a, b, sink]);
                    visit(&nodes);
                }
            }
        }
    }
}

/// Every `(a, m, p)` with `a → m`, `m → p` and three distinct nodes
pub fn for_each_path<F>(web: &FoodWeb, mut visit: F)
where
    F: FnMut(&Mapping),
{
    for middle in web.node_indices() {
        let heads = distinct_neighbors(web, middle, Direction::Incoming);
        if heads.is_empty() {
            continue;
        }
        let tails = distinct_neighbors(web, middle, Direction::Outgoing);
        for &a in &heads {
            for &p in &tails {
                if a != p {
                    let nodes: Mapping = SmallVec::from_buf([a, middle, p]);
                    visit(&nodes);
                }
            }
        }
    }
}

/// All edges of `web` among the matched nodes (the induced subgraph)
pub fn induced_edges(web: &FoodWeb, nodes: &[NodeIndex]) -> SmallVec<[InducedEdge; 6]> {
    let graph = web.graph();
    let mut edges = SmallVec::new();
    for (i, &a) in nodes.iter().enumerate() {
        for (j, &b) in nodes.iter().enumerate() {
            if i == j {
                continue;
            }
            for edge in graph.edges_connecting(a, b) {
                edges.push((i, j, *edge.weight()));
            }
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Species, Taxon};

    fn web(names: &[&str], edges: &[(&str, &str)]) -> FoodWeb {
        let mut web = FoodWeb::new();
        for name in names {
            web.add_species(Species::new(*name, Taxon::Bird)).unwrap();
        }
        for (a, b) in edges {
            web.add_interaction(a, b, 1.0).unwrap();
        }
        web
    }

    #[test]
    fn test_induced_edges() {
        let mut web = web(&["a", "b", "c"], &[]);
        web.add_interaction("a", "c", 0.5).unwrap();
        web.add_interaction("b", "c", 1.5).unwrap();

        let nodes = [web.index_of("a").unwrap(), web.index_of("b").unwrap(), web.index_of("c").unwrap()];
        let edges = induced_edges(&web, &nodes);
        assert_eq!(edges.len(), 2);
        assert!(edges.contains(&(0, 2, 0.5)));
        assert!(edges.contains(&(1, 2, 1.5)));
    }

    #[test]
    fn test_shared_sink_ignores_extra_edges() {
        // a → b does not stop (a, b) sharing c
        let w = web(&["a", "b", "c"], &[("a", "c"), ("b", "c"), ("a", "b")]);
        let mut matches = Vec::new();
        for_each_shared_sink(&w, |nodes| matches.push(nodes.clone()));

        let (a, b, c) = (w.index_of("a").unwrap(), w.index_of("b").unwrap(), w.index_of("c").unwrap());
        assert_eq!(matches.len(), 2);
        assert!(matches.contains(&SmallVec::from_buf([a, b, c])));
        assert!(matches.contains(&SmallVec::from_buf([b, a, c])));
    }

    #[test]
    fn test_parallel_edges_match_once() {
        let w = web(&["a", "b", "c"], &[("a", "c"), ("a", "c"), ("b", "c")]);
        let mut count = 0;
        for_each_shared_sink(&w, |_| count += 1);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_paths_skip_two_cycles() {
        // a → b → a is not a three-node path
        let w = web(&["a", "b", "c"], &[("a", "b"), ("b", "a"), ("b", "c")]);
        let mut matches = Vec::new();
        for_each_path(&w, |nodes| matches.push(nodes.clone()));

        let (a, b, c) = (w.index_of("a").unwrap(), w.index_of("b").unwrap(), w.index_of("c").unwrap());
        assert_eq!(matches, vec![SmallVec::<[NodeIndex; 3]>::from_buf([a, b, c])]);
    }

    #[test]
    fn test_no_matches_without_edges() {
        let w = web(&["a", "b", "c"], &[]);
        let mut count = 0;
        for_each_shared_sink(&w, |_| count += 1);
        for_each_path(&w, |_| count += 1);
        assert_eq!(count, 0);
    }
}
