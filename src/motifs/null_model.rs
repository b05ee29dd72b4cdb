//! Null-model graphs
//!
//! Directed G(n, m): the reference's node count and edge count, no
//! self-loops, no parallel edges, every admissible edge set equally likely.
//! Node `k` keeps the species attributes of reference node `k`; the
//! reference's edge weights are shuffled onto the new edges.

use crate::error::FoodWebError;
use crate::graph::FoodWeb;
use petgraph::graph::NodeIndex;
use rand::seq::{index, SliceRandom};
use rand::Rng;

pub fn null_model<R: Rng + ?Sized>(reference: &FoodWeb, rng: &mut R) -> Result<FoodWeb, FoodWebError> {
    let n = reference.node_count();
    let m = reference.edge_count();
    let capacity = n.saturating_mul(n.saturating_sub(1));

    if m > capacity {
        return Err(FoodWebError::Malformed {
            context: "null model".to_string(),
            detail: format!("{} edges cannot fit in a simple digraph of {} nodes", m, n),
        });
    }

    let mut web = reference.nodes_only();
    if m == 0 {
        return Ok(web);
    }

    let mut weights = reference.weights();
    weights.shuffle(rng);

    // Slot k encodes the ordered pair (k / (n-1), skip-diagonal remainder)
    for (slot, weight) in index::sample(rng, capacity, m).into_iter().zip(weights) {
        let source = slot / (n - 1);
        let offset = slot % (n - 1);
        let target = if offset >= source { offset + 1 } else { offset };
        web.add_interaction_between(NodeIndex::new(source), NodeIndex::new(target), weight);
    }

    Ok(web)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Species, Taxon};
    use crate::utils::seeding::unit_rng;
    use petgraph::visit::EdgeRef;
    use rustc_hash::FxHashSet;

    fn reference() -> FoodWeb {
        let mut web = FoodWeb::new();
        let taxa = [Taxon::Bird, Taxon::Mammal, Taxon::Reptile, Taxon::Other, Taxon::Bird];
        for (i, taxon) in taxa.iter().enumerate() {
            web.add_species(Species::new(format!("s{}", i), *taxon)).unwrap();
        }
        for (a, b, w) in [("s0", "s1", 0.1), ("s1", "s2", 0.2), ("s2", "s3", 0.3), ("s3", "s4", 0.4), ("s4", "s0", 0.5), ("s0", "s2", 0.6)] {
            web.add_interaction(a, b, w).unwrap();
        }
        web
    }

    #[test]
    fn test_matches_size_and_attributes() {
        let reference = reference();
        let mut rng = unit_rng(9, &[0]);
        let null = null_model(&reference, &mut rng).unwrap();

        assert_eq!(null.node_count(), reference.node_count());
        assert_eq!(null.edge_count(), reference.edge_count());
        for idx in reference.node_indices() {
            assert_eq!(null.species(idx), reference.species(idx));
        }

        let mut weights = null.weights();
        weights.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(weights, vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
    }

    #[test]
    fn test_simple_digraph() {
        let reference = reference();
        for seed in 0..20 {
            let mut rng = unit_rng(seed, &[1]);
            let null = null_model(&reference, &mut rng).unwrap();
            let mut pairs = FxHashSet::default();
            for edge in null.graph().edge_references() {
                assert_ne!(edge.source(), edge.target());
                assert!(pairs.insert((edge.source(), edge.target())));
            }
        }
    }

    #[test]
    fn test_complete_graph_and_empty_graph() {
        let mut dense = FoodWeb::new();
        for name in ["a", "b", "c"] {
            dense.add_species(Species::new(name, Taxon::Bird)).unwrap();
        }
        for (a, b) in [("a", "b"), ("b", "a"), ("a", "c"), ("c", "a"), ("b", "c"), ("c", "b")] {
            dense.add_interaction(a, b, 1.0).unwrap();
        }
        let mut rng = unit_rng(1, &[]);
        assert_eq!(null_model(&dense, &mut rng).unwrap().edge_count(), 6);

        dense.add_interaction("a", "b", 1.0).unwrap();
        assert!(null_model(&dense, &mut rng).is_err());

        let empty = dense.nodes_only();
        assert_eq!(null_model(&empty, &mut rng).unwrap().edge_count(), 0);
    }
}
