//! Shared-prey motif ("apparent competition")
//!
//! Pattern: two sources feeding one sink (`s1 → t`, `s2 → t`) in the
//! prey → consumer web, i.e. two prey sharing a predator. Matching is
//! non-induced, and each occurrence is visited twice (the sources can
//! swap), so reported counts are the raw counts halved.
//!
//! Categories are checked independently; one occurrence can land in
//! several of them.

use super::{for_each_shared_sink, induced_edges, InducedEdge, Mapping};
use crate::graph::{FoodWeb, Taxon};
use crate::utils::records::{write_csv, BatchReport};
use crate::utils::seeding::{unit_rng, SHARED_PREY_STREAM};
use anyhow::{Context, Result};
use polars::prelude::*;
use rayon::prelude::*;
use smallvec::SmallVec;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SharedPreyCategory {
    AllBird,
    AllMammal,
    AllReptile,
    BothPreyBird,
    BothPreyMammal,
    BothPreyReptile,
    MammalReptile,
    MammalBird,
    ReptileBird,
}

/// Structural predicate behind a category
#[derive(Debug, Clone, Copy)]
enum Composition {
    /// All three nodes share the taxon
    AllSame(Taxon),
    /// Exactly two nodes have the taxon and both are unfed sources
    BothPrey(Taxon),
    /// One source of each taxon
    MixedSources(Taxon, Taxon),
}

impl SharedPreyCategory {
    pub const ALL: [SharedPreyCategory; 9] = [
        SharedPreyCategory::AllBird,
        SharedPreyCategory::AllMammal,
        SharedPreyCategory::AllReptile,
        SharedPreyCategory::BothPreyBird,
        SharedPreyCategory::BothPreyMammal,
        SharedPreyCategory::BothPreyReptile,
        SharedPreyCategory::MammalReptile,
        SharedPreyCategory::MammalBird,
        SharedPreyCategory::ReptileBird,
    ];

    pub fn column_name(&self) -> &'static str {
        match self {
            SharedPreyCategory::AllBird => "all_bird",
            SharedPreyCategory::AllMammal => "all_mammal",
            SharedPreyCategory::AllReptile => "all_reptile",
            SharedPreyCategory::BothPreyBird => "both_prey_bird",
            SharedPreyCategory::BothPreyMammal => "both_prey_mammal",
            SharedPreyCategory::BothPreyReptile => "both_prey_reptile",
            SharedPreyCategory::MammalReptile => "mammal_reptile",
            SharedPreyCategory::MammalBird => "mammal_bird",
            SharedPreyCategory::ReptileBird => "reptile_bird",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }

    fn composition(&self) -> Composition {
        use Composition::*;
        match self {
            SharedPreyCategory::AllBird => AllSame(Taxon::Bird),
            SharedPreyCategory::AllMammal => AllSame(Taxon::Mammal),
            SharedPreyCategory::AllReptile => AllSame(Taxon::Reptile),
            SharedPreyCategory::BothPreyBird => BothPrey(Taxon::Bird),
            SharedPreyCategory::BothPreyMammal => BothPrey(Taxon::Mammal),
            SharedPreyCategory::BothPreyReptile => BothPrey(Taxon::Reptile),
            SharedPreyCategory::MammalReptile => MixedSources(Taxon::Mammal, Taxon::Reptile),
            SharedPreyCategory::MammalBird => MixedSources(Taxon::Mammal, Taxon::Bird),
            SharedPreyCategory::ReptileBird => MixedSources(Taxon::Reptile, Taxon::Bird),
        }
    }
}

/// A matched (s1, s2, t) triple with its induced edges
struct Occurrence {
    taxa: [Taxon; 3],
    edges: SmallVec<[InducedEdge; 6]>,
}

impl Occurrence {
    fn in_degree(&self, position: usize) -> usize {
        self.edges.iter().filter(|(_, to, _)| *to == position).count()
    }

    fn matches(&self, composition: Composition) -> bool {
        let [s1, s2, sink] = self.taxa;
        match composition {
            Composition::AllSame(taxon) => s1 == taxon && s2 == taxon && sink == taxon,
            Composition::BothPrey(taxon) => {
                s1 == taxon
                    && s2 == taxon
                    && sink != taxon
                    && self.in_degree(0) == 0
                    && self.in_degree(1) == 0
            }
            Composition::MixedSources(a, b) => (s1 == a && s2 == b) || (s1 == b && s2 == a),
        }
    }
}

/// Raw match counts and edge-weight sums per category
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedPreyTally {
    raw: [u64; 9],
    weight_sum: [f64; 9],
    weight_n: [u64; 9],
}

impl SharedPreyTally {
    /// Count straight from the isomorphism search (each occurrence twice)
    pub fn raw(&self, category: SharedPreyCategory) -> u64 {
        self.raw[category.index()]
    }

    /// Raw count halved
    pub fn corrected(&self, category: SharedPreyCategory) -> f64 {
        self.raw(category) as f64 / 2.0
    }

    /// Mean weight of the edges in matching occurrences; `None` if none matched
    pub fn mean_weight(&self, category: SharedPreyCategory) -> Option<f64> {
        let i = category.index();
        (self.weight_n[i] > 0).then(|| self.weight_sum[i] / self.weight_n[i] as f64)
    }

    pub fn total_raw(&self) -> u64 {
        self.raw.iter().sum()
    }

    fn record(&mut self, category: SharedPreyCategory, weights: &[f64]) {
        let i = category.index();
        self.raw[i] += 1;
        self.weight_sum[i] += weights.iter().sum::<f64>();
        self.weight_n[i] += weights.len() as u64;
    }
}

/// Categories an occurrence falls in, plus the weights to accumulate
fn classify(web: &FoodWeb, nodes: &Mapping) -> (SmallVec<[SharedPreyCategory; 9]>, SmallVec<[f64; 6]>) {
    let occurrence = Occurrence {
        taxa: [
            web.species(nodes[0]).taxon,
            web.species(nodes[1]).taxon,
            web.species(nodes[2]).taxon,
        ],
        edges: induced_edges(web, nodes),
    };

    let categories = SharedPreyCategory::ALL
        .iter()
        .copied()
        .filter(|c| occurrence.matches(c.composition()))
        .collect();
    let weights = occurrence.edges.iter().map(|(_, _, w)| *w).collect();

    (categories, weights)
}

/// Count shared-prey occurrences in one graph
pub fn count_shared_prey(web: &FoodWeb) -> SharedPreyTally {
    let mut tally = SharedPreyTally::default();

    for_each_shared_sink(web, |nodes| {
        let (categories, weights) = classify(web, nodes);
        for category in categories {
            tally.record(category, &weights);
        }
    });

    tally
}

/// One-row frame for a trial: corrected counts, then `mean_weight_<category>`
///
/// A category with no occurrence leaves its mean weight empty.
pub fn shared_prey_trial_frame(trial: usize, tally: &SharedPreyTally) -> Result<DataFrame> {
    let mut columns: Vec<Column> = vec![Series::new("trial".into(), &[trial as i64]).into()];
    for category in SharedPreyCategory::ALL {
        columns.push(Series::new(category.column_name().into(), &[tally.corrected(category)]).into());
    }
    for category in SharedPreyCategory::ALL {
        let name = format!("mean_weight_{}", category.column_name());
        columns.push(Series::new(name.into(), &[tally.mean_weight(category)]).into());
    }
    Ok(DataFrame::new(columns)?)
}

pub fn trial_file_name(trial: usize) -> String {
    format!("trial_{:04}.csv", trial)
}

/// Run null-model trials `0..trials`, one CSV per trial in `out_dir`
pub fn run_shared_prey_trials(
    reference: &FoodWeb,
    out_dir: &Path,
    trials: usize,
    seed: u64,
    resume: bool,
) -> Result<BatchReport> {
    std::fs::create_dir_all(out_dir).with_context(|| format!("Failed to create {:?}", out_dir))?;
    tracing::info!(
        "Shared-prey motif: {} null-model trials ({} nodes, {} edges)",
        trials,
        reference.node_count(),
        reference.edge_count()
    );

    let outcomes: Vec<Option<bool>> = (0..trials)
        .into_par_iter()
        .map(|trial| {
            let path = out_dir.join(trial_file_name(trial));
            if resume && path.exists() {
                return None;
            }

            let result = (|| -> Result<()> {
                let mut rng = unit_rng(seed, &[SHARED_PREY_STREAM, trial as u64]);
                let null = super::null_model(reference, &mut rng)?;
                let tally = count_shared_prey(&null);
                tracing::debug!("Shared-prey trial {}: {} raw matches", trial, tally.total_raw());
                let mut df = shared_prey_trial_frame(trial, &tally)?;
                write_csv(&mut df, &path)
            })();

            match result {
                Ok(()) => Some(true),
                Err(e) => {
                    tracing::warn!("Shared-prey trial {} failed: {:#}", trial, e);
                    Some(false)
                }
            }
        })
        .collect();

    let report = tally_outcomes(&outcomes);
    tracing::info!(
        "Shared-prey trials done: {} completed, {} skipped, {} failed",
        report.completed,
        report.skipped,
        report.failed
    );
    Ok(report)
}

/// `None` = skipped, `Some(true)` = completed, `Some(false)` = failed
pub(crate) fn tally_outcomes(outcomes: &[Option<bool>]) -> BatchReport {
    let mut report = BatchReport::default();
    for outcome in outcomes {
        match outcome {
            None => report.skipped += 1,
            Some(true) => report.completed += 1,
            Some(false) => report.failed += 1,
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Species;
    use crate::utils::records::read_csv;
    use approx::assert_relative_eq;

    fn web(nodes: &[(&str, Taxon)], edges: &[(&str, &str, f64)]) -> FoodWeb {
        let mut web = FoodWeb::new();
        for (name, taxon) in nodes {
            web.add_species(Species::new(*name, *taxon)).unwrap();
        }
        for (a, b, w) in edges {
            web.add_interaction(a, b, *w).unwrap();
        }
        web
    }

    #[test]
    fn test_all_bird_pair_counts_twice() {
        let w = web(
            &[("A", Taxon::Bird), ("B", Taxon::Bird), ("C", Taxon::Bird)],
            &[("A", "C", 1.0), ("B", "C", 3.0)],
        );
        let tally = count_shared_prey(&w);

        assert_eq!(tally.raw(SharedPreyCategory::AllBird), 2);
        assert_relative_eq!(tally.corrected(SharedPreyCategory::AllBird), 1.0);
        assert_relative_eq!(tally.mean_weight(SharedPreyCategory::AllBird).unwrap(), 2.0);
        assert_eq!(tally.total_raw(), 2);
        assert_eq!(tally.mean_weight(SharedPreyCategory::AllMammal), None);
    }

    #[test]
    fn test_both_prey_and_mixed_sources() {
        let w = web(
            &[
                ("m1", Taxon::Mammal),
                ("m2", Taxon::Mammal),
                ("r1", Taxon::Reptile),
                ("owl", Taxon::Bird),
            ],
            &[("m1", "owl", 1.0), ("m2", "owl", 1.0), ("r1", "owl", 1.0)],
        );
        let tally = count_shared_prey(&w);

        // {m1,m2}, {m1,r1}, {m2,r1} share the owl
        assert_relative_eq!(tally.corrected(SharedPreyCategory::BothPreyMammal), 1.0);
        assert_relative_eq!(tally.corrected(SharedPreyCategory::MammalReptile), 2.0);
        assert_relative_eq!(tally.corrected(SharedPreyCategory::AllMammal), 0.0);
        assert_relative_eq!(tally.corrected(SharedPreyCategory::MammalBird), 0.0);
    }

    #[test]
    fn test_raw_counts_are_even() {
        let w = web(
            &[
                ("b1", Taxon::Bird),
                ("b2", Taxon::Bird),
                ("m1", Taxon::Mammal),
                ("r1", Taxon::Reptile),
                ("hawk", Taxon::Bird),
                ("fox", Taxon::Mammal),
            ],
            &[
                ("b1", "hawk", 1.0),
                ("b2", "hawk", 1.0),
                ("m1", "hawk", 1.0),
                ("r1", "hawk", 1.0),
                ("b1", "fox", 1.0),
                ("m1", "fox", 1.0),
                ("r1", "fox", 1.0),
            ],
        );
        let tally = count_shared_prey(&w);
        for category in SharedPreyCategory::ALL {
            assert_eq!(tally.raw(category) % 2, 0, "{:?}", category);
        }
        assert!(tally.total_raw() > 0);
    }

    #[test]
    fn test_empty_graph_has_no_counts() {
        let w = web(&[("a", Taxon::Bird), ("b", Taxon::Bird), ("c", Taxon::Bird)], &[]);
        let tally = count_shared_prey(&w);
        assert_eq!(tally, SharedPreyTally::default());
        for category in SharedPreyCategory::ALL {
            assert_eq!(tally.mean_weight(category), None);
        }
    }

    #[test]
    fn test_trials_persist_one_row_each() {
        let reference = web(
            &[("a", Taxon::Bird), ("b", Taxon::Mammal), ("c", Taxon::Reptile), ("d", Taxon::Bird)],
            &[("a", "c", 1.0), ("b", "c", 1.0), ("d", "a", 1.0)],
        );
        let dir = tempfile::tempdir().unwrap();
        let report = run_shared_prey_trials(&reference, dir.path(), 5, 3, false).unwrap();
        assert_eq!(report.completed, 5);

        let df = read_csv(&dir.path().join(trial_file_name(2))).unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.width(), 19);
    }

    #[test]
    fn test_linked_sources_still_share_prey() {
        let w = web(
            &[("A", Taxon::Bird), ("B", Taxon::Bird), ("C", Taxon::Bird)],
            &[("A", "C", 1.0), ("B", "C", 1.0), ("A", "B", 1.0)],
        );
        let tally = count_shared_prey(&w);
        assert_eq!(tally.raw(SharedPreyCategory::AllBird), 2);
        assert_relative_eq!(tally.corrected(SharedPreyCategory::AllBird), 1.0);
    }

    #[test]
    fn test_both_prey_requires_unfed_sources() {
        let w = web(
            &[("m1", Taxon::Mammal), ("m2", Taxon::Mammal), ("owl", Taxon::Bird)],
            &[("m1", "owl", 1.0), ("m2", "owl", 1.0), ("m1", "m2", 1.0)],
        );
        let tally = count_shared_prey(&w);
        assert_eq!(tally.raw(SharedPreyCategory::BothPreyMammal), 0);
        assert_eq!(tally.total_raw(), 0);
    }

    #[test]
    fn test_trial_frame_carries_mean_weights() {
        let w = web(
            &[("A", Taxon::Bird), ("B", Taxon::Bird), ("C", Taxon::Bird)],
            &[("A", "C", 1.0), ("B", "C", 3.0)],
        );
        let df = shared_prey_trial_frame(0, &count_shared_prey(&w)).unwrap();

        let all_bird = df.column("mean_weight_all_bird").unwrap().f64().unwrap().get(0);
        assert_eq!(all_bird, Some(2.0));
        let all_mammal = df.column("mean_weight_all_mammal").unwrap().f64().unwrap().get(0);
        assert_eq!(all_mammal, None);
    }
}
