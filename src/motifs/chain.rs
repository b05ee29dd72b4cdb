//! Linear-chain motif ("tri-trophic cascade")
//!
//! Pattern: `apex → meso → prey` in the feeding (predator → prey)
//! orientation of the trophic web. Roles are read from each node's degree
//! signature inside the induced subgraph:
//!
//! | role | total degree | diet links |
//! |------|--------------|------------|
//! | apex | 1            | 1          |
//! | meso | 2            | 1          |
//! | prey | 1            | 0          |
//!
//! Diet links are the prey a node eats inside the motif (its in-degree in
//! energy-flow orientation). Paths are found without regard to other
//! links among the three nodes; those whose induced subgraph does not hold
//! exactly two edges are then dropped.

use super::shared_prey::tally_outcomes;
use super::{for_each_path, induced_edges, Mapping};
use crate::graph::{FoodWeb, Taxon};
use crate::utils::records::{write_csv, BatchReport};
use crate::utils::seeding::{unit_rng, CHAIN_STREAM};
use anyhow::{Context, Result};
use petgraph::graph::NodeIndex;
use polars::prelude::*;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;

pub const CHAIN_MOTIF_NAME: &str = "tri_trophic";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChainRole {
    Apex,
    Meso,
    Prey,
}

impl ChainRole {
    pub fn from_signature(total_degree: usize, diet_links: usize) -> Option<Self> {
        match (total_degree, diet_links) {
            (1, 1) => Some(ChainRole::Apex),
            (2, 1) => Some(ChainRole::Meso),
            (1, 0) => Some(ChainRole::Prey),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChainRole::Apex => "apex",
            ChainRole::Meso => "meso",
            ChainRole::Prey => "prey",
        }
    }
}

/// Restriction on the apex taxon of counted chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ApexFilter {
    All,
    Bird,
    Mammal,
    Reptile,
}

impl ApexFilter {
    pub const ALL: [ApexFilter; 4] = [ApexFilter::All, ApexFilter::Bird, ApexFilter::Mammal, ApexFilter::Reptile];

    pub fn accepts(&self, apex: Taxon) -> bool {
        match self {
            ApexFilter::All => true,
            ApexFilter::Bird => apex == Taxon::Bird,
            ApexFilter::Mammal => apex == Taxon::Mammal,
            ApexFilter::Reptile => apex == Taxon::Reptile,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ApexFilter::All => "all",
            ApexFilter::Bird => "bird_apex",
            ApexFilter::Mammal => "mammal_apex",
            ApexFilter::Reptile => "reptile_apex",
        }
    }
}

/// One chain member
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainMember {
    pub role: ChainRole,
    pub taxon: Taxon,
    pub trophic_level: Option<f64>,
}

/// A classified chain occurrence
#[derive(Debug, Clone, PartialEq)]
pub struct ChainOccurrence {
    pub members: [ChainMember; 3],
}

impl ChainOccurrence {
    pub fn member(&self, role: ChainRole) -> Option<&ChainMember> {
        self.members.iter().find(|m| m.role == role)
    }

    pub fn apex_taxon(&self) -> Option<Taxon> {
        self.member(ChainRole::Apex).map(|m| m.taxon)
    }
}

/// Classify a matched node triple; `None` for degenerate matches
pub fn classify_chain(web: &FoodWeb, nodes: &[NodeIndex]) -> Option<ChainOccurrence> {
    let edges = induced_edges(web, nodes);
    if edges.len() != 2 {
        return None;
    }

    let mut roles = [None; 3];
    for (position, slot) in roles.iter_mut().enumerate() {
        let diet = edges.iter().filter(|(from, _, _)| *from == position).count();
        let fed_on = edges.iter().filter(|(_, to, _)| *to == position).count();
        *slot = ChainRole::from_signature(diet + fed_on, diet);
    }

    let mut members = [ChainMember { role: ChainRole::Prey, taxon: Taxon::Other, trophic_level: None }; 3];
    for (position, member) in members.iter_mut().enumerate() {
        let species = web.species(nodes[position]);
        *member = ChainMember {
            role: roles[position]?,
            taxon: species.taxon,
            trophic_level: species.trophic_level,
        };
    }

    let has = |role: ChainRole| members.iter().filter(|m| m.role == role).count() == 1;
    if !(has(ChainRole::Apex) && has(ChainRole::Meso) && has(ChainRole::Prey)) {
        return None;
    }

    Some(ChainOccurrence { members })
}

/// Every valid chain in a graph (the per-trial buffer)
pub fn enumerate_chains(web: &FoodWeb) -> Vec<ChainOccurrence> {
    let mut chains = Vec::new();
    for_each_path(web, |nodes: &Mapping| {
        if let Some(chain) = classify_chain(web, nodes) {
            chains.push(chain);
        }
    });
    chains
}

/// Count of chain members for one (apex filter, role, taxon)
#[derive(Debug, Clone, PartialEq)]
pub struct ChainRoleCount {
    pub apex_filter: ApexFilter,
    pub role: ChainRole,
    pub taxon: Taxon,
    pub total: u64,
    pub trophic_level_sum: f64,
    /// Members with a known trophic level
    pub trophic_level_n: u64,
}

impl ChainRoleCount {
    pub fn mean_trophic_level(&self) -> Option<f64> {
        (self.trophic_level_n > 0).then(|| self.trophic_level_sum / self.trophic_level_n as f64)
    }

    /// Key used to line real-graph counts up with null-model counts
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.apex_filter.label(), self.role.label(), self.taxon.label())
    }
}

/// Aggregate per (role, taxon), once for all chains and once per apex taxon
pub fn aggregate_chains(chains: &[ChainOccurrence]) -> Vec<ChainRoleCount> {
    let mut groups: BTreeMap<(ApexFilter, ChainRole, Taxon), (u64, f64, u64)> = BTreeMap::new();

    for chain in chains {
        let Some(apex) = chain.apex_taxon() else { continue };
        for filter in ApexFilter::ALL.iter().filter(|f| f.accepts(apex)) {
            for member in &chain.members {
                let entry = groups.entry((*filter, member.role, member.taxon)).or_default();
                entry.0 += 1;
                if let Some(level) = member.trophic_level {
                    entry.1 += level;
                    entry.2 += 1;
                }
            }
        }
    }

    groups
        .into_iter()
        .map(|((apex_filter, role, taxon), (total, trophic_level_sum, trophic_level_n))| ChainRoleCount {
            apex_filter,
            role,
            taxon,
            total,
            trophic_level_sum,
            trophic_level_n,
        })
        .collect()
}

/// Rows of (trophic_role, taxon, total, motif, apex_filter, trial, ...)
pub fn chain_trial_frame(trial: usize, counts: &[ChainRoleCount]) -> Result<DataFrame> {
    let n = counts.len();
    let df = df![
        "trophic_role" => counts.iter().map(|c| c.role.label()).collect::<Vec<_>>(),
        "taxon" => counts.iter().map(|c| c.taxon.label()).collect::<Vec<_>>(),
        "total" => counts.iter().map(|c| c.total as i64).collect::<Vec<_>>(),
        "motif" => vec![CHAIN_MOTIF_NAME; n],
        "apex_filter" => counts.iter().map(|c| c.apex_filter.label()).collect::<Vec<_>>(),
        "trial" => vec![trial as i64; n],
        "trophic_level_sum" => counts.iter().map(|c| c.trophic_level_sum).collect::<Vec<_>>(),
        "trophic_level_n" => counts.iter().map(|c| c.trophic_level_n as i64).collect::<Vec<_>>(),
    ]?;
    Ok(df)
}

pub fn trial_file_name(trial: usize) -> String {
    format!("trial_{:04}.csv", trial)
}

/// Run chain null-model trials for the given index range
///
/// Starting above zero skips trials already on disk from an earlier run.
pub fn run_chain_trials(
    reference: &FoodWeb,
    out_dir: &Path,
    trials: Range<usize>,
    seed: u64,
    resume: bool,
) -> Result<BatchReport> {
    std::fs::create_dir_all(out_dir).with_context(|| format!("Failed to create {:?}", out_dir))?;
    tracing::info!(
        "Chain motif: trials {}..{} ({} nodes, {} edges)",
        trials.start,
        trials.end,
        reference.node_count(),
        reference.edge_count()
    );

    let outcomes: Vec<Option<bool>> = trials
        .into_par_iter()
        .map(|trial| {
            let path = out_dir.join(trial_file_name(trial));
            if resume && path.exists() {
                return None;
            }

            let result = (|| -> Result<()> {
                let mut rng = unit_rng(seed, &[CHAIN_STREAM, trial as u64]);
                let null = super::null_model(reference, &mut rng)?;
                let chains = enumerate_chains(&null);
                let counts = aggregate_chains(&chains);
                drop(chains);
                tracing::debug!("Chain trial {}: {} role/taxon groups", trial, counts.len());
                let mut df = chain_trial_frame(trial, &counts)?;
                write_csv(&mut df, &path)
            })();

            match result {
                Ok(()) => Some(true),
                Err(e) => {
                    tracing::warn!("Chain trial {} failed: {:#}", trial, e);
                    Some(false)
                }
            }
        })
        .collect();

    let report = tally_outcomes(&outcomes);
    tracing::info!(
        "Chain trials done: {} completed, {} skipped, {} failed",
        report.completed,
        report.skipped,
        report.failed
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Species;
    use crate::utils::records::read_csv;
    use approx::assert_relative_eq;

    fn web(nodes: &[(&str, Taxon, f64)], edges: &[(&str, &str)]) -> FoodWeb {
        let mut web = FoodWeb::new();
        for (name, taxon, level) in nodes {
            web.add_species(Species::new(*name, *taxon).with_trophic_level(*level)).unwrap();
        }
        for (a, b) in edges {
            web.add_interaction(a, b, 1.0).unwrap();
        }
        web
    }

    #[test]
    fn test_single_chain_roles() {
        let w = web(
            &[("A", Taxon::Bird, 3.0), ("B", Taxon::Mammal, 2.0), ("C", Taxon::Other, 1.0)],
            &[("A", "B"), ("B", "C")],
        );
        let chains = enumerate_chains(&w);
        assert_eq!(chains.len(), 1);

        let chain = &chains[0];
        assert_eq!(chain.member(ChainRole::Apex).unwrap().taxon, Taxon::Bird);
        assert_eq!(chain.member(ChainRole::Meso).unwrap().taxon, Taxon::Mammal);
        assert_eq!(chain.member(ChainRole::Prey).unwrap().taxon, Taxon::Other);
    }

    #[test]
    fn test_classify_rejects_extra_edges() {
        let w = web(
            &[("A", Taxon::Bird, 3.0), ("B", Taxon::Mammal, 2.0), ("C", Taxon::Other, 1.0)],
            &[("A", "B"), ("B", "C"), ("A", "C")],
        );
        let nodes = [w.index_of("A").unwrap(), w.index_of("B").unwrap(), w.index_of("C").unwrap()];
        assert_eq!(classify_chain(&w, &nodes), None);
        assert!(enumerate_chains(&w).is_empty());
    }

    #[test]
    fn test_reverse_link_is_degenerate() {
        // C also eats A: the triple is a three-cycle, not a chain
        let w = web(
            &[("A", Taxon::Bird, 3.0), ("B", Taxon::Mammal, 2.0), ("C", Taxon::Other, 1.0)],
            &[("A", "B"), ("B", "C"), ("C", "A")],
        );
        assert!(enumerate_chains(&w).is_empty());
    }

    #[test]
    fn test_chain_next_to_unrelated_link() {
        // D → C sits outside the A → B → C triple
        let w = web(
            &[("A", Taxon::Bird, 3.0), ("B", Taxon::Mammal, 2.0), ("C", Taxon::Other, 1.0), ("D", Taxon::Reptile, 2.5)],
            &[("A", "B"), ("B", "C"), ("D", "C")],
        );
        let chains = enumerate_chains(&w);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].apex_taxon(), Some(Taxon::Bird));
    }

    #[test]
    fn test_signature_table() {
        assert_eq!(ChainRole::from_signature(1, 1), Some(ChainRole::Apex));
        assert_eq!(ChainRole::from_signature(2, 1), Some(ChainRole::Meso));
        assert_eq!(ChainRole::from_signature(1, 0), Some(ChainRole::Prey));
        assert_eq!(ChainRole::from_signature(2, 2), None);
    }

    #[test]
    fn test_aggregate_by_apex_taxon() {
        // Hawk → Vole → Plants and Fox → Vole → Plants
        let w = web(
            &[
                ("Hawk", Taxon::Bird, 3.0),
                ("Fox", Taxon::Mammal, 3.2),
                ("Vole", Taxon::Mammal, 2.0),
                ("Plants", Taxon::Other, 1.0),
            ],
            &[("Hawk", "Vole"), ("Fox", "Vole"), ("Vole", "Plants")],
        );
        let counts = aggregate_chains(&enumerate_chains(&w));
        let find = |filter, role, taxon| {
            counts
                .iter()
                .find(|c| c.apex_filter == filter && c.role == role && c.taxon == taxon)
                .map(|c| c.total)
        };

        assert_eq!(find(ApexFilter::All, ChainRole::Meso, Taxon::Mammal), Some(2));
        assert_eq!(find(ApexFilter::All, ChainRole::Apex, Taxon::Bird), Some(1));
        assert_eq!(find(ApexFilter::Bird, ChainRole::Meso, Taxon::Mammal), Some(1));
        assert_eq!(find(ApexFilter::Mammal, ChainRole::Apex, Taxon::Mammal), Some(1));
        assert_eq!(find(ApexFilter::Reptile, ChainRole::Prey, Taxon::Other), None);

        let apex_mammal = counts
            .iter()
            .find(|c| c.apex_filter == ApexFilter::All && c.role == ChainRole::Apex && c.taxon == Taxon::Mammal)
            .unwrap();
        assert_relative_eq!(apex_mammal.mean_trophic_level().unwrap(), 3.2);
        assert_eq!(apex_mammal.key(), "all/apex/Mammal");
    }

    #[test]
    fn test_trials_over_range() {
        let reference = web(
            &[("A", Taxon::Bird, 3.0), ("B", Taxon::Mammal, 2.0), ("C", Taxon::Other, 1.0), ("D", Taxon::Reptile, 2.5)],
            &[("A", "B"), ("B", "C"), ("D", "C")],
        );
        let dir = tempfile::tempdir().unwrap();
        let report = run_chain_trials(&reference, dir.path(), 2..6, 17, false).unwrap();
        assert_eq!(report.completed, 4);
        assert!(!dir.path().join(trial_file_name(0)).exists());
        assert!(dir.path().join(trial_file_name(5)).exists());

        let report = run_chain_trials(&reference, dir.path(), 0..6, 17, true).unwrap();
        assert_eq!(report.skipped, 4);
        assert_eq!(report.completed, 2);
    }

    #[test]
    fn test_trial_frame_schema() {
        let counts = vec![ChainRoleCount {
            apex_filter: ApexFilter::All,
            role: ChainRole::Apex,
            taxon: Taxon::Bird,
            total: 3,
            trophic_level_sum: 9.0,
            trophic_level_n: 3,
        }];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let mut df = chain_trial_frame(7, &counts).unwrap();
        write_csv(&mut df, &path).unwrap();

        let reloaded = read_csv(&path).unwrap();
        assert_eq!(reloaded.height(), 1);
        for column in ["trophic_role", "taxon", "total", "motif", "apex_filter", "trial"] {
            assert!(reloaded.column(column).is_ok(), "{}", column);
        }
    }
}
