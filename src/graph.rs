//! Food web graph model
//!
//! A `FoodWeb` wraps a `petgraph` directed graph whose nodes carry species
//! attributes and whose edges carry non-negative interaction weights. The
//! name → index map is built once and reused for every subgroup lookup.
//!
//! Edge direction is whatever the loader decides; the weighted web uses
//! energy flow (prey → consumer), the trophic web uses feeding
//! (predator → prey). `reversed()` converts between the two.

use crate::error::FoodWebError;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fmt;

/// Taxonomic class of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Taxon {
    Bird,
    Mammal,
    Reptile,
    Other,
}

impl Taxon {
    pub const ALL: [Taxon; 4] = [Taxon::Bird, Taxon::Mammal, Taxon::Reptile, Taxon::Other];

    /// Parse a class label; accepts common and Linnaean names
    pub fn from_class(class: &str) -> Self {
        match class.trim().to_lowercase().as_str() {
            "bird" | "birds" | "aves" => Taxon::Bird,
            "mammal" | "mammals" | "mammalia" => Taxon::Mammal,
            "reptile" | "reptiles" | "reptilia" | "squamata" => Taxon::Reptile,
            _ => Taxon::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Taxon::Bird => "Bird",
            Taxon::Mammal => "Mammal",
            Taxon::Reptile => "Reptile",
            Taxon::Other => "Other",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Taxon::Bird => 0,
            Taxon::Mammal => 1,
            Taxon::Reptile => 2,
            Taxon::Other => 3,
        }
    }
}

impl fmt::Display for Taxon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Year-round residency of a bird species
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Residency {
    Resident,
    NonResident,
}

impl Residency {
    pub fn label(&self) -> &'static str {
        match self {
            Residency::Resident => "Resident",
            Residency::NonResident => "NonResident",
        }
    }
}

/// Node payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Species {
    pub name: String,
    pub taxon: Taxon,
    /// Only set for birds
    pub residency: Option<Residency>,
    pub trophic_level: Option<f64>,
    pub order: Option<String>,
    pub scientific_name: Option<String>,
}

impl Species {
    pub fn new(name: impl Into<String>, taxon: Taxon) -> Self {
        Self {
            name: name.into(),
            taxon,
            residency: if taxon == Taxon::Bird { Some(Residency::NonResident) } else { None },
            trophic_level: None,
            order: None,
            scientific_name: None,
        }
    }

    pub fn with_residency(mut self, residency: Residency) -> Self {
        if self.taxon == Taxon::Bird {
            self.residency = Some(residency);
        }
        self
    }

    pub fn with_trophic_level(mut self, level: f64) -> Self {
        self.trophic_level = Some(level);
        self
    }

    /// Six-letter code used by the resident list
    pub fn code(&self) -> String {
        species_code(self.scientific_name.as_deref().unwrap_or(&self.name))
    }
}

/// Six-letter species code: genus[..3] + epithet[..3], upper-cased
///
/// `Turdus migratorius` → `TURMIG`. Single-word names use their first six
/// letters. Underscores are treated as word separators.
pub fn species_code(name: &str) -> String {
    let normalized = name.replace('_', " ");
    let words: Vec<&str> = normalized.split_whitespace().collect();
    let code: String = match words.as_slice() {
        [] => String::new(),
        [single] => single.chars().filter(|c| c.is_alphabetic()).take(6).collect(),
        [genus, epithet, ..] => genus
            .chars()
            .filter(|c| c.is_alphabetic())
            .take(3)
            .chain(epithet.chars().filter(|c| c.is_alphabetic()).take(3))
            .collect(),
    };
    code.to_uppercase()
}

/// Species subsets used as primary-extinction pools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subgroup {
    Mammals,
    Reptiles,
    Birds,
    ResidentBirds,
    NonResidentBirds,
}

impl Subgroup {
    pub const ALL: [Subgroup; 5] = [
        Subgroup::Mammals,
        Subgroup::Reptiles,
        Subgroup::Birds,
        Subgroup::ResidentBirds,
        Subgroup::NonResidentBirds,
    ];

    pub fn taxon(&self) -> Taxon {
        match self {
            Subgroup::Mammals => Taxon::Mammal,
            Subgroup::Reptiles => Taxon::Reptile,
            Subgroup::Birds | Subgroup::ResidentBirds | Subgroup::NonResidentBirds => Taxon::Bird,
        }
    }

    /// Residency split, `None` for undivided groups
    pub fn residency(&self) -> Option<Residency> {
        match self {
            Subgroup::ResidentBirds => Some(Residency::Resident),
            Subgroup::NonResidentBirds => Some(Residency::NonResident),
            _ => None,
        }
    }

    pub fn file_stem(&self) -> &'static str {
        match self {
            Subgroup::Mammals => "mammals",
            Subgroup::Reptiles => "reptiles",
            Subgroup::Birds => "birds",
            Subgroup::ResidentBirds => "resident_birds",
            Subgroup::NonResidentBirds => "nonresident_birds",
        }
    }

    pub fn contains(&self, species: &Species) -> bool {
        species.taxon == self.taxon()
            && match self.residency() {
                Some(r) => species.residency == Some(r),
                None => true,
            }
    }
}

/// Directed, weighted food web with a stable name → index map
#[derive(Debug, Clone, Default)]
pub struct FoodWeb {
    graph: DiGraph<Species, f64>,
    index: FxHashMap<String, NodeIndex>,
}

impl FoodWeb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a species; names must be unique
    pub fn add_species(&mut self, species: Species) -> Result<NodeIndex, FoodWebError> {
        if self.index.contains_key(&species.name) {
            return Err(FoodWebError::Malformed {
                context: "food web".to_string(),
                detail: format!("duplicate species '{}'", species.name),
            });
        }
        let name = species.name.clone();
        let idx = self.graph.add_node(species);
        self.index.insert(name, idx);
        Ok(idx)
    }

    /// Add a directed interaction. Parallel edges are kept as separate links.
    pub fn add_interaction(&mut self, from: &str, to: &str, weight: f64) -> Result<(), FoodWebError> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(FoodWebError::NegativeWeight {
                from: from.to_string(),
                to: to.to_string(),
                weight,
            });
        }
        let a = self.require(from)?;
        let b = self.require(to)?;
        self.graph.add_edge(a, b, weight);
        Ok(())
    }

    pub fn add_interaction_between(&mut self, a: NodeIndex, b: NodeIndex, weight: f64) {
        self.graph.add_edge(a, b, weight);
    }

    fn require(&self, name: &str) -> Result<NodeIndex, FoodWebError> {
        self.index_of(name)
            .ok_or_else(|| FoodWebError::UnknownNode(name.to_string()))
    }

    pub fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.index.get(name).copied()
    }

    pub fn graph(&self) -> &DiGraph<Species, f64> {
        &self.graph
    }

    pub fn species(&self, idx: NodeIndex) -> &Species {
        &self.graph[idx]
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// All edge weights, in edge-index order
    pub fn weights(&self) -> Vec<f64> {
        self.graph.edge_weights().copied().collect()
    }

    /// Sum of incoming edge weights
    pub fn in_strength(&self, idx: NodeIndex) -> f64 {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| *e.weight())
            .sum()
    }

    /// Indices of the subgroup's members, in node order
    pub fn subgroup_indices(&self, subgroup: Subgroup) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&idx| subgroup.contains(&self.graph[idx]))
            .collect()
    }

    /// Same nodes, every edge flipped
    pub fn reversed(&self) -> FoodWeb {
        let mut web = FoodWeb::new();
        for idx in self.graph.node_indices() {
            let added = web.graph.add_node(self.graph[idx].clone());
            web.index.insert(self.graph[idx].name.clone(), added);
        }
        for edge in self.graph.edge_references() {
            web.graph.add_edge(edge.target(), edge.source(), *edge.weight());
        }
        web
    }

    /// Empty web with the same nodes (same index order)
    pub fn nodes_only(&self) -> FoodWeb {
        let mut web = FoodWeb::new();
        for idx in self.graph.node_indices() {
            let added = web.graph.add_node(self.graph[idx].clone());
            web.index.insert(self.graph[idx].name.clone(), added);
        }
        web
    }

    pub fn taxon_counts(&self) -> [usize; 4] {
        let mut counts = [0usize; 4];
        for species in self.graph.node_weights() {
            counts[species.taxon.index()] += 1;
        }
        counts
    }
}
