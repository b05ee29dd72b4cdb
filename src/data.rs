//! Data Loading
//!
//! Loads the weighted adjacency matrix, species attribute tables, resident
//! code list, and the unweighted trophic node/edge lists with Polars, then
//! joins attributes onto graph nodes.
//!
//! Conventions:
//! - Adjacency matrix rows are prey (sources), columns are consumers
//!   (sinks). Non-zero cells become prey → consumer edges.
//! - The trophic edge list is stored predator → prey and is kept that way.

use crate::config::RunConfig;
use crate::error::FoodWebError;
use crate::graph::{FoodWeb, Residency, Species, Taxon};
use crate::utils::records::{f64_column, read_csv, require_columns, string_column};
use anyhow::{Context, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::Path;

/// Per-species attributes joined onto graph nodes
#[derive(Debug, Clone, Default)]
pub struct AttributeTable {
    /// name → (class, trophic level)
    vertex: FxHashMap<String, (String, Option<f64>)>,
    /// name → (scientific name, order)
    order: FxHashMap<String, (Option<String>, Option<String>)>,
    resident_codes: FxHashSet<String>,
}

impl AttributeTable {
    pub fn new(
        vertex: FxHashMap<String, (String, Option<f64>)>,
        order: FxHashMap<String, (Option<String>, Option<String>)>,
        resident_codes: FxHashSet<String>,
    ) -> Self {
        Self { vertex, order, resident_codes }
    }

    /// Build the species record for a node name
    ///
    /// # Errors
    /// `FoodWebError::MissingAttributes` when the vertex table has no row
    /// for the name.
    pub fn species(&self, name: &str) -> Result<Species, FoodWebError> {
        let (class, trophic_level) = self
            .vertex
            .get(name)
            .ok_or_else(|| FoodWebError::MissingAttributes(name.to_string()))?;

        let mut species = Species::new(name, Taxon::from_class(class));
        species.trophic_level = *trophic_level;

        if let Some((scientific_name, order)) = self.order.get(name) {
            species.scientific_name = scientific_name.clone();
            species.order = order.clone();
        }

        if species.taxon == Taxon::Bird {
            let residency = if self.resident_codes.contains(&species.code()) {
                Residency::Resident
            } else {
                Residency::NonResident
            };
            species = species.with_residency(residency);
        }

        Ok(species)
    }

    /// Species record using an explicit taxon label, trophic level joined
    /// from the vertex table when present
    pub fn species_with_taxon(&self, name: &str, taxon: &str) -> Species {
        let mut species = Species::new(name, Taxon::from_class(taxon));
        species.trophic_level = self.vertex.get(name).and_then(|(_, level)| *level);
        if let Some((scientific_name, order)) = self.order.get(name) {
            species.scientific_name = scientific_name.clone();
            species.order = order.clone();
        }
        species
    }
}

/// All analysis inputs
pub struct FoodWebData {
    /// Weighted web, prey → consumer
    pub food_web: FoodWeb,

    /// Unweighted web, predator → prey
    pub trophic_web: FoodWeb,

    pub attributes: AttributeTable,
}

impl FoodWebData {
    /// Load every input table named in the config
    pub fn load(config: &RunConfig) -> Result<Self> {
        tracing::info!("Loading food web inputs from {:?}", config.data_dir);

        let files = &config.inputs;
        let vertex = load_vertex_attributes(&config.input_path(&files.vertex_attributes))?;
        let order = load_species_order(&config.input_path(&files.species_order))?;
        let resident_codes = load_resident_codes(&config.input_path(&files.resident_codes))?;
        let attributes = AttributeTable::new(vertex, order, resident_codes);

        let (names, edges) = load_adjacency_matrix(&config.input_path(&files.adjacency_matrix))?;
        let food_web = build_food_web(&names, &edges, &attributes)?;

        let trophic_web = load_trophic_web(
            &config.input_path(&files.trophic_nodes),
            &config.input_path(&files.trophic_edges),
            &attributes,
        )?;

        let counts = food_web.taxon_counts();
        tracing::info!(
            "  Food web: {} nodes, {} edges (birds {}, mammals {}, reptiles {}, other {})",
            food_web.node_count(),
            food_web.edge_count(),
            counts[0],
            counts[1],
            counts[2],
            counts[3]
        );
        tracing::info!(
            "  Trophic web: {} nodes, {} edges",
            trophic_web.node_count(),
            trophic_web.edge_count()
        );

        Ok(Self { food_web, trophic_web, attributes })
    }
}

/// Build the weighted web from matrix node names and weighted edges
pub fn build_food_web(
    names: &[String],
    edges: &[(String, String, f64)],
    attributes: &AttributeTable,
) -> Result<FoodWeb> {
    let mut web = FoodWeb::new();
    for name in names {
        web.add_species(attributes.species(name)?)?;
    }
    for (from, to, weight) in edges {
        web.add_interaction(from, to, *weight)?;
    }
    Ok(web)
}

/// Load the weighted adjacency matrix
///
/// The first column holds row names; every other header is a consumer.
/// Returns the node names (rows first, then any column-only names) and
/// the non-zero prey → consumer edges.
pub fn load_adjacency_matrix(path: &Path) -> Result<(Vec<String>, Vec<(String, String, f64)>)> {
    let df = read_csv(path)?;
    let context = format!("adjacency matrix {:?}", path);

    let header: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    let Some((row_header, consumers)) = header.split_first() else {
        return Err(FoodWebError::Malformed {
            context,
            detail: "no columns".to_string(),
        }
        .into());
    };

    let rows: Vec<String> = string_column(&df, row_header, &context)?
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            name.filter(|n| !n.is_empty()).ok_or_else(|| FoodWebError::Malformed {
                context: context.clone(),
                detail: format!("row {} has no species name", i + 1),
            })
        })
        .collect::<Result<_, _>>()?;

    let mut names = rows.clone();
    let mut seen: FxHashSet<&str> = rows.iter().map(|s| s.as_str()).collect();
    for consumer in consumers {
        if seen.insert(consumer.as_str()) {
            names.push(consumer.clone());
        }
    }

    let mut edges = Vec::new();
    for consumer in consumers {
        let weights = f64_column(&df, consumer, &context)?;
        for (prey, weight) in rows.iter().zip(weights) {
            match weight {
                Some(w) if w < 0.0 || !w.is_finite() => {
                    return Err(FoodWebError::NegativeWeight {
                        from: prey.clone(),
                        to: consumer.clone(),
                        weight: w,
                    }
                    .into());
                }
                Some(w) if w > 0.0 => edges.push((prey.clone(), consumer.clone(), w)),
                _ => {}
            }
        }
    }

    Ok((names, edges))
}

/// Load `name,class,trophic_level`
pub fn load_vertex_attributes(path: &Path) -> Result<FxHashMap<String, (String, Option<f64>)>> {
    let df = read_csv(path)?;
    let context = format!("vertex attributes {:?}", path);
    require_columns(&df, &["name", "class", "trophic_level"], &context)?;

    let names = string_column(&df, "name", &context)?;
    let classes = string_column(&df, "class", &context)?;
    let levels = f64_column(&df, "trophic_level", &context)?;

    let mut map = FxHashMap::default();
    for ((name, class), level) in names.into_iter().zip(classes).zip(levels) {
        if let Some(name) = name {
            map.insert(name, (class.unwrap_or_default(), level));
        }
    }

    Ok(map)
}

/// Load `name,scientific_name,order`
pub fn load_species_order(
    path: &Path,
) -> Result<FxHashMap<String, (Option<String>, Option<String>)>> {
    let df = read_csv(path)?;
    let context = format!("species order {:?}", path);
    require_columns(&df, &["name", "scientific_name", "order"], &context)?;

    let names = string_column(&df, "name", &context)?;
    let scientific = string_column(&df, "scientific_name", &context)?;
    let orders = string_column(&df, "order", &context)?;

    let mut map = FxHashMap::default();
    for ((name, sci), order) in names.into_iter().zip(scientific).zip(orders) {
        if let Some(name) = name {
            map.insert(name, (sci.filter(|s| !s.is_empty()), order.filter(|s| !s.is_empty())));
        }
    }

    Ok(map)
}

/// Load the `code` column of year-round resident six-letter codes
pub fn load_resident_codes(path: &Path) -> Result<FxHashSet<String>> {
    let df = read_csv(path)?;
    let context = format!("resident codes {:?}", path);

    Ok(string_column(&df, "code", &context)?
        .into_iter()
        .flatten()
        .filter(|c| !c.is_empty())
        .map(|c| c.to_uppercase())
        .collect())
}

/// Load the unweighted trophic web (`name,taxon` + `from,to`)
///
/// Duplicate edges in the list collapse to one link.
pub fn load_trophic_web(nodes_path: &Path, edges_path: &Path, attributes: &AttributeTable) -> Result<FoodWeb> {
    let nodes = read_csv(nodes_path)?;
    let node_context = format!("trophic nodes {:?}", nodes_path);
    let names = string_column(&nodes, "name", &node_context)?;
    let taxa = string_column(&nodes, "taxon", &node_context)?;

    let mut web = FoodWeb::new();
    for (name, taxon) in names.into_iter().zip(taxa) {
        let Some(name) = name else { continue };
        let species = attributes.species_with_taxon(&name, taxon.as_deref().unwrap_or(""));
        web.add_species(species)
            .with_context(|| format!("{}: node '{}'", node_context, name))?;
    }

    let edges = read_csv(edges_path)?;
    let edge_context = format!("trophic edges {:?}", edges_path);
    let from = string_column(&edges, "from", &edge_context)?;
    let to = string_column(&edges, "to", &edge_context)?;

    let mut seen: FxHashSet<(String, String)> = FxHashSet::default();
    for (a, b) in from.into_iter().zip(to) {
        let (Some(a), Some(b)) = (a, b) else { continue };
        if seen.insert((a.clone(), b.clone())) {
            web.add_interaction(&a, &b, 1.0)
                .with_context(|| format!("{}: edge {} -> {}", edge_context, a, b))?;
        }
    }

    Ok(web)
}
