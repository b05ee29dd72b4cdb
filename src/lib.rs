//! Food Web Cascades
//!
//! Extinction-cascade simulation and motif analysis over an empirical food
//! web.
//!
//! Layout:
//! - `graph`: species attributes and the directed weighted `FoodWeb`
//! - `data`: CSV input loading with Polars
//! - `cascade/`: secondary-extinction simulator and the threshold × iteration sweep
//! - `homophily`: taxonomic assortativity of the trophic web
//! - `motifs/`: G(n, m) null models, shared-prey and linear-chain motifs
//! - `significance`: z-scores of observed motif counts against null trials
//! - `pipeline`: stages wired together for the binaries
//! - `utils/`: record persistence, statistics, seeding

pub mod cascade;
pub mod config;
pub mod data;
pub mod error;
pub mod graph;
pub mod homophily;
pub mod motifs;
pub mod pipeline;
pub mod significance;
pub mod utils;

// Re-export commonly used types
pub use cascade::{simulate_extinctions, CascadeRun, CascadeStep, CascadeSweep};
pub use config::RunConfig;
pub use data::FoodWebData;
pub use error::FoodWebError;
pub use graph::{FoodWeb, Residency, Species, Subgroup, Taxon};
pub use homophily::{homophily_index, HomophilyReport};
pub use significance::{score_category, ZScoreRecord};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the `tracing` subscriber used by the binaries
///
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "food_web_cascades=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
