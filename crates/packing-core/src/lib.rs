//! Container packing engine.
//!
//! An ordering of boxes is turned into concrete positions by a first-fit
//! lattice search ([`placement`]), scored by a multi-term cost
//! ([`cost`]), and improved by simulated annealing over orderings
//! ([`annealing`]). [`Packer`] ties these together behind a
//! request/result API.

pub mod annealing;
pub mod baseline;
pub mod config;
pub mod cost;
pub mod model;
pub mod placement;
pub mod restart;
pub mod validate;

mod packer;
mod types;

pub use annealing::{AnnealOutcome, Annealer, AnnealingConfig, AnnealingStats, Perturbation};
pub use config::{PackingConfig, SearchStrategy};
pub use cost::{
    is_feasible, CostBreakdown, CostConfig, CostEvaluator, CostModel, CostWeights,
    OrientationPolicy, Solution, INFEASIBLE_COST,
};
pub use model::{Container, Dimensions, IdSequence, Orientation, PackBox, Position};
pub use packer::Packer;
pub use types::*;
pub use validate::{validate_layout, LayoutMetrics, ValidationReport};
