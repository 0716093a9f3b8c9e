use serde::{Deserialize, Serialize};
use std::fmt;

use crate::annealing::AnnealingConfig;
use crate::cost::CostConfig;
use crate::types::{PackError, Result};

/// How orderings are searched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Simulated annealing over orderings, optionally restarted
    #[default]
    Annealing,
    /// Evaluate the input order once
    InputOrder,
    /// Evaluate the boxes sorted by volume, largest first
    LargestFirst,
    /// Keep the best of random orderings with random orientations
    RandomSearch,
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SearchStrategy::Annealing => "annealing",
            SearchStrategy::InputOrder => "input_order",
            SearchStrategy::LargestFirst => "largest_first",
            SearchStrategy::RandomSearch => "random_search",
        };
        f.write_str(name)
    }
}

/// Everything that tunes a packing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackingConfig {
    pub strategy: SearchStrategy,
    /// Independent runs; the cheapest one wins
    pub restarts: usize,
    /// Orderings drawn by the random-search baseline
    pub baseline_samples: usize,
    /// Base seed; restart `i` uses `seed + i`. Drawn at random when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub annealing: AnnealingConfig,
    pub cost: CostConfig,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            strategy: SearchStrategy::Annealing,
            restarts: 1,
            baseline_samples: 100,
            seed: None,
            annealing: AnnealingConfig::default(),
            cost: CostConfig::default(),
        }
    }
}

impl PackingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.restarts == 0 {
            return Err(PackError::InvalidConfig(
                "At least one restart is required".to_string(),
            ));
        }

        if self.strategy == SearchStrategy::RandomSearch && self.baseline_samples == 0 {
            return Err(PackError::InvalidConfig(
                "Random search needs at least one sample".to_string(),
            ));
        }

        self.annealing.validate()?;
        self.cost.validate()
    }
}
