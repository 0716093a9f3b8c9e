//! Independent restarts run in parallel, keeping the cheapest result.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::warn;

use crate::annealing::AnnealOutcome;
use crate::cost::{is_feasible, Solution};

/// Anything that carries a final cost.
pub trait Scored {
    fn cost(&self) -> f64;

    /// Whether the outcome placed every box.
    fn is_complete(&self) -> bool {
        is_feasible(self.cost())
    }

    /// Complete outcomes rank ahead of incomplete ones; cost breaks ties.
    fn ranks_before(&self, other: &Self) -> bool {
        match (self.is_complete(), other.is_complete()) {
            (true, false) => true,
            (false, true) => false,
            _ => self.cost() < other.cost(),
        }
    }
}

impl Scored for Solution {
    fn cost(&self) -> f64 {
        self.cost
    }

    fn is_complete(&self) -> bool {
        self.is_feasible()
    }
}

impl Scored for AnnealOutcome {
    fn cost(&self) -> f64 {
        self.best.cost
    }

    fn is_complete(&self) -> bool {
        self.best.is_feasible()
    }
}

#[derive(Debug, Clone)]
pub struct RestartOutcome<T> {
    pub best: T,
    /// Index of the restart that produced `best`
    pub best_restart: usize,
    /// Cost of every restart, in restart order
    pub costs: Vec<f64>,
}

/// Runs `restarts` independent searches.
///
/// Restart `i` gets its own `StdRng` seeded with `base_seed + i`, so the
/// outcome only depends on `base_seed`. Complete outcomes win over incomplete
/// ones, then the lowest cost; ties go to the lowest restart index.
pub fn run_restarts<T, F>(restarts: usize, base_seed: u64, search: F) -> RestartOutcome<T>
where
    T: Scored + Send,
    F: Fn(usize, &mut StdRng) -> T + Sync,
{
    let mut outcomes: Vec<T> = (0..restarts.max(1))
        .into_par_iter()
        .map(|restart| {
            let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(restart as u64));
            search(restart, &mut rng)
        })
        .collect();

    let costs: Vec<f64> = outcomes.iter().map(Scored::cost).collect();
    let mut best_restart = 0;
    for (restart, outcome) in outcomes.iter().enumerate() {
        if !outcome.is_complete() {
            warn!(restart, "restart ended without a complete placement");
        }
        if outcome.ranks_before(&outcomes[best_restart]) {
            best_restart = restart;
        }
    }

    let best = outcomes.swap_remove(best_restart);

    RestartOutcome {
        best,
        best_restart,
        costs,
    }
}
