use crate::annealing::{AnnealingStats, Annealer};
use crate::baseline;
use crate::config::SearchStrategy;
use crate::cost::{CostEvaluator, Solution};
use crate::model::{Container, IdSequence, PackBox};
use crate::restart::run_restarts;
use crate::types::*;
use tracing::info;

mod summary;
#[cfg(test)]
mod tests;

/// Searches box orderings for a low-cost placement inside one container.
pub struct Packer {
    request: PackingRequest,
    container: Container,
}

impl Packer {
    /// Validates requests and builds a new packer instance.
    ///
    /// An empty box list is accepted and packs into an empty layout.
    pub fn new(request: PackingRequest) -> Result<Self> {
        let container = request.container.build()?;
        request.config.validate()?;

        // Surface bad records before any search starts
        build_boxes(&request.boxes, &mut IdSequence::new())?;

        Ok(Self { request, container })
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Runs the configured strategy and returns the best placement found.
    pub fn pack(&self) -> Result<PackingResult> {
        let config = &self.request.config;
        let boxes = build_boxes(&self.request.boxes, &mut IdSequence::new())?;
        let evaluator = CostEvaluator::new(config.cost.clone());
        let seed = config.seed.unwrap_or_else(rand::random);

        let (best, restart_costs, stats) = match config.strategy {
            SearchStrategy::Annealing => self.anneal(&boxes, evaluator, seed),
            SearchStrategy::InputOrder => {
                let best = baseline::input_order(&boxes, &self.container, &evaluator);
                (best, Vec::new(), None)
            }
            SearchStrategy::LargestFirst => {
                let best = baseline::largest_first(&boxes, &self.container, &evaluator);
                (best, Vec::new(), None)
            }
            SearchStrategy::RandomSearch => {
                let outcome = run_restarts(config.restarts, seed, |_, rng| {
                    baseline::random_search(
                        &boxes,
                        &self.container,
                        &evaluator,
                        config.baseline_samples,
                        rng,
                    )
                });
                (outcome.best, outcome.costs, None)
            }
        };

        let summary = self.calculate_summary(&best);
        info!(
            strategy = %config.strategy,
            cost = best.cost,
            placed = summary.placed_boxes,
            total = summary.total_boxes,
            "packing complete"
        );

        Ok(PackingResult {
            strategy: config.strategy,
            seed,
            cost: best.cost,
            feasible: best.is_feasible(),
            placements: best.placements(),
            breakdown: best.breakdown,
            summary,
            restart_costs,
            stats,
        })
    }

    /// Runs every restart of the annealer and keeps the cheapest outcome.
    fn anneal(
        &self,
        boxes: &[PackBox],
        evaluator: CostEvaluator,
        seed: u64,
    ) -> (Solution, Vec<f64>, Option<AnnealingStats>) {
        let config = &self.request.config;
        let annealer = Annealer::new(config.annealing.clone(), evaluator);
        let outcome = run_restarts(config.restarts, seed, |restart, rng| {
            let run = annealer.run(boxes, &self.container, rng);
            tracing::debug!(restart, cost = run.cost(), "restart finished");
            run
        });

        let stats = outcome.best.stats;
        (outcome.best.best, outcome.costs, Some(stats))
    }
}
