//! Simulated annealing over box orderings.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cost::{CostEvaluator, Solution};
use crate::model::{Container, PackBox};
use crate::types::{PackError, Result};

/// Neighbourhood move applied to the current ordering.
///
/// `Swap` and `Relocate` stay close to the current ordering. `Shuffle`
/// discards it entirely, which mostly lands on infeasible orderings once the
/// container is tight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Perturbation {
    /// Exchange two random positions.
    #[default]
    Swap,
    /// Take one box out and reinsert it at another position.
    Relocate,
    /// Reshuffle the whole ordering.
    Shuffle,
}

impl Perturbation {
    /// Applies the move in place. Orderings with fewer than two boxes are left alone.
    pub fn apply<T, R: Rng>(self, order: &mut [T], rng: &mut R) {
        let len = order.len();
        if len < 2 {
            return;
        }

        match self {
            Perturbation::Swap => {
                let picked = rand::seq::index::sample(rng, len, 2);
                order.swap(picked.index(0), picked.index(1));
            }
            Perturbation::Relocate => {
                let from = rng.gen_range(0..len);
                let to = rng.gen_range(0..len - 1);
                let to = if to >= from { to + 1 } else { to };
                if from < to {
                    order[from..=to].rotate_left(1);
                } else {
                    order[to..=from].rotate_right(1);
                }
            }
            Perturbation::Shuffle => order.shuffle(rng),
        }
    }
}

/// Annealing schedule and stop conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealingConfig {
    pub initial_temperature: f64,
    /// Multiplier applied to the temperature after every iteration
    pub cooling_rate: f64,
    /// The search stops once the temperature drops to this value
    pub min_temperature: f64,
    pub max_iterations: usize,
    pub perturbation: Perturbation,
    /// Keep one [`IterationRecord`] per iteration
    pub record_history: bool,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 1000.0,
            cooling_rate: 0.98,
            min_temperature: 1.0,
            max_iterations: 10_000,
            perturbation: Perturbation::Swap,
            record_history: false,
        }
    }
}

impl AnnealingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.cooling_rate > 0.0 && self.cooling_rate < 1.0) {
            return Err(PackError::InvalidConfig(format!(
                "Cooling rate must be in (0, 1), got: {}",
                self.cooling_rate
            )));
        }

        if !self.min_temperature.is_finite() || self.min_temperature <= 0.0 {
            return Err(PackError::InvalidConfig(format!(
                "Minimum temperature must be positive, got: {}",
                self.min_temperature
            )));
        }

        if !self.initial_temperature.is_finite()
            || self.initial_temperature <= self.min_temperature
        {
            return Err(PackError::InvalidConfig(format!(
                "Initial temperature must exceed the minimum temperature ({}), got: {}",
                self.min_temperature, self.initial_temperature
            )));
        }

        Ok(())
    }
}

/// What happened in one iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub temperature: f64,
    pub candidate_cost: f64,
    pub accepted: bool,
    pub best_cost: f64,
}

/// Counters of a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnealingStats {
    pub iterations: usize,
    pub accepted: usize,
    /// Iterations that lowered the best cost
    pub improvements: usize,
    pub initial_cost: f64,
    pub final_temperature: f64,
}

#[derive(Debug, Clone)]
pub struct AnnealOutcome {
    pub best: Solution,
    pub stats: AnnealingStats,
    pub history: Vec<IterationRecord>,
}

impl AnnealOutcome {
    pub fn cost(&self) -> f64 {
        self.best.cost
    }
}

/// Single annealing run: one ordering, one random source.
#[derive(Debug, Clone)]
pub struct Annealer {
    config: AnnealingConfig,
    evaluator: CostEvaluator,
}

impl Annealer {
    pub fn new(config: AnnealingConfig, evaluator: CostEvaluator) -> Self {
        Self { config, evaluator }
    }

    pub fn config(&self) -> &AnnealingConfig {
        &self.config
    }

    /// Searches orderings starting from `boxes` and returns the best one found.
    ///
    /// `boxes` is only read; every candidate works on its own copies.
    pub fn run<R: Rng>(
        &self,
        boxes: &[PackBox],
        container: &Container,
        rng: &mut R,
    ) -> AnnealOutcome {
        let mut current = self.evaluator.evaluate(boxes.to_vec(), container);
        let mut best = current.clone();
        let mut temperature = self.config.initial_temperature;
        let mut stats = AnnealingStats {
            initial_cost: current.cost,
            ..AnnealingStats::default()
        };
        let mut history = Vec::new();

        while temperature > self.config.min_temperature
            && stats.iterations < self.config.max_iterations
        {
            let mut order = current.boxes.clone();
            self.config.perturbation.apply(&mut order, rng);
            let candidate = self.evaluator.evaluate(order, container);
            let candidate_cost = candidate.cost;

            let accepted = accept(&current, &candidate, temperature, rng);
            if accepted {
                stats.accepted += 1;
                current = candidate;
                if current.ranks_before(&best) {
                    best = current.clone();
                    stats.improvements += 1;
                    debug!(
                        iteration = stats.iterations,
                        temperature,
                        cost = best.cost,
                        "new best ordering"
                    );
                }
            }

            if self.config.record_history {
                history.push(IterationRecord {
                    iteration: stats.iterations,
                    temperature,
                    candidate_cost,
                    accepted,
                    best_cost: best.cost,
                });
            }

            temperature *= self.config.cooling_rate;
            stats.iterations += 1;
        }

        stats.final_temperature = temperature;
        debug!(
            iterations = stats.iterations,
            accepted = stats.accepted,
            best_cost = best.cost,
            "annealing finished"
        );

        AnnealOutcome {
            best,
            stats,
            history,
        }
    }
}

/// Metropolis rule: improvements always pass, worse candidates pass with
/// probability `exp(-(candidate - current) / temperature)`. An incomplete
/// candidate never replaces a complete placement.
fn accept<R: Rng>(
    current: &Solution,
    candidate: &Solution,
    temperature: f64,
    rng: &mut R,
) -> bool {
    if candidate.ranks_before(current) {
        return true;
    }
    let probability = if current.is_feasible() && !candidate.is_feasible() {
        0.0
    } else {
        (-(candidate.cost - current.cost) / temperature).exp()
    };
    rng.gen::<f64>() < probability
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::INFEASIBLE_COST;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn mixed_boxes() -> Vec<PackBox> {
        vec![
            PackBox::new("1", 4.0, 4.0, 1.0, true).unwrap(),
            PackBox::new("2", 4.0, 4.0, 1.0, false).unwrap(),
            PackBox::new("3", 2.0, 2.0, 2.0, false).unwrap(),
            PackBox::new("4", 1.0, 1.0, 1.0, false).unwrap(),
            PackBox::new("5", 2.0, 1.0, 1.0, true).unwrap(),
        ]
    }

    fn annealer(perturbation: Perturbation) -> Annealer {
        Annealer::new(
            AnnealingConfig {
                initial_temperature: 100.0,
                cooling_rate: 0.9,
                min_temperature: 1.0,
                perturbation,
                record_history: true,
                ..AnnealingConfig::default()
            },
            CostEvaluator::default(),
        )
    }

    #[test]
    fn test_perturbations_keep_the_same_boxes() {
        let mut rng = StdRng::seed_from_u64(7);
        for perturbation in [Perturbation::Swap, Perturbation::Relocate, Perturbation::Shuffle] {
            let mut order: Vec<u32> = (0..10).collect();
            for _ in 0..50 {
                perturbation.apply(&mut order, &mut rng);
            }
            let mut sorted = order.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, (0..10).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_swap_changes_exactly_two_positions() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut order: Vec<u32> = (0..8).collect();
        Perturbation::Swap.apply(&mut order, &mut rng);
        let moved = order.iter().enumerate().filter(|(i, v)| *i as u32 != **v).count();
        assert_eq!(moved, 2);
    }

    #[test]
    fn test_relocate_moves_one_box() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut order: Vec<u32> = (0..8).collect();
        Perturbation::Relocate.apply(&mut order, &mut rng);
        assert_ne!(order, (0..8).collect::<Vec<_>>());

        // Removing the relocated value restores the original relative order
        let restored: Vec<u32> = (0..8)
            .filter_map(|removed| {
                let rest: Vec<u32> = order.iter().copied().filter(|v| *v != removed).collect();
                let expected: Vec<u32> = (0..8).filter(|v| *v != removed).collect();
                (rest == expected).then_some(removed)
            })
            .collect();
        assert!(!restored.is_empty());
    }

    #[test]
    fn test_single_box_is_untouched() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut order = vec![42];
        Perturbation::Swap.apply(&mut order, &mut rng);
        Perturbation::Relocate.apply(&mut order, &mut rng);
        assert_eq!(order, vec![42]);
    }

    #[test]
    fn test_best_cost_never_increases() {
        let container = Container::new(4.0, 4.0, 4.0).unwrap();
        let mut rng = StdRng::seed_from_u64(99);
        let outcome = annealer(Perturbation::Swap).run(&mixed_boxes(), &container, &mut rng);

        assert!(!outcome.history.is_empty());
        assert_eq!(outcome.history.len(), outcome.stats.iterations);
        let mut previous = outcome.stats.initial_cost;
        for record in &outcome.history {
            assert!(record.best_cost <= previous);
            previous = record.best_cost;
        }
        assert_eq!(previous, outcome.cost());
        assert!(outcome.cost() <= outcome.stats.initial_cost);
    }

    #[test]
    fn test_same_seed_same_decisions() {
        let container = Container::new(4.0, 4.0, 4.0).unwrap();
        let annealer = annealer(Perturbation::Relocate);

        let first = annealer.run(&mixed_boxes(), &container, &mut StdRng::seed_from_u64(5));
        let second = annealer.run(&mixed_boxes(), &container, &mut StdRng::seed_from_u64(5));

        assert_eq!(first.history, second.history);
        assert_eq!(first.stats, second.stats);
        assert_eq!(first.best.boxes, second.best.boxes);
    }

    #[test]
    fn test_stops_at_iteration_cap() {
        let container = Container::new(4.0, 4.0, 4.0).unwrap();
        let annealer = Annealer::new(
            AnnealingConfig {
                max_iterations: 7,
                ..AnnealingConfig::default()
            },
            CostEvaluator::default(),
        );
        let outcome = annealer.run(&mixed_boxes(), &container, &mut StdRng::seed_from_u64(2));
        assert_eq!(outcome.stats.iterations, 7);
    }

    #[test]
    fn test_stops_when_cold() {
        let container = Container::new(4.0, 4.0, 4.0).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        let outcome = annealer(Perturbation::Swap).run(&mixed_boxes(), &container, &mut rng);
        // 100 * 0.9^n <= 1 first holds for n = 44
        assert_eq!(outcome.stats.iterations, 44);
        assert!(outcome.stats.final_temperature <= 1.0);
    }

    #[test]
    fn test_infeasible_input_still_returns() {
        let container = Container::new(3.0, 3.0, 3.0).unwrap();
        let boxes = vec![
            PackBox::new("big", 5.0, 5.0, 5.0, false).unwrap(),
            PackBox::new("a", 1.0, 1.0, 1.0, false).unwrap(),
        ];
        let mut rng = StdRng::seed_from_u64(8);
        let outcome = annealer(Perturbation::Swap).run(&boxes, &container, &mut rng);
        assert_eq!(outcome.cost(), INFEASIBLE_COST);
        assert_eq!(outcome.best.boxes.len(), 2);
    }

    fn scored(cost: f64, complete: bool) -> Solution {
        let bx = PackBox::new("a", 1.0, 1.0, 1.0, false).unwrap();
        Solution {
            boxes: vec![bx],
            placed: usize::from(complete),
            cost,
            breakdown: Default::default(),
        }
    }

    #[test]
    fn test_metropolis_rule() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(accept(&scored(10.0, true), &scored(5.0, true), 1.0, &mut rng));
        assert!((0..100).all(|_| {
            !accept(&scored(0.0, true), &scored(INFEASIBLE_COST, false), 1000.0, &mut rng)
        }));
        assert!((0..100).all(|_| accept(&scored(3.0, true), &scored(3.0, true), 1.0, &mut rng)));
    }

    #[test]
    fn test_incomplete_candidate_never_replaces_complete_one() {
        let mut rng = StdRng::seed_from_u64(6);
        let expensive = scored(5e12, true);
        let incomplete = scored(INFEASIBLE_COST, false);

        assert!((0..100).all(|_| !accept(&expensive, &incomplete, 1e13, &mut rng)));
        assert!(accept(&incomplete, &expensive, 1.0, &mut rng));
    }

    #[test]
    fn test_config_validation() {
        assert!(AnnealingConfig::default().validate().is_ok());
        let bad = AnnealingConfig {
            cooling_rate: 1.0,
            ..AnnealingConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = AnnealingConfig {
            initial_temperature: 0.5,
            ..AnnealingConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
