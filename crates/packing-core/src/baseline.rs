//! Non-annealing reference strategies.

use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Ordering;

use crate::cost::{CostEvaluator, OrientationPolicy, Solution};
use crate::model::{Container, Orientation, PackBox};

/// Evaluates the boxes exactly in the given order.
pub fn input_order(
    boxes: &[PackBox],
    container: &Container,
    evaluator: &CostEvaluator,
) -> Solution {
    evaluator.evaluate(boxes.to_vec(), container)
}

/// Evaluates the boxes sorted by volume, largest first. Ties keep input order.
pub fn largest_first(
    boxes: &[PackBox],
    container: &Container,
    evaluator: &CostEvaluator,
) -> Solution {
    let mut order = boxes.to_vec();
    order.sort_by(|a, b| b.volume().partial_cmp(&a.volume()).unwrap_or(Ordering::Equal));
    evaluator.evaluate(order, container)
}

/// Draws `samples` random orderings, each box in a random orientation, and
/// keeps the cheapest. Orientations are not revised during placement.
pub fn random_search<R: Rng>(
    boxes: &[PackBox],
    container: &Container,
    evaluator: &CostEvaluator,
    samples: usize,
    rng: &mut R,
) -> Solution {
    let fixed = evaluator.with_orientation(OrientationPolicy::Fixed);
    let mut best: Option<Solution> = None;

    for _ in 0..samples.max(1) {
        let mut order = boxes.to_vec();
        order.shuffle(rng);
        for bx in &mut order {
            if let Some(orientation) = Orientation::ALL.choose(rng) {
                bx.set_orientation(*orientation);
            }
        }

        let candidate = fixed.evaluate(order, container);
        match &best {
            Some(current) if current.cost <= candidate.cost => {}
            _ => best = Some(candidate),
        }
    }

    best.unwrap_or_else(|| fixed.evaluate(boxes.to_vec(), container))
}
