//! Ordering-driven placement and packing cost.
//!
//! Scoring an ordering is also what places it: [`CostEvaluator::evaluate`]
//! takes the boxes by value, rotates and positions each one, and hands them
//! back inside the [`Solution`]. Clone the boxes first if an earlier
//! placement must survive.

use serde::{Deserialize, Serialize};

use crate::model::{Container, Orientation, PackBox, EPSILON};
use crate::placement::{find_position, footprint_overlap};
use crate::types::{PackError, PlacementRecord, Result};

/// Cost reported for an ordering in which some box cannot be placed at all.
///
/// Finite so infeasible orderings still compare against feasible ones.
pub const INFEASIBLE_COST: f64 = 1e12;

/// True when `cost` is below the sentinel.
///
/// Heavily weighted complete placements can exceed the sentinel, so a
/// [`Solution`] is judged by [`Solution::is_feasible`] instead.
pub fn is_feasible(cost: f64) -> bool {
    cost < INFEASIBLE_COST
}

/// Which version of the cost function to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostModel {
    /// Centroid, fragile, unused volume, height, positional bias and small-box edge terms.
    /// Only boxes at or above the small-volume threshold resting directly on a
    /// fragile box are penalized.
    #[default]
    Standard,
    /// Centroid, fragile, unused volume and height only. Any box above a fragile
    /// box with overlapping footprint is penalized, whatever its size.
    Classic,
}

/// How the evaluator picks an orientation for each box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrientationPolicy {
    /// Try orientations 0..6 in order and keep the first that fits.
    #[default]
    FirstFit,
    /// Keep the orientation each box already has.
    Fixed,
}

/// Weights of the cost terms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostWeights {
    pub centroid: f64,
    pub fragile: f64,
    pub unused_volume: f64,
    pub height: f64,
    pub position: f64,
    pub edge: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            centroid: 1.0,
            fragile: 1.0,
            unused_volume: 1.0,
            height: 1.0,
            position: 0.5,
            edge: 1.0,
        }
    }
}

impl CostWeights {
    fn combine(&self, terms: &CostBreakdown) -> f64 {
        self.centroid * terms.centroid_deviation
            + self.fragile * terms.fragile_penalty
            + self.unused_volume * terms.unused_volume
            + self.height * terms.height_penalty
            + self.position * terms.position_bias
            + self.edge * terms.edge_penalty
    }

    fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [
            ("centroid", self.centroid),
            ("fragile", self.fragile),
            ("unused_volume", self.unused_volume),
            ("height", self.height),
            ("position", self.position),
            ("edge", self.edge),
        ]
        .into_iter()
    }
}

/// Cost function settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    pub model: CostModel,
    pub orientation: OrientationPolicy,
    pub weights: CostWeights,
    /// Added once per fragile box with something stacked on it
    pub fragile_penalty: f64,
    /// Added once per small box touching or close to a container face
    pub edge_penalty: f64,
    /// Boxes below this volume count as small
    pub small_volume_threshold: f64,
    /// Distance to a face that still counts as touching it
    pub edge_margin: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            model: CostModel::Standard,
            orientation: OrientationPolicy::FirstFit,
            weights: CostWeights::default(),
            fragile_penalty: 1e6,
            edge_penalty: 1e3,
            small_volume_threshold: 10.0,
            edge_margin: 1.0,
        }
    }
}

impl CostConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in self.weights.iter() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(PackError::InvalidConfig(format!(
                    "Cost weight '{}' must be finite and non-negative, got: {}",
                    name, weight
                )));
            }
        }

        let scalars = [
            ("fragile_penalty", self.fragile_penalty),
            ("edge_penalty", self.edge_penalty),
            ("small_volume_threshold", self.small_volume_threshold),
            ("edge_margin", self.edge_margin),
        ];
        for (name, value) in scalars {
            if !value.is_finite() || value < 0.0 {
                return Err(PackError::InvalidConfig(format!(
                    "'{}' must be finite and non-negative, got: {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

/// Raw value of every cost term, before weighting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Distance between the mean box centre and the container centre
    pub centroid_deviation: f64,
    pub fragile_penalty: f64,
    /// Fraction of the container volume left empty
    pub unused_volume: f64,
    /// Highest reached `z` divided by the container depth
    pub height_penalty: f64,
    /// Sum of the placed boxes' origin coordinates
    pub position_bias: f64,
    pub edge_penalty: f64,
    pub fragile_violations: usize,
    pub small_boxes_on_edges: usize,
}

/// An ordering after evaluation.
///
/// `boxes` always holds the whole ordering. The first `placed` boxes carry
/// their final orientation and position; when the ordering is infeasible the
/// rest were never placed.
#[derive(Debug, Clone)]
pub struct Solution {
    pub boxes: Vec<PackBox>,
    pub placed: usize,
    pub cost: f64,
    pub breakdown: CostBreakdown,
}

impl Solution {
    /// Every box of the ordering was placed.
    pub fn is_feasible(&self) -> bool {
        self.placed == self.boxes.len()
    }

    /// Complete placements rank ahead of incomplete ones; cost breaks ties.
    pub fn ranks_before(&self, other: &Solution) -> bool {
        match (self.is_feasible(), other.is_feasible()) {
            (true, false) => true,
            (false, true) => false,
            _ => self.cost < other.cost,
        }
    }

    pub fn placed_boxes(&self) -> &[PackBox] {
        &self.boxes[..self.placed]
    }

    /// Output rows for the placed boxes, numbered from 1 in placement order.
    pub fn placements(&self) -> Vec<PlacementRecord> {
        self.placed_boxes()
            .iter()
            .enumerate()
            .map(|(idx, bx)| PlacementRecord::from_box(bx, idx + 1))
            .collect()
    }

    pub fn used_volume(&self) -> f64 {
        self.placed_boxes().iter().map(PackBox::volume).sum()
    }
}

/// Places orderings box by box and scores the result.
#[derive(Debug, Clone, Default)]
pub struct CostEvaluator {
    config: CostConfig,
}

impl CostEvaluator {
    pub fn new(config: CostConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CostConfig {
        &self.config
    }

    /// Same settings with a different orientation policy.
    pub fn with_orientation(&self, orientation: OrientationPolicy) -> Self {
        Self {
            config: CostConfig {
                orientation,
                ..self.config.clone()
            },
        }
    }

    /// Places `order` front to back and returns the scored solution.
    ///
    /// Stops at the first box that fits in no orientation and reports
    /// [`INFEASIBLE_COST`].
    pub fn evaluate(&self, order: Vec<PackBox>, container: &Container) -> Solution {
        let mut placed: Vec<PackBox> = Vec::with_capacity(order.len());
        let mut terms = TermAccumulator::default();
        let mut remaining = order.into_iter();

        while let Some(mut bx) = remaining.next() {
            if !self.place(&mut bx, &placed, container) {
                let placed_count = placed.len();
                placed.push(bx);
                placed.extend(remaining);
                return Solution {
                    boxes: placed,
                    placed: placed_count,
                    cost: INFEASIBLE_COST,
                    breakdown: CostBreakdown::default(),
                };
            }

            terms.record(&bx, &placed, container, &self.config);
            placed.push(bx);
        }

        let breakdown = terms.finish(container, &self.config);
        Solution {
            placed: placed.len(),
            boxes: placed,
            cost: self.config.weights.combine(&breakdown),
            breakdown,
        }
    }

    fn place(&self, bx: &mut PackBox, placed: &[PackBox], container: &Container) -> bool {
        match self.config.orientation {
            OrientationPolicy::FirstFit => Orientation::ALL.iter().any(|&orientation| {
                bx.set_orientation(orientation);
                find_position(bx, placed, container)
            }),
            OrientationPolicy::Fixed => find_position(bx, placed, container),
        }
    }
}

/// `upper` sits directly on `lower`'s top face with some shared footprint.
fn rests_on(upper: &PackBox, lower: &PackBox) -> bool {
    (upper.position.z - lower.max_corner().z).abs() <= EPSILON
        && footprint_overlap(upper, lower) > EPSILON
}

/// `upper` is somewhere above `lower` with some shared footprint.
fn is_above(upper: &PackBox, lower: &PackBox) -> bool {
    upper.position.z >= lower.max_corner().z - EPSILON && footprint_overlap(upper, lower) > EPSILON
}

fn near_face(bx: &PackBox, container: &Container, margin: f64) -> bool {
    let min = bx.position;
    let max = bx.max_corner();
    let gaps = [
        min.x,
        min.y,
        min.z,
        container.width() - max.x,
        container.height() - max.y,
        container.depth() - max.z,
    ];
    gaps.iter().any(|gap| *gap <= margin + EPSILON)
}

#[derive(Debug, Default)]
struct TermAccumulator {
    count: usize,
    center_sum: (f64, f64, f64),
    volume: f64,
    max_extent: f64,
    fragile_violations: usize,
    position_bias: f64,
    small_boxes_on_edges: usize,
}

impl TermAccumulator {
    fn record(
        &mut self,
        bx: &PackBox,
        placed: &[PackBox],
        container: &Container,
        config: &CostConfig,
    ) {
        let center = bx.center();
        self.count += 1;
        self.center_sum.0 += center.x;
        self.center_sum.1 += center.y;
        self.center_sum.2 += center.z;
        self.volume += bx.volume();
        self.max_extent = self.max_extent.max(bx.max_corner().z);

        let threshold = config.small_volume_threshold;
        for other in placed {
            let violation = match config.model {
                CostModel::Standard => {
                    (other.is_fragile && bx.volume() >= threshold && rests_on(bx, other))
                        || (bx.is_fragile && other.volume() >= threshold && rests_on(other, bx))
                }
                CostModel::Classic => {
                    (other.is_fragile && is_above(bx, other))
                        || (bx.is_fragile && is_above(other, bx))
                }
            };
            if violation {
                self.fragile_violations += 1;
            }
        }

        if config.model == CostModel::Standard {
            self.position_bias += bx.position.x + bx.position.y + bx.position.z;
            if bx.volume() < threshold && near_face(bx, container, config.edge_margin) {
                self.small_boxes_on_edges += 1;
            }
        }
    }

    fn finish(self, container: &Container, config: &CostConfig) -> CostBreakdown {
        let centroid_deviation = if self.count == 0 {
            0.0
        } else {
            let n = self.count as f64;
            let target = container.center();
            let dx = self.center_sum.0 / n - target.x;
            let dy = self.center_sum.1 / n - target.y;
            let dz = self.center_sum.2 / n - target.z;
            (dx * dx + dy * dy + dz * dz).sqrt()
        };

        CostBreakdown {
            centroid_deviation,
            fragile_penalty: self.fragile_violations as f64 * config.fragile_penalty,
            unused_volume: 1.0 - self.volume / container.volume(),
            height_penalty: self.max_extent / container.depth(),
            position_bias: self.position_bias,
            edge_penalty: self.small_boxes_on_edges as f64 * config.edge_penalty,
            fragile_violations: self.fragile_violations,
            small_boxes_on_edges: self.small_boxes_on_edges,
        }
    }
}
