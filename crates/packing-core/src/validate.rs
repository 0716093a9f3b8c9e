//! From-scratch checks and metrics for a finished layout.
//!
//! Everything here works on [`PlacementRecord`]s only, so it can recheck
//! layouts that were written to disk or produced elsewhere.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{Container, EPSILON};
use crate::placement::overlap_1d;
use crate::types::PlacementRecord;

/// Volume below which a box counts as small.
pub const SMALL_VOLUME_THRESHOLD: f64 = 10.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutMetrics {
    pub container_volume: f64,
    pub total_box_volume: f64,
    pub space_utilization: f64,
    pub boxes_against_walls: usize,
    /// No box at or above the small-volume threshold rests on a fragile box
    pub fragile_supported: bool,
    /// Share of boxes standing on the floor or on another box, in percent
    pub proportion_supported: f64,
    pub small_boxes_on_edges: usize,
    pub max_stack_height: f64,
    /// Mean horizontal distance between box centres and the container centre
    pub average_center_offset: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationReport {
    /// Unique ids that occur more than once
    pub duplicate_ids: Vec<u64>,
    /// Boxes reaching outside the container
    pub boundary_violations: Vec<String>,
    pub overlapping_pairs: Vec<(String, String)>,
    pub metrics: LayoutMetrics,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.duplicate_ids.is_empty()
            && self.boundary_violations.is_empty()
            && self.overlapping_pairs.is_empty()
    }
}

fn label(record: &PlacementRecord) -> String {
    match record.unique_id {
        Some(uid) => format!("{}#{}", record.box_id, uid),
        None => record.box_id.clone(),
    }
}

fn records_overlap(a: &PlacementRecord, b: &PlacementRecord) -> bool {
    !(a.x + a.width <= b.x + EPSILON
        || b.x + b.width <= a.x + EPSILON
        || a.y + a.height <= b.y + EPSILON
        || b.y + b.height <= a.y + EPSILON
        || a.z + a.depth <= b.z + EPSILON
        || b.z + b.depth <= a.z + EPSILON)
}

fn out_of_bounds(record: &PlacementRecord, container: &Container) -> bool {
    record.x < -EPSILON
        || record.y < -EPSILON
        || record.z < -EPSILON
        || record.x + record.width > container.width() + EPSILON
        || record.y + record.height > container.height() + EPSILON
        || record.z + record.depth > container.depth() + EPSILON
}

fn against_wall(record: &PlacementRecord, container: &Container) -> bool {
    record.x.abs() <= EPSILON
        || record.y.abs() <= EPSILON
        || record.z.abs() <= EPSILON
        || (record.x + record.width - container.width()).abs() <= EPSILON
        || (record.y + record.height - container.height()).abs() <= EPSILON
        || (record.z + record.depth - container.depth()).abs() <= EPSILON
}

/// `upper` stands on `lower`'s top face with some shared footprint.
fn rests_on(upper: &PlacementRecord, lower: &PlacementRecord) -> bool {
    (upper.z - (lower.z + lower.depth)).abs() <= EPSILON
        && overlap_1d(upper.x, upper.x + upper.width, lower.x, lower.x + lower.width) > EPSILON
        && overlap_1d(upper.y, upper.y + upper.height, lower.y, lower.y + lower.height) > EPSILON
}

/// Rechecks a layout and computes its quality metrics.
pub fn validate_layout(container: &Container, placements: &[PlacementRecord]) -> ValidationReport {
    let mut seen: HashMap<u64, usize> = HashMap::new();
    for uid in placements.iter().filter_map(|p| p.unique_id) {
        *seen.entry(uid).or_insert(0) += 1;
    }
    let mut duplicate_ids: Vec<u64> = seen
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(uid, _)| uid)
        .collect();
    duplicate_ids.sort_unstable();

    let boundary_violations = placements
        .iter()
        .filter(|p| out_of_bounds(p, container))
        .map(label)
        .collect();

    let mut overlapping_pairs = Vec::new();
    for (i, a) in placements.iter().enumerate() {
        for b in &placements[i + 1..] {
            if records_overlap(a, b) {
                overlapping_pairs.push((label(a), label(b)));
            }
        }
    }

    ValidationReport {
        duplicate_ids,
        boundary_violations,
        overlapping_pairs,
        metrics: layout_metrics(container, placements),
    }
}

fn layout_metrics(container: &Container, placements: &[PlacementRecord]) -> LayoutMetrics {
    let container_volume = container.volume();
    let total_box_volume: f64 = placements.iter().map(PlacementRecord::volume).sum();

    let boxes_against_walls = placements
        .iter()
        .filter(|p| against_wall(p, container))
        .count();

    let fragile_supported = !placements.iter().filter(|p| p.is_fragile).any(|fragile| {
        placements.iter().any(|other| {
            !std::ptr::eq(other, fragile)
                && other.volume() >= SMALL_VOLUME_THRESHOLD
                && rests_on(other, fragile)
        })
    });

    let supported = placements
        .iter()
        .filter(|p| {
            p.z.abs() <= EPSILON
                || placements
                    .iter()
                    .any(|other| !std::ptr::eq(other, *p) && rests_on(p, other))
        })
        .count();

    let small_boxes_on_edges = placements
        .iter()
        .filter(|p| p.volume() < SMALL_VOLUME_THRESHOLD && against_wall(p, container))
        .count();

    let max_stack_height = placements
        .iter()
        .map(|p| p.z + p.depth)
        .fold(0.0, f64::max);

    let (cx, cy) = (container.width() / 2.0, container.height() / 2.0);
    let total_offset: f64 = placements
        .iter()
        .map(|p| {
            let dx = p.x + p.width / 2.0 - cx;
            let dy = p.y + p.height / 2.0 - cy;
            (dx * dx + dy * dy).sqrt()
        })
        .sum();

    let (proportion_supported, average_center_offset) = if placements.is_empty() {
        (0.0, 0.0)
    } else {
        let n = placements.len() as f64;
        (supported as f64 / n * 100.0, total_offset / n)
    };

    LayoutMetrics {
        container_volume,
        total_box_volume,
        space_utilization: total_box_volume / container_volume * 100.0,
        boxes_against_walls,
        fragile_supported,
        proportion_supported,
        small_boxes_on_edges,
        max_stack_height,
        average_center_offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, uid: u64, pos: (f64, f64, f64), dims: (f64, f64, f64)) -> PlacementRecord {
        PlacementRecord {
            box_id: id.to_string(),
            unique_id: Some(uid),
            x: pos.0,
            y: pos.1,
            z: pos.2,
            width: dims.0,
            height: dims.1,
            depth: dims.2,
            is_fragile: false,
            placement_order: None,
        }
    }

    #[test]
    fn test_clean_layout_is_valid() {
        let container = Container::new(10.0, 10.0, 10.0).unwrap();
        let placements = vec![
            record("1", 1, (0.0, 0.0, 0.0), (5.0, 5.0, 5.0)),
            record("2", 2, (5.0, 0.0, 0.0), (5.0, 5.0, 5.0)),
            record("3", 3, (0.0, 5.0, 0.0), (5.0, 5.0, 5.0)),
        ];

        let report = validate_layout(&container, &placements);
        assert!(report.is_valid());
        assert!((report.metrics.space_utilization - 37.5).abs() < 1e-9);
        assert_eq!(report.metrics.boxes_against_walls, 3);
        assert_eq!(report.metrics.proportion_supported, 100.0);
        assert_eq!(report.metrics.max_stack_height, 5.0);
        assert!(report.metrics.fragile_supported);
    }

    #[test]
    fn test_detects_overlap_boundary_and_duplicates() {
        let container = Container::new(10.0, 10.0, 10.0).unwrap();
        let placements = vec![
            record("a", 1, (0.0, 0.0, 0.0), (5.0, 5.0, 5.0)),
            record("b", 1, (4.0, 4.0, 4.0), (2.0, 2.0, 2.0)),
            record("c", 3, (8.0, 0.0, 0.0), (3.0, 1.0, 1.0)),
        ];

        let report = validate_layout(&container, &placements);
        assert!(!report.is_valid());
        assert_eq!(report.duplicate_ids, vec![1]);
        assert_eq!(report.boundary_violations, vec!["c#3".to_string()]);
        assert_eq!(
            report.overlapping_pairs,
            vec![("a#1".to_string(), "b#1".to_string())]
        );
    }

    #[test]
    fn test_fragile_and_support_metrics() {
        let container = Container::new(4.0, 4.0, 6.0).unwrap();
        let mut glass = record("glass", 1, (0.0, 0.0, 0.0), (4.0, 4.0, 1.0));
        glass.is_fragile = true;
        let brick = record("brick", 2, (0.0, 0.0, 1.0), (4.0, 4.0, 1.0));
        let floating = record("float", 3, (0.0, 0.0, 4.0), (1.0, 1.0, 1.0));

        let report = validate_layout(&container, &[glass, brick, floating]);
        assert!(report.is_valid());
        assert!(!report.metrics.fragile_supported);
        assert!((report.metrics.proportion_supported - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.metrics.small_boxes_on_edges, 1);
        assert_eq!(report.metrics.max_stack_height, 5.0);
    }

    #[test]
    fn test_empty_layout() {
        let container = Container::new(2.0, 2.0, 2.0).unwrap();
        let report = validate_layout(&container, &[]);
        assert!(report.is_valid());
        assert_eq!(report.metrics.space_utilization, 0.0);
        assert_eq!(report.metrics.average_center_offset, 0.0);
    }
}
