use super::*;
use crate::annealing::AnnealingConfig;
use crate::config::PackingConfig;
use crate::cost::INFEASIBLE_COST;
use crate::validate::validate_layout;

fn record(id: &str, w: f64, h: f64, d: f64, fragile: bool) -> BoxRecord {
    BoxRecord {
        box_id: id.to_string(),
        width: w,
        height: h,
        depth: d,
        is_fragile: fragile,
    }
}

fn quick_config(strategy: SearchStrategy) -> PackingConfig {
    PackingConfig {
        strategy,
        restarts: 2,
        baseline_samples: 10,
        seed: Some(17),
        annealing: AnnealingConfig {
            initial_temperature: 100.0,
            cooling_rate: 0.9,
            ..AnnealingConfig::default()
        },
        ..PackingConfig::default()
    }
}

fn request(strategy: SearchStrategy) -> PackingRequest {
    PackingRequest {
        container: ContainerSpec {
            width: 6.0,
            height: 6.0,
            depth: 6.0,
        },
        boxes: vec![
            record("1", 3.0, 3.0, 3.0, false),
            record("2", 6.0, 6.0, 1.0, true),
            record("3", 2.0, 3.0, 1.0, false),
            record("4", 3.0, 3.0, 3.0, false),
            record("5", 1.0, 1.0, 1.0, true),
        ],
        config: quick_config(strategy),
    }
}

#[test]
fn test_simple_packing() {
    let packer = Packer::new(request(SearchStrategy::Annealing)).unwrap();
    let result = packer.pack().unwrap();

    assert!(result.feasible);
    assert!(result.cost < INFEASIBLE_COST);
    assert_eq!(result.placements.len(), 5);
    assert_eq!(result.summary.placed_boxes, 5);
    assert_eq!(result.restart_costs.len(), 2);
    assert!(result.restart_costs.iter().all(|c| result.cost <= *c));
    assert!(result.stats.is_some());

    let used = 27.0 + 36.0 + 6.0 + 27.0 + 1.0;
    assert!((result.summary.used_volume - used).abs() < 1e-9);
    assert!((result.summary.utilization_percentage - used / 216.0 * 100.0).abs() < 1e-9);

    let orders: Vec<_> = result.placements.iter().filter_map(|p| p.placement_order).collect();
    assert_eq!(orders, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_every_strategy_returns_a_valid_layout() {
    for strategy in [
        SearchStrategy::Annealing,
        SearchStrategy::InputOrder,
        SearchStrategy::LargestFirst,
        SearchStrategy::RandomSearch,
    ] {
        let packer = Packer::new(request(strategy)).unwrap();
        let result = packer.pack().unwrap();
        assert_eq!(result.strategy, strategy);

        let report = validate_layout(packer.container(), &result.placements);
        assert!(report.is_valid(), "{strategy} produced {report:?}");
        if result.feasible {
            assert_eq!(result.placements.len(), 5);
        }
    }
}

#[test]
fn test_fixed_seed_is_reproducible() {
    let first = Packer::new(request(SearchStrategy::Annealing))
        .unwrap()
        .pack()
        .unwrap();
    let second = Packer::new(request(SearchStrategy::Annealing))
        .unwrap()
        .pack()
        .unwrap();

    assert_eq!(first.cost, second.cost);
    assert_eq!(first.placements, second.placements);
    assert_eq!(first.restart_costs, second.restart_costs);
}

#[test]
fn test_oversized_box_reports_infeasible() {
    let mut req = request(SearchStrategy::InputOrder);
    req.boxes.push(record("huge", 7.0, 7.0, 7.0, false));

    let result = Packer::new(req).unwrap().pack().unwrap();
    assert!(!result.feasible);
    assert_eq!(result.cost, INFEASIBLE_COST);
    assert_eq!(result.summary.total_boxes, 6);
    assert!(result.summary.placed_boxes < 6);
}

#[test]
fn test_unique_ids_follow_input_order() {
    let result = Packer::new(request(SearchStrategy::InputOrder))
        .unwrap()
        .pack()
        .unwrap();
    let ids: Vec<_> = result.placements.iter().filter_map(|p| p.unique_id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_invalid_requests() {
    let mut req = request(SearchStrategy::Annealing);
    req.boxes[2].depth = 0.0;
    assert!(matches!(Packer::new(req), Err(PackError::InvalidDimension(_))));

    let mut req = request(SearchStrategy::Annealing);
    req.container.height = -1.0;
    assert!(matches!(Packer::new(req), Err(PackError::InvalidDimension(_))));

    let mut req = request(SearchStrategy::Annealing);
    req.config.annealing.cooling_rate = 1.5;
    assert!(matches!(Packer::new(req), Err(PackError::InvalidConfig(_))));
}

#[test]
fn test_request_from_json_with_loose_fragility() {
    let json = r#"{
        "container": { "width": 10, "height": 10, "depth": 10 },
        "boxes": [
            { "box_id": 1, "original_width": 5, "original_height": 5, "original_depth": 5, "is_fragile": 1 },
            { "box_id": "2", "width": 5, "height": 5, "depth": 5, "is_fragile": "oops" },
            { "box_id": 3, "width": 5, "height": 5, "depth": 5 }
        ],
        "config": { "strategy": "input_order" }
    }"#;

    let request: PackingRequest = serde_json::from_str(json).unwrap();
    assert!(request.boxes[0].is_fragile);
    assert!(!request.boxes[1].is_fragile);
    assert!(!request.boxes[2].is_fragile);
    assert_eq!(request.boxes[0].box_id, "1");

    let result = Packer::new(request).unwrap().pack().unwrap();
    let positions: Vec<_> = result.placements.iter().map(|p| (p.x, p.y, p.z)).collect();
    assert_eq!(
        positions,
        vec![(0.0, 0.0, 0.0), (5.0, 0.0, 0.0), (0.0, 5.0, 0.0)]
    );
    assert!((result.summary.utilization_percentage - 37.5).abs() < 1e-9);
}

#[test]
fn test_empty_box_list_packs_into_empty_layout() {
    for strategy in [SearchStrategy::Annealing, SearchStrategy::RandomSearch] {
        let mut req = request(strategy);
        req.boxes.clear();

        let result = Packer::new(req).unwrap().pack().unwrap();
        assert!(result.feasible);
        assert!(result.placements.is_empty());
        assert_eq!(result.summary.total_boxes, 0);
        assert_eq!(result.summary.utilization_percentage, 0.0);
        // Only the unused-volume term remains, at weight 1
        assert!((result.cost - 1.0).abs() < 1e-12);
    }
}

#[test]
fn test_drawn_seed_replays_the_run() {
    let mut req = request(SearchStrategy::Annealing);
    req.config.seed = None;
    let first = Packer::new(req.clone()).unwrap().pack().unwrap();

    req.config.seed = Some(first.seed);
    let replay = Packer::new(req).unwrap().pack().unwrap();

    assert_eq!(replay.seed, first.seed);
    assert_eq!(replay.cost, first.cost);
    assert_eq!(replay.placements, first.placements);
    assert_eq!(replay.restart_costs, first.restart_costs);
}

#[test]
fn test_configured_seed_is_reported() {
    let result = Packer::new(request(SearchStrategy::InputOrder))
        .unwrap()
        .pack()
        .unwrap();
    assert_eq!(result.seed, 17);
}

#[test]
fn test_heavy_weights_do_not_hide_a_complete_packing() {
    let mut req = PackingRequest {
        container: ContainerSpec {
            width: 4.0,
            height: 4.0,
            depth: 2.0,
        },
        boxes: vec![
            record("glass", 4.0, 4.0, 1.0, true),
            record("brick", 4.0, 4.0, 1.0, false),
        ],
        config: quick_config(SearchStrategy::InputOrder),
    };
    req.config.cost.weights.fragile = 1e7;

    let result = Packer::new(req).unwrap().pack().unwrap();
    assert!(result.cost > INFEASIBLE_COST);
    assert!(result.feasible);
    assert_eq!(result.summary.placed_boxes, 2);
}
